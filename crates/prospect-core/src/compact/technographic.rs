use serde::Serialize;
use serde_json::{Number, Value};
use std::collections::BTreeMap;

use crate::coalesce::{at_path, first_present, first_str, number_from_f64, number_or_zero};
use crate::shape::{unwrap_envelope, Section};

const MAX_ATTRIBUTES: usize = 3;

const DIRECT_PRODUCT_PATHS: [&[&str]; 4] = [
    &["products"],
    &["data", "products"],
    &["productList"],
    &["data", "productList"],
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechHighlight {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    pub intensity: Number,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_seen: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<String>,
    pub attributes: Vec<Value>,
    pub locations: Number,
}

/// One product observation before merging.
#[derive(Debug, Clone, PartialEq)]
struct TechnologyRow {
    product_name: Option<String>,
    vendor_name: Option<String>,
    intensity: f64,
    first_verified: Option<String>,
    last_verified: Option<String>,
    attributes: Vec<Value>,
    locations: f64,
}

impl TechnologyRow {
    fn attributes_of(p: &Value) -> Vec<Value> {
        p.get("productAttributes")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }

    fn date(p: &Value, key: &str) -> Option<String> {
        first_str(p, &[key]).filter(|s| !s.is_empty())
    }

    /// A row from a flat `products` / `productList` array.
    fn from_product(p: &Value) -> Self {
        Self {
            product_name: first_str(p, &["productName"]),
            vendor_name: first_str(p, &["vendorName"]),
            intensity: number_or_zero(p.get("intensity")),
            first_verified: Self::date(p, "firstVerifiedDate"),
            last_verified: Self::date(p, "lastVerifiedDate"),
            attributes: Self::attributes_of(p),
            locations: number_or_zero(p.get("productLocations")),
        }
    }

    /// A row from a grouped `technologies[].products[]` entry. The group label stands in
    /// for a missing vendor, and a missing intensity counts as one observation.
    fn from_grouped(p: &Value, group_label: Option<&str>) -> Self {
        Self {
            product_name: first_str(p, &["name", "productName"]),
            vendor_name: first_str(p, &["vendorName"]).or_else(|| group_label.map(str::to_string)),
            intensity: first_present(p, &["intensity", "usageLevel"])
                .map(|v| number_or_zero(Some(v)))
                .unwrap_or(1.0),
            first_verified: Self::date(p, "firstVerifiedDate"),
            last_verified: Self::date(p, "lastVerifiedDate"),
            attributes: Self::attributes_of(p),
            locations: number_or_zero(p.get("productLocations")),
        }
    }
}

fn flatten_technologies(t: &Value) -> Vec<TechnologyRow> {
    let groups = at_path(t, &["technologies"])
        .or_else(|| at_path(t, &["data", "technologies"]))
        .and_then(Value::as_array);
    let Some(groups) = groups else {
        return Vec::new();
    };

    let mut rows = Vec::new();
    for group in groups {
        let label = first_str(group, &["category", "name"]);
        let Some(products) = group.get("products").and_then(Value::as_array) else {
            continue;
        };
        rows.extend(
            products
                .iter()
                .map(|p| TechnologyRow::from_grouped(p, label.as_deref())),
        );
    }
    rows
}

fn source_rows(t: &Value) -> Vec<TechnologyRow> {
    let direct = DIRECT_PRODUCT_PATHS
        .iter()
        .find_map(|path| at_path(t, path).and_then(Value::as_array));

    match direct {
        Some(products) => products.iter().map(TechnologyRow::from_product).collect(),
        None => flatten_technologies(t),
    }
}

fn min_date(a: Option<String>, b: Option<String>) -> Option<String> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if b < a { b } else { a }),
        (a, b) => a.or(b),
    }
}

fn max_date(a: Option<String>, b: Option<String>) -> Option<String> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if b > a { b } else { a }),
        (a, b) => a.or(b),
    }
}

impl TechnologyRow {
    /// Fold `other` into `self`: sums, widened date range, bounded attribute union.
    fn absorb(&mut self, other: TechnologyRow) {
        self.intensity += other.intensity;
        self.locations += other.locations;
        self.first_verified = min_date(self.first_verified.take(), other.first_verified);
        self.last_verified = max_date(self.last_verified.take(), other.last_verified);
        self.absorb_attributes(other.attributes);
    }

    fn absorb_attributes(&mut self, attributes: Vec<Value>) {
        for a in attributes {
            if self.attributes.len() >= MAX_ATTRIBUTES {
                break;
            }
            if !self.attributes.contains(&a) {
                self.attributes.push(a);
            }
        }
    }

    fn into_highlight(self) -> TechHighlight {
        TechHighlight {
            product: self.product_name,
            vendor: self.vendor_name,
            intensity: number_from_f64(self.intensity),
            first_seen: self.first_verified,
            last_seen: self.last_verified,
            attributes: self.attributes,
            locations: number_from_f64(self.locations),
        }
    }
}

/// Group rows by `(product, vendor)`, preserving first-seen order of the groups.
fn merge_rows(rows: Vec<TechnologyRow>) -> Vec<TechnologyRow> {
    let mut index: BTreeMap<(Option<String>, Option<String>), usize> = BTreeMap::new();
    let mut merged: Vec<TechnologyRow> = Vec::new();

    for mut row in rows {
        let key = (row.product_name.clone(), row.vendor_name.clone());
        match index.get(&key) {
            Some(&i) => merged[i].absorb(row),
            None => {
                index.insert(key, merged.len());
                let attributes = std::mem::take(&mut row.attributes);
                row.absorb_attributes(attributes);
                merged.push(row);
            }
        }
    }
    merged
}

/// Merge product observations and keep the `top_n` most intensely used.
pub fn compact_technographic(input: &Value, top_n: usize) -> Section<Vec<TechHighlight>> {
    let t = match unwrap_envelope(input) {
        Ok(t) => t,
        Err(e) => return Section::Failed(e),
    };

    let mut merged = merge_rows(source_rows(t));
    merged.sort_by(|a, b| b.intensity.total_cmp(&a.intensity));
    Section::Ready(
        merged
            .into_iter()
            .take(top_n)
            .map(TechnologyRow::into_highlight)
            .collect(),
    )
}
