use serde::Serialize;
use serde_json::{Number, Value};

use crate::coalesce::{
    first_str, looks_like_hostname_noise, normalize_vendor_name, pick_array,
    to_iso_date_from_mmddyy,
};
use crate::shape::{unwrap_envelope, Section};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloudSpendRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    pub vendor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_spend_usd: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_seen: Option<String>,
}

impl CloudSpendRow {
    fn spend(&self) -> f64 {
        self.monthly_spend_usd
            .as_ref()
            .and_then(Number::as_f64)
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentAdoption {
    pub vendor: String,
    pub first_seen: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloudSpendSummary {
    pub top_spend: Vec<CloudSpendRow>,
    pub recent_adoptions: Vec<RecentAdoption>,
}

/// Tuning for [`compact_cloud_spend`].
#[derive(Debug, Clone, PartialEq)]
pub struct CloudSpendLimits {
    pub per_service_top_n: usize,
    pub min_monthly_spend: f64,
    /// ISO date; adoptions first seen on or after it count as recent.
    pub recent_cutoff: String,
    pub recent_cap: usize,
}

impl Default for CloudSpendLimits {
    fn default() -> Self {
        Self {
            per_service_top_n: 5,
            min_monthly_spend: 1000.0,
            recent_cutoff: "2024-01-01".to_string(),
            recent_cap: 10,
        }
    }
}

fn service_rows(service: &Value, limits: &CloudSpendLimits) -> Vec<CloudSpendRow> {
    let service_name = first_str(service, &["serviceName", "name"]);
    let vendors = pick_array(service, &["vendors", "providers"]);

    let mut rows: Vec<CloudSpendRow> = vendors
        .iter()
        .filter_map(|v| {
            let name = v.get("vendorName")?.as_str()?;
            if looks_like_hostname_noise(name) {
                return None;
            }
            Some(CloudSpendRow {
                service: service_name.clone(),
                vendor: normalize_vendor_name(name),
                monthly_spend_usd: match v.get("estimatedMonthlySpend") {
                    Some(Value::Number(n)) => Some(n.clone()),
                    _ => None,
                },
                first_seen: to_iso_date_from_mmddyy(v.get("firstSeen").and_then(Value::as_str)),
            })
        })
        .filter(|r| r.spend() >= limits.min_monthly_spend)
        .collect();

    rows.sort_by(|a, b| {
        b.spend().total_cmp(&a.spend())
    });
    rows.truncate(limits.per_service_top_n);
    rows
}

/// Top vendors by estimated monthly spend per cloud service, plus recent adoptions.
///
/// Only vendors with a string `vendorName` that is not infrastructure noise are kept.
/// Recent adoptions are drawn from the already-ranked rows, in service order.
pub fn compact_cloud_spend(input: &Value, limits: &CloudSpendLimits) -> Section<CloudSpendSummary> {
    let c = match unwrap_envelope(input) {
        Ok(c) => c,
        Err(e) => return Section::Failed(e),
    };

    let services = pick_array(c, &["technologyServices", "services", "cloudServices"]);
    let top_spend: Vec<CloudSpendRow> = services
        .iter()
        .flat_map(|s| service_rows(s, limits))
        .collect();

    let recent_adoptions = top_spend
        .iter()
        .filter_map(|r| {
            let first_seen = r.first_seen.as_deref()?;
            (first_seen >= limits.recent_cutoff.as_str()).then(|| RecentAdoption {
                vendor: r.vendor.clone(),
                first_seen: first_seen.to_string(),
            })
        })
        .take(limits.recent_cap)
        .collect();

    Section::Ready(CloudSpendSummary {
        top_spend,
        recent_adoptions,
    })
}
