use serde::Serialize;
use serde_json::Value;

use crate::coalesce::{first_number, first_present, first_str, head, pick_array};
use crate::shape::{unwrap_envelope, Section};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpendBreakdownRow {
    pub subcategory: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spend_usd: Option<Value>,
    pub products: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpendSummary {
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_spend_usd: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yoy_growth: Option<Value>,
    pub breakdown: Vec<SpendBreakdownRow>,
}

/// Category spend with its first `top_n` breakdown rows, in upstream order.
///
/// `default_category` labels the summary when the payload does not name its category.
pub fn compact_spend(input: &Value, top_n: usize, default_category: &str) -> Section<SpendSummary> {
    let data = match unwrap_envelope(input) {
        Ok(d) => d,
        Err(e) => return Section::Failed(e),
    };

    let breakdown = pick_array(data, &["breakdown", "categories", "categoryBreakdown"])
        .iter()
        .filter_map(|b| {
            let subcategory =
                first_str(b, &["subcategory", "category", "name"]).filter(|s| !s.is_empty())?;
            Some(SpendBreakdownRow {
                subcategory,
                spend_usd: first_number(b, &["spend", "totalSpend", "amount"]),
                products: head(b, "products", 3),
            })
        })
        .take(top_n)
        .collect();

    Section::Ready(SpendSummary {
        category: first_str(data, &["category", "spendCategory"])
            .unwrap_or_else(|| default_category.to_string()),
        total_spend_usd: first_number(data, &["totalSpend", "total_spend", "spend"]),
        yoy_growth: first_present(data, &["yearOverYearGrowth", "yoyGrowth", "growth"]).cloned(),
        breakdown,
    })
}
