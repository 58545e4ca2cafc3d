//! Composition of every compactor into the sales-oriented `CompactPayload`.
//!
//! The assembler never re-ranks or re-validates. A failed compactor is forwarded in
//! place, so consumers must accept `{ "error": ... }` anywhere a section is expected.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::compact::{
    compact_cloud_spend, compact_contracts, compact_fai, compact_firmographic,
    compact_product_info, compact_product_list, compact_product_reviews, compact_spend,
    compact_technographic, CloudSpendLimits, CloudSpendRow, CompanyProfile, ContractsSummary,
    DepartmentRow, ProductInfo, ProductReviews, RecentAdoption, SpendSummary, TechHighlight,
};
use crate::shape::Section;

/// The twelve raw category payloads, exactly as returned by the tool layer.
/// Missing keys deserialize as `null`, which compacts to an empty section.
///
/// Only a JSON object deserializes into a bundle; arrays are rejected instead of being
/// read positionally.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "Map<String, Value>")]
pub struct CompactionInputs {
    pub firmo: Value,
    pub techno: Value,
    pub cloud_spend: Value,
    pub fai: Value,
    pub security_spend: Value,
    pub contracts: Value,
    pub product_categories: Value,
    pub product_vendors: Value,
    pub product_attributes: Value,
    pub intent_topics: Value,
    pub product_info: Value,
    pub product_reviews: Value,
}

impl From<Map<String, Value>> for CompactionInputs {
    fn from(mut m: Map<String, Value>) -> Self {
        let mut take = |key: &str| m.remove(key).unwrap_or(Value::Null);
        Self {
            firmo: take("firmo"),
            techno: take("techno"),
            cloud_spend: take("cloudSpend"),
            fai: take("fai"),
            security_spend: take("securitySpend"),
            contracts: take("contracts"),
            product_categories: take("productCategories"),
            product_vendors: take("productVendors"),
            product_attributes: take("productAttributes"),
            intent_topics: take("intentTopics"),
            product_info: take("productInfo"),
            product_reviews: take("productReviews"),
        }
    }
}

impl CompactionInputs {
    /// Every input set to the same value; handy for degraded-mode checks.
    pub fn uniform(v: Value) -> Self {
        Self {
            firmo: v.clone(),
            techno: v.clone(),
            cloud_spend: v.clone(),
            fai: v.clone(),
            security_spend: v.clone(),
            contracts: v.clone(),
            product_categories: v.clone(),
            product_vendors: v.clone(),
            product_attributes: v.clone(),
            intent_topics: v.clone(),
            product_info: v.clone(),
            product_reviews: v,
        }
    }
}

/// Top-N caps and thresholds applied by [`build_compact_payload`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompactionLimits {
    pub tech_top_n: usize,
    pub cloud: CloudSpendLimits,
    pub fai_top_n: usize,
    pub spend_top_n: usize,
    pub spend_default_category: String,
    pub contracts_top_n: usize,
    pub list_top_n: usize,
}

impl Default for CompactionLimits {
    fn default() -> Self {
        Self {
            tech_top_n: 15,
            cloud: CloudSpendLimits::default(),
            fai_top_n: 4,
            spend_top_n: 5,
            spend_default_category: "Security".to_string(),
            contracts_top_n: 5,
            list_top_n: 12,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechHighlights {
    pub languages_tools: Section<Vec<TechHighlight>>,
    pub cloud_stack_top_spend: Section<Vec<CloudSpendRow>>,
    pub recent_adoptions: Section<Vec<RecentAdoption>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesSignals {
    pub icp_departments: Section<Vec<DepartmentRow>>,
    pub security_spend: Section<SpendSummary>,
    pub contracts: Section<ContractsSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductSignals {
    pub categories: Section<Vec<String>>,
    pub vendors: Section<Vec<String>>,
    pub attributes: Section<Vec<String>>,
    pub intent_topics: Section<Vec<String>>,
    pub product_info: Section<ProductInfo>,
    pub product_reviews: Section<ProductReviews>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompactPayload {
    pub company: Section<CompanyProfile>,
    pub tech_highlights: TechHighlights,
    pub sales_signals: SalesSignals,
    pub product_signals: ProductSignals,
}

pub fn build_compact_payload(inputs: &CompactionInputs, limits: &CompactionLimits) -> CompactPayload {
    let cloud = compact_cloud_spend(&inputs.cloud_spend, &limits.cloud);
    let (cloud_stack_top_spend, recent_adoptions) = match cloud {
        Section::Ready(c) => (Section::Ready(c.top_spend), Section::Ready(c.recent_adoptions)),
        Section::Failed(e) => (Section::Failed(e.clone()), Section::Failed(e)),
    };

    CompactPayload {
        company: compact_firmographic(&inputs.firmo),
        tech_highlights: TechHighlights {
            languages_tools: compact_technographic(&inputs.techno, limits.tech_top_n),
            cloud_stack_top_spend,
            recent_adoptions,
        },
        sales_signals: SalesSignals {
            icp_departments: compact_fai(&inputs.fai, limits.fai_top_n),
            security_spend: compact_spend(
                &inputs.security_spend,
                limits.spend_top_n,
                &limits.spend_default_category,
            ),
            contracts: compact_contracts(&inputs.contracts, limits.contracts_top_n),
        },
        product_signals: ProductSignals {
            categories: compact_product_list(&inputs.product_categories, limits.list_top_n),
            vendors: compact_product_list(&inputs.product_vendors, limits.list_top_n),
            attributes: compact_product_list(&inputs.product_attributes, limits.list_top_n),
            intent_topics: compact_product_list(&inputs.intent_topics, limits.list_top_n),
            product_info: compact_product_info(&inputs.product_info),
            product_reviews: compact_product_reviews(&inputs.product_reviews),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn leaves(v: &Value, out: &mut Vec<Value>) {
        match v.as_object() {
            Some(m) if !m.contains_key("error") => {
                for child in m.values() {
                    leaves(child, out);
                }
            }
            _ => out.push(v.clone()),
        }
    }

    #[test]
    fn all_errors_yield_complete_error_sections() {
        let inputs = CompactionInputs::uniform(json!({"error": "upstream down"}));
        let out = serde_json::to_value(build_compact_payload(&inputs, &CompactionLimits::default()))
            .unwrap();

        for section in ["company", "tech_highlights", "sales_signals", "product_signals"] {
            assert!(out.get(section).is_some(), "missing section {section}");
        }
        let mut found = Vec::new();
        leaves(&out, &mut found);
        assert_eq!(found.len(), 13);
        assert!(found.iter().all(|l| l == &json!({"error": "upstream down"})));
    }

    #[test]
    fn null_inputs_compact_to_empty_sections() {
        let out = serde_json::to_value(build_compact_payload(
            &CompactionInputs::default(),
            &CompactionLimits::default(),
        ))
        .unwrap();
        assert_eq!(out["company"], json!({}));
        assert_eq!(out["tech_highlights"]["languages_tools"], json!([]));
        assert_eq!(out["sales_signals"]["security_spend"]["category"], "Security");
        assert_eq!(out["sales_signals"]["contracts"]["contracts_count"], 0);
        assert_eq!(out["product_signals"]["intent_topics"], json!([]));
    }

    #[test]
    fn sections_fail_independently() {
        let mut inputs = CompactionInputs::default();
        inputs.cloud_spend = json!({"error": "cloud timeout"});
        inputs.techno = json!({"structuredContent": {"products": [
            {"productName": "Snowflake", "vendorName": "Snowflake", "intensity": 9}
        ]}});
        let out = serde_json::to_value(build_compact_payload(&inputs, &CompactionLimits::default()))
            .unwrap();
        assert_eq!(out["tech_highlights"]["cloud_stack_top_spend"], json!({"error": "cloud timeout"}));
        assert_eq!(out["tech_highlights"]["recent_adoptions"], json!({"error": "cloud timeout"}));
        assert_eq!(out["tech_highlights"]["languages_tools"][0]["product"], "Snowflake");
    }

    #[test]
    fn inputs_accept_camel_case_bundle_with_missing_keys() {
        let bundle: CompactionInputs =
            serde_json::from_value(json!({"cloudSpend": {"services": []}, "intentTopics": ["x"]}))
                .unwrap();
        assert_eq!(bundle.cloud_spend, json!({"services": []}));
        assert_eq!(bundle.intent_topics, json!(["x"]));
        assert!(bundle.firmo.is_null());
    }

    #[test]
    fn array_bundle_is_rejected() {
        let err = serde_json::from_value::<CompactionInputs>(json!([
            {"companyName": "Acme"},
            {"error": "x"}
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("invalid type"), "{err}");
        assert!(serde_json::from_str::<CompactionInputs>("\"firmo\"").is_err());
    }

    #[test]
    fn bundle_round_trips_with_camel_case_keys() {
        let mut inputs = CompactionInputs::default();
        inputs.security_spend = json!({"totalSpend": 1});
        let v = serde_json::to_value(&inputs).unwrap();
        assert_eq!(v["securitySpend"], json!({"totalSpend": 1}));
        let back: CompactionInputs = serde_json::from_value(v).unwrap();
        assert_eq!(back.security_spend, json!({"totalSpend": 1}));
    }
}
