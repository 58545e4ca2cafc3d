use serde::Serialize;
use serde_json::Value;

use crate::coalesce::{at_path, first_number, first_present, first_str, scalar_text};
use crate::shape::{unwrap_envelope, Section};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompanyProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    /// `"city, country"`, either part optional.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hq: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employees: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue_usd: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub it_spend_usd: Option<Value>,
    /// Date part (`YYYY-MM-DD`) of the upstream `metadata.lastUpdated`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_freshness: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Value>,
}

fn text_at(v: &Value, path: &[&str]) -> Option<String> {
    at_path(v, path).and_then(scalar_text)
}

pub fn compact_firmographic(input: &Value) -> Section<CompanyProfile> {
    let f = match unwrap_envelope(input) {
        Ok(f) => f,
        Err(e) => return Section::Failed(e),
    };

    let industry =
        text_at(f, &["industryCodes", "naics", "name"]).or_else(|| first_str(f, &["industry"]));

    let city =
        text_at(f, &["location", "city"]).or_else(|| text_at(f, &["headquarters", "city"]));
    let country =
        text_at(f, &["location", "country"]).or_else(|| text_at(f, &["headquarters", "country"]));
    let hq = [city, country]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    let data_freshness =
        text_at(f, &["metadata", "lastUpdated"]).map(|s| s.chars().take(10).collect());

    Section::Ready(CompanyProfile {
        name: first_str(f, &["companyName", "name"]),
        domain: first_str(f, &["domain", "website", "websiteUrl"]),
        industry,
        hq: (!hq.is_empty()).then_some(hq),
        employees: first_number(f, &["employeeCount", "employees"]),
        revenue_usd: first_number(f, &["revenue", "annualRevenue"]),
        it_spend_usd: first_number(f, &["itSpend", "itSpendUsd"]),
        data_freshness,
        confidence: f
            .get("metadata")
            .and_then(|m| first_present(m, &["confidence"]))
            .cloned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coalesces_aliases_and_nested_fields() {
        let input = json!({
            "structuredContent": {
                "name": "Acme",
                "website": "acme.com",
                "industry": "Manufacturing",
                "headquarters": {"city": "Austin", "country": "US"},
                "employees": 1200,
                "annualRevenue": 90000000,
                "itSpendUsd": 4000000,
                "metadata": {"lastUpdated": "2024-06-01T12:00:00Z", "confidence": 0.9}
            }
        });
        let out = serde_json::to_value(compact_firmographic(&input)).unwrap();
        assert_eq!(
            out,
            json!({
                "name": "Acme",
                "domain": "acme.com",
                "industry": "Manufacturing",
                "hq": "Austin, US",
                "employees": 1200,
                "revenue_usd": 90000000,
                "it_spend_usd": 4000000,
                "data_freshness": "2024-06-01",
                "confidence": 0.9
            })
        );
    }

    #[test]
    fn naics_name_beats_plain_industry() {
        let input = json!({
            "companyName": "Acme",
            "industryCodes": {"naics": {"name": "Software Publishers"}},
            "industry": "Tech",
            "location": {"country": "FR"}
        });
        let Section::Ready(p) = compact_firmographic(&input) else {
            panic!("expected ready");
        };
        assert_eq!(p.industry.as_deref(), Some("Software Publishers"));
        assert_eq!(p.hq.as_deref(), Some("FR"));
    }

    #[test]
    fn range_strings_are_kept_as_reported() {
        let input = json!({
            "companyName": "Acme",
            "employees": "1,001-5,000",
            "revenue": "$10M-$50M",
            "annualRevenue": 25000000
        });
        let out = serde_json::to_value(compact_firmographic(&input)).unwrap();
        assert_eq!(
            out,
            json!({
                "name": "Acme",
                "employees": "1,001-5,000",
                "revenue_usd": "$10M-$50M"
            })
        );
    }

    #[test]
    fn missing_fields_are_omitted_not_zeroed() {
        let out = serde_json::to_value(compact_firmographic(&json!({}))).unwrap();
        assert_eq!(out, json!({}));
    }

    #[test]
    fn error_passes_through() {
        let out = compact_firmographic(&json!({"error": "boom"}));
        assert_eq!(serde_json::to_value(out).unwrap(), json!({"error": "boom"}));
    }
}
