use serde::Serialize;
use serde_json::Value;

use crate::coalesce::{first_number, first_present, first_str, pick_array};
use crate::shape::{unwrap_envelope, Section};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContractRow {
    pub vendor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_usd: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContractsSummary {
    /// Upstream-reported count, else the number of contract rows received.
    pub contracts_count: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_value_usd: Option<Value>,
    pub recent_contracts: Vec<ContractRow>,
}

pub fn compact_contracts(input: &Value, top_n: usize) -> Section<ContractsSummary> {
    let data = match unwrap_envelope(input) {
        Ok(d) => d,
        Err(e) => return Section::Failed(e),
    };

    let contracts = pick_array(data, &["contracts", "items", "agreements"]);
    let recent_contracts = contracts
        .iter()
        .filter_map(|c| {
            let vendor = first_str(c, &["vendorName", "vendor", "provider"]).filter(|s| !s.is_empty())?;
            Some(ContractRow {
                vendor,
                value_usd: first_number(c, &["totalValue", "value", "amount"]),
                start_date: first_present(c, &["startDate", "start"]).cloned(),
                end_date: first_present(c, &["endDate", "end"]).cloned(),
            })
        })
        .take(top_n)
        .collect();

    Section::Ready(ContractsSummary {
        contracts_count: first_number(data, &["count"])
            .unwrap_or_else(|| Value::from(contracts.len())),
        total_value_usd: first_number(data, &["totalValue", "totalContractValue", "total"]),
        recent_contracts,
    })
}
