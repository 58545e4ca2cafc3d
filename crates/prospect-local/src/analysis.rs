//! End-to-end company analysis: resolve, fetch every category sequentially, compact.

use prospect_core::{
    build_compact_payload, compact_technographic, CompactPayload, CompactionInputs,
    CompactionLimits, Result, ToolClient, ToolFailure,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use crate::resolver::resolve_company_domain;
use crate::tools::{CallPacing, Tools};

pub const NO_PRODUCT_SEED: &str = "No product seed available.";

/// How many technographic rows are considered when picking the product to look up.
const SEED_TOP_N: usize = 2;

#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    pub pacing: CallPacing,
    pub limits: CompactionLimits,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyAnalysis {
    pub query: String,
    pub company_domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    pub compact: CompactPayload,
}

/// First named product among the top technographic rows.
fn product_seed(techno: &Value) -> Option<String> {
    compact_technographic(techno, SEED_TOP_N)
        .ready()?
        .iter()
        .filter_map(|row| row.product.clone())
        .find(|p| !p.is_empty())
}

/// Resolve `query`, then call every upstream tool one at a time.
///
/// Only domain resolution can fail; an unavailable tool degrades its own section to
/// `{ "error": ... }`.
pub async fn run_company_analysis<C: ToolClient>(
    tools: &Tools<C>,
    query: &str,
    opts: &AnalysisOptions,
) -> Result<CompanyAnalysis> {
    let resolved = resolve_company_domain(tools, query).await?;
    let domain = resolved.domain.as_str();
    let company = json!({ "companyDomain": domain });
    let company_pause = opts.pacing.company_pause;
    let catalog_pause = opts.pacing.catalog_pause;

    let firmo = tools.call("company_firmographic", company.clone()).await;
    tools.pause(company_pause).await;
    let techno = tools.call("company_technographic", company.clone()).await;
    tools.pause(company_pause).await;
    let fai = tools.call("company_fai", company.clone()).await;
    tools.pause(company_pause).await;
    let security_spend = tools
        .call(
            "company_spend",
            json!({
                "companyDomain": domain,
                "spendCategory": opts.limits.spend_default_category,
            }),
        )
        .await;
    tools.pause(company_pause).await;
    let contracts = tools.call("company_contracts", company.clone()).await;
    tools.pause(company_pause).await;
    let cloud_spend = tools.call("company_cloud_spend", company).await;
    tools.pause(company_pause).await;

    let product_categories = tools.call("list_product_categories", json!({})).await;
    tools.pause(catalog_pause).await;
    let product_vendors = tools.call("list_vendors", json!({})).await;
    tools.pause(catalog_pause).await;
    let product_attributes = tools.call("list_product_attributes", json!({})).await;
    tools.pause(catalog_pause).await;
    let intent_topics = tools.call("list_intent_topics", json!({})).await;
    tools.pause(catalog_pause).await;

    let seed = product_seed(&techno);
    let no_seed = || ToolFailure::new(NO_PRODUCT_SEED).to_value();
    let product_info = match &seed {
        Some(p) => {
            tools
                .call("get_product_information", json!({ "productName": p }))
                .await
        }
        None => no_seed(),
    };
    tools.pause(catalog_pause).await;
    let product_reviews = match &seed {
        Some(p) => {
            tools
                .call("get_product_reviews", json!({ "productName": p }))
                .await
        }
        None => no_seed(),
    };

    let inputs = CompactionInputs {
        firmo,
        techno,
        cloud_spend,
        fai,
        security_spend,
        contracts,
        product_categories,
        product_vendors,
        product_attributes,
        intent_topics,
        product_info,
        product_reviews,
    };
    let compact = build_compact_payload(&inputs, &opts.limits);
    info!(query, domain, seed = seed.as_deref().unwrap_or(""), "company analysis complete");

    Ok(CompanyAnalysis {
        query: query.to_string(),
        company_domain: resolved.domain,
        company_name: resolved.name,
        compact,
    })
}
