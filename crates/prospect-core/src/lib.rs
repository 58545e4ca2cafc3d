use serde::{Deserialize, Serialize};

pub mod coalesce;
pub mod compact;
pub mod domain;
pub mod payload;
pub mod shape;

pub use compact::{
    compact_cloud_spend, compact_contracts, compact_fai, compact_firmographic,
    compact_product_info, compact_product_list, compact_product_reviews, compact_spend,
    compact_technographic,
};
pub use payload::{build_compact_payload, CompactPayload, CompactionInputs, CompactionLimits};
pub use shape::{unwrap_envelope, Section, ToolFailure};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("tool call failed: {0}")]
    Tool(String),
    #[error("llm failed: {0}")]
    Llm(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
    /// Every resolution strategy was exhausted without producing a domain.
    #[error("could not resolve company domain from query: {query:?}")]
    UnresolvableDomain { query: String },
}

impl Error {
    /// Upstream failures may succeed on a later attempt; configuration and resolution
    /// failures will not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Tool(_) | Self::Llm(_) => true,
            Self::NotConfigured(_) | Self::UnresolvableDomain { .. } => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// A row from the company-directory search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyCandidate {
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
}

/// Outcome of domain resolution. `name` is only known when the directory matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedCompany {
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Remote tool invocation capability.
///
/// Implementations return the raw tool payload; they do not retry.
#[async_trait::async_trait]
pub trait ToolClient: Send + Sync {
    async fn call(&self, name: &str, args: serde_json::Value) -> Result<serde_json::Value>;

    async fn list_tools(&self) -> Result<Vec<String>>;
}

#[async_trait::async_trait]
impl<T: ToolClient + ?Sized> ToolClient for std::sync::Arc<T> {
    async fn call(&self, name: &str, args: serde_json::Value) -> Result<serde_json::Value> {
        (**self).call(name, args).await
    }

    async fn list_tools(&self) -> Result<Vec<String>> {
        (**self).list_tools().await
    }
}
