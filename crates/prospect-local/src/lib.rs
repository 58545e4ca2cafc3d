//! Network side of prospect: remote MCP tools, retries, resolution, analysis and briefs.

pub mod analysis;
pub mod brief;
pub mod openai_compat;
pub mod remote;
pub mod resolver;
pub mod tools;

pub use analysis::{run_company_analysis, AnalysisOptions, CompanyAnalysis};
pub use brief::{brief_llm_from_env, build_brief_prompt, generate_brief, parse_brief};
pub use openai_compat::{LlmUsage, OpenAiCompatClient, TokenPricing};
pub use remote::RemoteToolClient;
pub use resolver::resolve_company_domain;
pub use tools::{CallPacing, RetryPolicy, Tools};

pub(crate) fn env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// `PROSPECT_<key>` first, then the bare `<key>`.
pub(crate) fn prefixed_env(key: &str) -> Option<String> {
    env(&format!("PROSPECT_{key}")).or_else(|| env(key))
}
