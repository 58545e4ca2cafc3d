use prospect_core::Error as ProspectError;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    InvalidParams,
    NotConfigured,
    UnresolvableDomain,
    ToolFailed,
    LlmFailed,
}

impl ErrorCode {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::InvalidParams => "invalid_params",
            Self::NotConfigured => "not_configured",
            Self::UnresolvableDomain => "unresolvable_domain",
            Self::ToolFailed => "tool_failed",
            Self::LlmFailed => "llm_failed",
        }
    }

    pub(crate) fn retryable(self) -> bool {
        match self {
            Self::ToolFailed | Self::LlmFailed => true,
            // Configuration + invalid input are not retryable without changing something.
            Self::InvalidParams | Self::NotConfigured | Self::UnresolvableDomain => false,
        }
    }

    pub(crate) fn default_hint(self) -> &'static str {
        match self {
            Self::InvalidParams => "Provide a non-empty company name or domain.",
            Self::NotConfigured => {
                "Set PROSPECT_MCP_URL (or HG_MCP_URL) for tools and LLM_API_URL, LLM_API_KEY, LLM_MODEL for briefs."
            }
            Self::UnresolvableDomain => {
                "Pass the company's domain directly (e.g. \"acme.com\") or a more specific name."
            }
            Self::ToolFailed => "The tool server failed or is unreachable. Retry later.",
            Self::LlmFailed => "The LLM endpoint failed. Retry later or check the model name.",
        }
    }
}

impl From<&ProspectError> for ErrorCode {
    fn from(e: &ProspectError) -> Self {
        match e {
            ProspectError::NotConfigured(_) => Self::NotConfigured,
            ProspectError::UnresolvableDomain { .. } => Self::UnresolvableDomain,
            ProspectError::Tool(_) => Self::ToolFailed,
            ProspectError::Llm(_) => Self::LlmFailed,
        }
    }
}

pub(crate) fn add_envelope_fields(payload: &mut serde_json::Value, kind: &str, elapsed_ms: u128) {
    tracing::debug!(
        tool = kind,
        ok = payload["ok"].as_bool().unwrap_or(false),
        elapsed_ms = elapsed_ms as u64,
        "mcp tool finished"
    );
    payload["schema_version"] = serde_json::json!(super::SCHEMA_VERSION);
    payload["kind"] = serde_json::json!(kind);
    payload["elapsed_ms"] = serde_json::json!(elapsed_ms);
}

pub(crate) fn error_obj(
    code: ErrorCode,
    message: impl ToString,
    hint: impl ToString,
) -> serde_json::Value {
    #[derive(Serialize)]
    struct ErrorObject {
        code: &'static str,
        message: String,
        hint: String,
        retryable: bool,
    }

    let e = ErrorObject {
        code: code.as_str(),
        message: message.to_string(),
        hint: hint.to_string(),
        retryable: code.retryable(),
    };
    match serde_json::to_value(e) {
        Ok(v) => v,
        Err(_) => serde_json::json!({
            "code": code.as_str(),
            "message": message.to_string(),
            "hint": hint.to_string(),
            "retryable": code.retryable()
        }),
    }
}

pub(crate) fn error_from(e: &ProspectError) -> serde_json::Value {
    let code = ErrorCode::from(e);
    error_obj(code, e, code.default_hint())
}
