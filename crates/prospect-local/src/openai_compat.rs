use std::time::Duration;

use prospect_core::coalesce::first_present;
use prospect_core::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::prefixed_env;

fn llm_api_url_from_env() -> Option<String> {
    prefixed_env("LLM_API_URL")
}

fn llm_api_key_from_env() -> Option<String> {
    prefixed_env("LLM_API_KEY")
}

fn llm_model_from_env() -> Option<String> {
    prefixed_env("LLM_MODEL")
}

fn price_from_env(key: &str) -> Option<f64> {
    prefixed_env(key)
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|p| p.is_finite())
}

/// USD per 1k tokens, used when the provider does not report a cost itself.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TokenPricing {
    pub input_per_1k: Option<f64>,
    pub output_per_1k: Option<f64>,
}

impl TokenPricing {
    pub fn from_env() -> Self {
        Self {
            input_per_1k: price_from_env("LLM_INPUT_COST_PER_1K"),
            output_per_1k: price_from_env("LLM_OUTPUT_COST_PER_1K"),
        }
    }

    /// Zero prices count as unset.
    pub fn is_set(&self) -> bool {
        self.input_per_1k.is_some_and(|p| p != 0.0) || self.output_per_1k.is_some_and(|p| p != 0.0)
    }
}

/// Token counts and optional provider-reported cost from a response `usage` object.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub reported_cost: Option<f64>,
}

fn token_count(usage: &Value, keys: &[&str]) -> Option<u64> {
    first_present(usage, keys).and_then(Value::as_u64)
}

impl LlmUsage {
    pub fn from_value(usage: &Value) -> Self {
        let input_tokens = token_count(usage, &["prompt_tokens", "input_tokens"]).unwrap_or(0);
        let output_tokens =
            token_count(usage, &["completion_tokens", "output_tokens"]).unwrap_or(0);
        let total_tokens =
            token_count(usage, &["total_tokens"]).unwrap_or(input_tokens + output_tokens);
        let reported_cost = first_present(usage, &["total_cost", "totalCost", "cost"])
            .and_then(|v| match v {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            })
            .filter(|c| c.is_finite());
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
            reported_cost,
        }
    }

    /// Provider-reported cost, else computed from `pricing`, else `None`.
    pub fn cost(&self, pricing: &TokenPricing) -> Option<f64> {
        if let Some(c) = self.reported_cost {
            return Some(c);
        }
        if !pricing.is_set() {
            return None;
        }
        let input = self.input_tokens as f64 / 1000.0 * pricing.input_per_1k.unwrap_or(0.0);
        let output = self.output_tokens as f64 / 1000.0 * pricing.output_per_1k.unwrap_or(0.0);
        Some(input + output)
    }
}

pub fn format_usd(amount: f64) -> String {
    format!("${amount:.6}")
}

fn log_usage(usage: Option<&Value>, pricing: &TokenPricing) {
    let Some(usage) = usage.filter(|u| u.is_object()) else {
        info!(cost = "N/A (missing usage data)", "llm usage");
        return;
    };
    let u = LlmUsage::from_value(usage);
    let cost = match u.cost(pricing) {
        Some(c) => format_usd(c),
        None => "N/A (set LLM_INPUT_COST_PER_1K / LLM_OUTPUT_COST_PER_1K)".to_string(),
    };
    info!(
        input_tokens = u.input_tokens,
        output_tokens = u.output_tokens,
        total_tokens = u.total_tokens,
        cost = %cost,
        "llm usage"
    );
}

/// First non-empty completion text: chat `message.content`, legacy `text`, or
/// responses-style `output_text`.
pub fn completion_text(resp: &Value) -> String {
    ["/choices/0/message/content", "/choices/0/text", "/output_text"]
        .iter()
        .filter_map(|p| resp.pointer(p).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Chat-completions client for any OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    pricing: TokenPricing,
    timeout: Duration,
}

impl OpenAiCompatClient {
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            pricing: TokenPricing::default(),
            timeout: Duration::from_secs(120),
        }
    }

    /// Endpoint, key and model are all required.
    pub fn from_env(client: reqwest::Client) -> Result<Self> {
        let endpoint = llm_api_url_from_env()
            .ok_or_else(|| Error::NotConfigured("missing LLM_API_URL".to_string()))?;
        let api_key = llm_api_key_from_env()
            .ok_or_else(|| Error::NotConfigured("missing LLM_API_KEY".to_string()))?;
        let model = llm_model_from_env()
            .ok_or_else(|| Error::NotConfigured("missing LLM_MODEL".to_string()))?;
        Ok(Self::new(client, endpoint, api_key, model).with_pricing(TokenPricing::from_env()))
    }

    pub fn with_pricing(mut self, pricing: TokenPricing) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn chat(&self, system: &str, user: &str, temperature: Option<f64>) -> Result<String> {
        let req = ChatCompletionsRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            temperature,
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", self.api_key),
            )
            .json(&req)
            .send()
            .await
            .map_err(|e| Error::Llm(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Llm(format!("LLM request failed: {body}")));
        }

        let parsed: Value = resp.json().await.map_err(|e| Error::Llm(e.to_string()))?;
        log_usage(parsed.get("usage"), &self.pricing);
        Ok(completion_text(&parsed))
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionsRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: String,
    content: String,
}
