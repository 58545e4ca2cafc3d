//! Sales-call brief generation from a compact payload.

use prospect_core::Error;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::openai_compat::OpenAiCompatClient;

pub const BRIEF_SYSTEM_PROMPT: &str = "You are a senior B2B sales strategist.";
pub const BRIEF_TEMPERATURE: f64 = 0.2;
pub const LLM_NOT_CONFIGURED: &str =
    "LLM not configured. Set LLM_API_URL, LLM_API_KEY, and LLM_MODEL.";
pub const INVALID_BRIEF_JSON: &str = "LLM response was not valid JSON.";

const BRIEF_INSTRUCTIONS: &str = r#"You will receive compact company data.
Return STRICTLY valid JSON (no markdown, no extra text), with EXACTLY this structure:
{
  "sales_thesis": {
    "primary_angle": "...",
    "why_now": "...",
    "business_impact": ["...", "..."]
  },
  "company_snapshot": {
    "what_matters_for_sales": ["...", "..."]
  },
  "key_pains_ranked": [
    {
      "pain": "...",
      "real_world_effect": "...",
      "sales_leverage": "..."
    }
  ],
  "challenger_talk_track": {
    "opening_statement": "...",
    "assumptions": ["...", "..."],
    "questions": ["...", "..."]
  },
  "recommended_next_step": {
    "positioning": "...",
    "format": "...",
    "outcome": "...",
    "why_it_converts": "..."
  },
  "product_recommendations": {
    "primary_fit": "...",
    "recommended_products": [
      {
        "product": "...",
        "vendor": "...",
        "category": "...",
        "why_fit": "...",
        "proof_points": ["..."]
      }
    ]
  }
}
RULES:
- Assertive, opinionated, closing-oriented tone (Challenger Sale).
- Forbidden words: "likely", "potential", "may".
- Max 3 pains. Max 5-6 questions.
- If data is missing, make an explicit, defensible assumption.
- Write in English.
- Product recommendations must be sales-ready and tied to the signals in the data.
 - Use sales_signals for ICP prioritization, qualification, and GTM credibility.
 - Use product_signals to ground product matches and proof points."#;

/// LLM client from the environment, or `None` when any required setting is missing.
pub fn brief_llm_from_env() -> Option<OpenAiCompatClient> {
    let http = match reqwest::Client::builder()
        .user_agent(concat!("prospect/", env!("CARGO_PKG_VERSION")))
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "could not build http client for llm");
            return None;
        }
    };
    match OpenAiCompatClient::from_env(http) {
        Ok(c) => Some(c),
        Err(e) => {
            debug!(reason = %e, "llm not configured");
            None
        }
    }
}

pub fn build_brief_prompt(compact: &Value, company_domain: &str, company_name: Option<&str>) -> String {
    let name = company_name.filter(|n| !n.is_empty()).unwrap_or("Unknown");
    format!("{BRIEF_INSTRUCTIONS}\nCompany: {name} ({company_domain})\nCompact data:\n{compact}")
}

/// Parse the model's reply, tolerating prose around the JSON object.
///
/// The span from the first `{` to the last `}` is parsed; without such a span the whole
/// text is. Unparseable replies become `{ "error", "raw" }`.
pub fn parse_brief(text: &str) -> Value {
    let span = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => text,
    };
    serde_json::from_str(span).unwrap_or_else(|_| json!({ "error": INVALID_BRIEF_JSON, "raw": text }))
}

/// Brief JSON, or `{ "error": ... }`. Never fails.
pub async fn generate_brief(
    llm: Option<&OpenAiCompatClient>,
    compact: &Value,
    company_domain: &str,
    company_name: Option<&str>,
) -> Value {
    let Some(llm) = llm else {
        return json!({ "error": LLM_NOT_CONFIGURED });
    };
    let prompt = build_brief_prompt(compact, company_domain, company_name);
    match llm
        .chat(BRIEF_SYSTEM_PROMPT, &prompt, Some(BRIEF_TEMPERATURE))
        .await
    {
        Ok(text) => parse_brief(&text),
        Err(e) => {
            warn!(domain = company_domain, error = %e, "brief generation failed");
            let message = match e {
                Error::Llm(m) => m,
                other => other.to_string(),
            };
            json!({ "error": message })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_company_and_appends_payload() {
        let p = build_brief_prompt(&json!({"company": {"name": "Acme"}}), "acme.com", None);
        assert!(p.starts_with("You will receive compact company data."));
        assert!(p.contains("Company: Unknown (acme.com)\nCompact data:\n"));
        assert!(p.ends_with(r#"{"company":{"name":"Acme"}}"#));

        let named = build_brief_prompt(&json!({}), "acme.com", Some("Acme Corp"));
        assert!(named.contains("Company: Acme Corp (acme.com)"));
    }

    #[test]
    fn parse_strips_surrounding_prose() {
        let v = parse_brief("Sure! Here it is:\n```json\n{\"sales_thesis\": {\"why_now\": \"x\"}}\n```");
        assert_eq!(v, json!({"sales_thesis": {"why_now": "x"}}));
    }

    #[test]
    fn parse_failure_keeps_raw_text() {
        let v = parse_brief("no json here");
        assert_eq!(v, json!({"error": INVALID_BRIEF_JSON, "raw": "no json here"}));
        let broken = parse_brief("{\"a\": }");
        assert_eq!(broken["error"], INVALID_BRIEF_JSON);
        assert_eq!(parse_brief("")["raw"], "");
    }

    #[tokio::test]
    async fn unconfigured_llm_is_an_error_value() {
        let v = generate_brief(None, &json!({}), "acme.com", None).await;
        assert_eq!(v, json!({"error": LLM_NOT_CONFIGURED}));
    }
}
