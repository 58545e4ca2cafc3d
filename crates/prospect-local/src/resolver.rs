//! Free-text query to company domain.
//!
//! Strategies run in order and the first non-empty domain wins:
//! direct extraction, company-directory search, web search, then a `.com` slug guess.
//! Tool failures fall through to the next strategy; only exhausting all four is an error.

use prospect_core::domain::{
    companies_from_search, domain_from_web_search, extract_domain, guess_domain,
    normalize_domain, pick_company,
};
use prospect_core::{unwrap_envelope, Error, ResolvedCompany, Result, ToolClient};
use serde_json::json;
use tracing::info;

use crate::tools::Tools;

pub async fn resolve_company_domain<C: ToolClient>(
    tools: &Tools<C>,
    query: &str,
) -> Result<ResolvedCompany> {
    let direct = extract_domain(query);
    if !direct.is_empty() {
        info!(query, domain = %direct, strategy = "direct", "resolved company domain");
        return Ok(ResolvedCompany {
            domain: direct,
            name: None,
        });
    }

    let search = tools
        .call("search_companies", json!({ "searchCriteria": query }))
        .await;
    let companies = if unwrap_envelope(&search).is_err() {
        Vec::new()
    } else {
        companies_from_search(&search)
    };
    if let Some(best) = pick_company(&companies, query) {
        let domain = normalize_domain(best.domain.as_deref().unwrap_or(""));
        if !domain.is_empty() {
            info!(query, domain = %domain, strategy = "directory", "resolved company domain");
            return Ok(ResolvedCompany {
                domain,
                name: best.company_name.clone().filter(|n| !n.is_empty()),
            });
        }
    }

    let web = tools
        .call(
            "web_search",
            json!({ "query": format!("{query} official website"), "limit": 5 }),
        )
        .await;
    let domain = domain_from_web_search(&web, query);
    if !domain.is_empty() {
        info!(query, domain = %domain, strategy = "web_search", "resolved company domain");
        return Ok(ResolvedCompany { domain, name: None });
    }

    let guess = guess_domain(query);
    if guess.is_empty() {
        return Err(Error::UnresolvableDomain {
            query: query.to_string(),
        });
    }
    info!(query, domain = %guess, strategy = "guess", "resolved company domain");
    Ok(ResolvedCompany {
        domain: guess,
        name: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedClient;
    use crate::tools::RetryPolicy;
    use serde_json::json;
    use std::time::Duration;

    fn tools(client: ScriptedClient) -> Tools<ScriptedClient> {
        Tools::new(client).with_retry(RetryPolicy {
            retries: 0,
            backoff_step: Duration::ZERO,
        })
    }

    #[tokio::test]
    async fn direct_domain_needs_no_tools() {
        let t = tools(ScriptedClient::default());
        let r = resolve_company_domain(&t, "taxjar.com").await.unwrap();
        assert_eq!(
            r,
            ResolvedCompany {
                domain: "taxjar.com".to_string(),
                name: None
            }
        );
        assert!(t.client().calls().is_empty());
    }

    #[tokio::test]
    async fn directory_match_carries_name() {
        let client = ScriptedClient::default().ok(
            "search_companies",
            json!({"structuredContent": {"companies": [
                {"companyName": "Stripe Atlas"},
                {"companyName": "Stripe", "domain": "www.Stripe.com"}
            ]}}),
        );
        let t = tools(client);
        let r = resolve_company_domain(&t, "Stripe").await.unwrap();
        assert_eq!(r.domain, "stripe.com");
        assert_eq!(r.name.as_deref(), Some("Stripe"));
        assert_eq!(
            t.client().calls(),
            vec![("search_companies".to_string(), json!({"searchCriteria": "Stripe"}))]
        );
    }

    #[tokio::test]
    async fn domainless_directory_row_falls_through_to_web_search() {
        let client = ScriptedClient::default()
            .ok("search_companies", json!({"companies": [{"companyName": "Acme"}]}))
            .ok(
                "web_search",
                json!({"results": [
                    {"url": "https://www.linkedin.com/company/acme"},
                    {"url": "https://acme.io/about"},
                    {"url": "https://www.acme.com"}
                ]}),
            );
        let t = tools(client);
        let r = resolve_company_domain(&t, "Acme").await.unwrap();
        assert_eq!(r.domain, "acme.com");
        assert_eq!(r.name, None);
        let calls = t.client().calls();
        assert_eq!(calls[1].1, json!({"query": "Acme official website", "limit": 5}));
    }

    #[tokio::test]
    async fn directory_error_payload_is_ignored() {
        let client = ScriptedClient::default()
            .ok(
                "search_companies",
                json!({"error": "rate limited", "companies": [{"domain": "wrong.com"}]}),
            )
            .ok("web_search", json!({"results": []}));
        let t = tools(client);
        let r = resolve_company_domain(&t, "Globex").await.unwrap();
        assert_eq!(r.domain, "globex.com");
    }

    #[tokio::test]
    async fn failing_tools_fall_back_to_slug_guess() {
        let client = ScriptedClient::default()
            .fail("search_companies", "down")
            .fail("web_search", "down");
        let t = tools(client);
        let r = resolve_company_domain(&t, "Acme Labs, Inc").await.unwrap();
        assert_eq!(r.domain, "acmelabsinc.com");
        assert_eq!(t.client().call_names(), vec!["search_companies", "web_search"]);
    }

    #[tokio::test]
    async fn exhausted_strategies_are_a_named_failure() {
        let t = tools(ScriptedClient::default());
        let err = resolve_company_domain(&t, "!!!").await.unwrap_err();
        assert!(matches!(err, Error::UnresolvableDomain { ref query } if query == "!!!"));
    }
}
