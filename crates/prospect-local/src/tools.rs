use std::time::Duration;

use prospect_core::{ToolClient, ToolFailure};
use serde_json::Value;
use tracing::{debug, warn};

/// Bounded retry with linear backoff.
///
/// Attempt `n` (0-based) failing sleeps `backoff_step * (n + 1)` before the next one;
/// `retries + 1` attempts are made in total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 2,
            backoff_step: Duration::from_millis(400),
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_step * (attempt + 1)
    }
}

/// Fixed pauses between sequential upstream calls (rate limiting, not ordering).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPacing {
    pub company_pause: Duration,
    pub catalog_pause: Duration,
}

impl Default for CallPacing {
    fn default() -> Self {
        Self {
            company_pause: Duration::from_millis(350),
            catalog_pause: Duration::from_millis(200),
        }
    }
}

impl CallPacing {
    pub fn none() -> Self {
        Self {
            company_pause: Duration::ZERO,
            catalog_pause: Duration::ZERO,
        }
    }
}

/// A [`ToolClient`] behind a retry policy.
///
/// `call` never fails: an exhausted tool becomes `{ "error": "<message>" }`, which every
/// compactor passes through untouched.
#[derive(Debug, Clone)]
pub struct Tools<C> {
    client: C,
    retry: RetryPolicy,
}

impl<C: ToolClient> Tools<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn into_inner(self) -> C {
        self.client
    }

    pub async fn call(&self, name: &str, args: Value) -> Value {
        let mut attempt = 0;
        loop {
            debug!(tool = name, attempt, "tool call");
            match self.client.call(name, args.clone()).await {
                Ok(v) => return v,
                Err(e) if !e.is_retryable() => {
                    debug!(tool = name, error = %e, "tool call failed; not retryable");
                    return ToolFailure::new(e.to_string()).to_value();
                }
                Err(e) if attempt >= self.retry.retries => {
                    warn!(tool = name, attempts = attempt + 1, error = %e, "tool call exhausted retries");
                    return ToolFailure::new(e.to_string()).to_value();
                }
                Err(e) => {
                    let wait = self.retry.backoff(attempt);
                    warn!(tool = name, attempt, wait_ms = wait.as_millis() as u64, error = %e, "tool call failed; retrying");
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
            }
        }
    }

    pub async fn pause(&self, d: Duration) {
        if !d.is_zero() {
            tokio::time::sleep(d).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedClient;
    use prospect_core::Error;
    use serde_json::json;

    fn fast() -> RetryPolicy {
        RetryPolicy {
            retries: 2,
            backoff_step: Duration::ZERO,
        }
    }

    #[test]
    fn backoff_is_linear() {
        let p = RetryPolicy::default();
        assert_eq!(p.backoff(0), Duration::from_millis(400));
        assert_eq!(p.backoff(1), Duration::from_millis(800));
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let client = ScriptedClient::default()
            .fail("company_fai", "503")
            .fail("company_fai", "503")
            .ok("company_fai", json!({"departments": []}));
        let tools = Tools::new(client).with_retry(fast());
        let out = tools.call("company_fai", json!({"companyDomain": "a.com"})).await;
        assert_eq!(out, json!({"departments": []}));
        assert_eq!(tools.client().calls().len(), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_become_error_value() {
        let client = ScriptedClient::default()
            .fail("company_fai", "one")
            .fail("company_fai", "two")
            .fail("company_fai", "three")
            .ok("company_fai", json!({"never": "reached"}));
        let tools = Tools::new(client).with_retry(fast());
        let out = tools.call("company_fai", json!({})).await;
        assert_eq!(out, json!({"error": "tool call failed: three"}));
        assert_eq!(tools.client().calls().len(), 3);
    }

    #[tokio::test]
    async fn not_configured_is_not_retried() {
        let client = ScriptedClient::default()
            .reply("company_fai", Err(Error::NotConfigured("missing PROSPECT_MCP_URL".into())))
            .ok("company_fai", json!({"never": "reached"}));
        // a real backoff would make this test slow if the error were retried
        let tools = Tools::new(client).with_retry(RetryPolicy {
            retries: 2,
            backoff_step: Duration::from_secs(30),
        });
        let out = tools.call("company_fai", json!({})).await;
        assert_eq!(out, json!({"error": "not configured: missing PROSPECT_MCP_URL"}));
        assert_eq!(tools.client().calls().len(), 1);
    }

    #[tokio::test]
    async fn zero_retries_means_one_attempt() {
        let client = ScriptedClient::default().fail("x", "down");
        let tools = Tools::new(client).with_retry(RetryPolicy {
            retries: 0,
            backoff_step: Duration::ZERO,
        });
        assert!(tools.call("x", json!({})).await.get("error").is_some());
        assert_eq!(tools.client().calls().len(), 1);
    }
}
