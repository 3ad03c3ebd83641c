//! Watermark resolution against the pool authority.
//!
//! The retention watermark comes from a remote authority that is
//! occasionally unavailable, so resolution fans out across a set of
//! endpoints with exponential backoff between attempts. Within one
//! attempt every endpoint is queried sequentially and the first
//! well-formed response wins; a failing endpoint is logged and skipped,
//! never raised. Only exhausting every endpoint across every attempt is
//! an error.

use crate::config::{
    endpoints_for_chain, BACKOFF_BASE, BACKOFF_CAP, BACKOFF_MAX_RETRIES,
};
use crate::error::{Error, Result};
use metrics::counter;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Response envelope of the pool authority's settings endpoint.
///
/// Only the current key is read; the rest of the body is ignored.
#[derive(Debug, Deserialize)]
struct PoolSettingsResponse {
    pool: PoolWrapper,
}

#[derive(Debug, Deserialize)]
struct PoolWrapper {
    data: PoolData,
}

#[derive(Debug, Deserialize)]
struct PoolData {
    current_key: String,
}

/// Resolves the current retention watermark from the pool authority.
#[derive(Debug)]
pub struct WatermarkResolver {
    client: reqwest::Client,
    endpoints: Vec<String>,
    pool_id: i64,
    max_attempts: u32,
    backoff_base: Duration,
    backoff_cap: Duration,
}

impl WatermarkResolver {
    /// Build a resolver for a chain id and pool.
    ///
    /// An explicit `endpoint_override` is used verbatim; otherwise the
    /// built-in endpoint set for `chain_id` is selected. An unrecognized
    /// chain id is a non-retryable configuration error.
    pub fn new(
        chain_id: &str,
        pool_id: i64,
        endpoint_override: Option<Vec<String>>,
    ) -> Result<Self> {
        let endpoints = match endpoint_override {
            Some(endpoints) => endpoints,
            None => endpoints_for_chain(chain_id)
                .ok_or_else(|| Error::Config(format!("unknown chain id {:?}", chain_id)))?,
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            endpoints,
            pool_id,
            max_attempts: BACKOFF_MAX_RETRIES,
            backoff_base: BACKOFF_BASE,
            backoff_cap: BACKOFF_CAP,
        })
    }

    /// Override the backoff schedule. Used by tests to keep retries fast.
    pub fn with_backoff(mut self, base: Duration, cap: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_cap = cap;
        self
    }

    /// Override the maximum number of attempts.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// The endpoints this resolver queries, in order.
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Delay before the attempt after `attempt` (0-based): `base * 2^attempt`,
    /// capped.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = self
            .backoff_base
            .saturating_mul(2u32.saturating_pow(attempt));
        exp.min(self.backoff_cap)
    }

    /// Resolve the current watermark.
    ///
    /// Tries every endpoint sequentially per attempt, sleeping between
    /// failed attempts, up to the attempt limit. First success
    /// short-circuits.
    pub async fn resolve(&self) -> Result<String> {
        for attempt in 0..self.max_attempts {
            for endpoint in &self.endpoints {
                counter!("watermark_requests_total").increment(1);
                match self.request_current_key(endpoint).await {
                    Ok(key) => return Ok(key),
                    Err(e) => {
                        counter!("watermark_request_failures_total").increment(1);
                        warn!(endpoint = %endpoint, error = %e, "failed to request pool key");
                    }
                }
            }

            if attempt + 1 < self.max_attempts {
                let delay = self.backoff_delay(attempt);
                info!(attempt = attempt + 1, ?delay, "retrying pool query");
                sleep(delay).await;
            }
        }

        Err(Error::WatermarkExhausted {
            attempts: self.max_attempts,
        })
    }

    /// Issue one GET against one endpoint and extract the current key.
    async fn request_current_key(&self, endpoint: &str) -> Result<String> {
        let url = format!(
            "{}/kyve/query/v1beta1/pool/{}",
            endpoint.trim_end_matches('/'),
            self.pool_id
        );

        let response = self.client.get(&url).send().await?.error_for_status()?;
        let settings: PoolSettingsResponse = response.json().await?;
        Ok(settings.pool.data.current_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_chain_is_config_error() {
        let err = WatermarkResolver::new("testnet-9", 0, None).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_override_bypasses_chain_map() {
        // The chain id is not consulted when an override is given.
        let resolver = WatermarkResolver::new(
            "testnet-9",
            0,
            Some(vec!["https://x.example".to_string()]),
        )
        .unwrap();
        assert_eq!(resolver.endpoints(), ["https://x.example"]);
    }

    #[test]
    fn test_builtin_endpoints_selected_by_chain() {
        let resolver = WatermarkResolver::new("kaon-1", 0, None).unwrap();
        assert_eq!(resolver.endpoints(), ["https://api.kaon.kyve.network"]);
    }

    #[test]
    fn test_backoff_doubles_then_caps() {
        let resolver = WatermarkResolver::new("kyve-1", 0, None)
            .unwrap()
            .with_backoff(Duration::from_secs(1), Duration::from_secs(60));

        assert_eq!(resolver.backoff_delay(0), Duration::from_secs(1));
        assert_eq!(resolver.backoff_delay(1), Duration::from_secs(2));
        assert_eq!(resolver.backoff_delay(5), Duration::from_secs(32));
        // 2^6 = 64s exceeds the cap.
        assert_eq!(resolver.backoff_delay(6), Duration::from_secs(60));
        assert_eq!(resolver.backoff_delay(14), Duration::from_secs(60));
    }
}

/// Integration tests with mock endpoints.
#[cfg(test)]
mod mock_tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn pool_body(current_key: &str) -> serde_json::Value {
        serde_json::json!({
            "pool": {
                "data": {
                    "start_key": "1",
                    "current_key": current_key,
                    "upload_interval": "60",
                    "max_bundle_size": "100"
                }
            }
        })
    }

    fn resolver_for(endpoints: Vec<String>) -> WatermarkResolver {
        WatermarkResolver::new("kyve-1", 7, Some(endpoints))
            .unwrap()
            .with_backoff(Duration::from_millis(1), Duration::from_millis(4))
    }

    #[tokio::test]
    async fn test_resolve_returns_current_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/kyve/query/v1beta1/pool/7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(pool_body("1700000123")))
            .expect(1)
            .mount(&server)
            .await;

        let resolver = resolver_for(vec![server.uri()]);
        assert_eq!(resolver.resolve().await.unwrap(), "1700000123");
    }

    #[tokio::test]
    async fn test_fanout_first_success_wins() {
        // First two endpoints fail, third succeeds: resolve returns the
        // third's value within the first attempt.
        let bad_a = MockServer::start().await;
        let bad_b = MockServer::start().await;
        let good = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&bad_a)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&bad_b)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(pool_body("42")))
            .expect(1)
            .mount(&good)
            .await;

        let resolver = resolver_for(vec![bad_a.uri(), bad_b.uri(), good.uri()]);
        assert_eq!(resolver.resolve().await.unwrap(), "42");
    }

    #[tokio::test]
    async fn test_malformed_body_advances_to_next_endpoint() {
        let malformed = MockServer::start().await;
        let good = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"pool": {}})),
            )
            .mount(&malformed)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(pool_body("99")))
            .mount(&good)
            .await;

        let resolver = resolver_for(vec![malformed.uri(), good.uri()]);
        assert_eq!(resolver.resolve().await.unwrap(), "99");
    }

    #[tokio::test]
    async fn test_exhaustion_after_all_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            // One request per attempt on the single endpoint.
            .expect(15)
            .mount(&server)
            .await;

        let resolver = resolver_for(vec![server.uri()]);
        let err = resolver.resolve().await.unwrap_err();
        assert!(matches!(err, Error::WatermarkExhausted { attempts: 15 }));
    }

    #[tokio::test]
    async fn test_later_attempt_can_succeed() {
        let server = MockServer::start().await;
        // Fail the whole first attempt, succeed on the second.
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(pool_body("7")))
            .mount(&server)
            .await;

        let resolver = resolver_for(vec![server.uri()]);
        assert_eq!(resolver.resolve().await.unwrap(), "7");
    }
}
