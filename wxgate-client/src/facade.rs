//! Per-provider facade: validation, caching and retries around a transport.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use wxgate_cache::{BoundedCache, CacheStats};
use wxgate_core::error::Result;
use wxgate_core::{ProviderId, Query, Transport, Ttl, TtlPolicy, WeatherError};

use crate::retry::{Retrier, RetryPolicy};

/// A fetched value plus how it was obtained.
#[derive(Clone, Debug, PartialEq)]
pub struct Fetched {
    /// Upstream payload
    pub value: Value,
    /// Served from cache without touching the network
    pub from_cache: bool,
    /// Upstream attempts made; zero for cache hits
    pub attempts: u32,
    /// Lifetime the value was cached with, when it was stored
    pub ttl: Option<Ttl>,
}

/// Result of a health probe.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProviderStatus {
    /// Probed provider
    pub provider: ProviderId,
    /// Whether the probe succeeded
    pub operational: bool,
    /// Human-readable summary
    pub message: String,
    /// When the probe completed
    pub last_checked: DateTime<Utc>,
}

/// Entry point for one provider.
///
/// `fetch` validates the query, rejects queries the provider does not offer,
/// answers from the cache when it can, and
/// otherwise runs the transport under the retry policy and caches the result
/// with the lifetime its data category allows.
pub struct ProviderFacade<T: Transport> {
    transport: T,
    retrier: Retrier,
    ttl_policy: TtlPolicy,
    cache: Option<Arc<BoundedCache<Value>>>,
}

impl<T: Transport> ProviderFacade<T> {
    /// Creates a facade. Pass `None` as `cache` to disable caching.
    pub fn new(
        transport: T,
        retry_policy: RetryPolicy,
        cache: Option<Arc<BoundedCache<Value>>>,
    ) -> Self {
        Self {
            transport,
            retrier: Retrier::new(retry_policy),
            ttl_policy: TtlPolicy::default(),
            cache,
        }
    }

    /// Replaces the retrier, e.g. with a seeded one.
    pub fn with_retrier(mut self, retrier: Retrier) -> Self {
        self.retrier = retrier;
        self
    }

    /// Replaces the freshness policy.
    pub fn with_ttl_policy(mut self, ttl_policy: TtlPolicy) -> Self {
        self.ttl_policy = ttl_policy;
        self
    }

    /// Provider behind this facade.
    pub fn provider(&self) -> ProviderId {
        self.transport.provider()
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Shared cache, if caching is enabled.
    pub fn cache(&self) -> Option<&Arc<BoundedCache<Value>>> {
        self.cache.as_ref()
    }

    /// Fetches `query`, returning only the payload.
    pub async fn fetch(&self, query: &Query) -> Result<Value> {
        self.fetch_detailed(query).await.map(|fetched| fetched.value)
    }

    /// Fetches `query` and reports cache and retry details.
    #[instrument(
        skip(self, query),
        fields(provider = %self.provider(), query = query.name())
    )]
    pub async fn fetch_detailed(&self, query: &Query) -> Result<Fetched> {
        let provider = self.provider();
        query.validate(provider)?;
        if !self.transport.supports(query) {
            return Err(WeatherError::validation(
                provider,
                format!(
                    "{} queries are not offered by {}",
                    query.name(),
                    provider.display_name()
                ),
            ));
        }

        let key = query.cache_key(provider);
        if let Some(cache) = &self.cache {
            if let Some(value) = cache.get(&key) {
                debug!(key = %key, "Cache hit");
                return Ok(Fetched {
                    value,
                    from_cache: true,
                    attempts: 0,
                    ttl: None,
                });
            }
            debug!(key = %key, "Cache miss");
        }

        let outcome = self
            .retrier
            .run(query.name(), |_| self.transport.send(query))
            .await;
        let attempts = outcome.attempts;
        let value = outcome.result?;

        info!(attempts, "Fetched from upstream");

        let ttl = self.cache.as_ref().map(|cache| {
            let ttl = self.ttl_policy.ttl_for_now(query.category());
            debug!(key = %key, %ttl, "Caching response");
            cache.put(key, value.clone(), ttl);
            ttl
        });

        Ok(Fetched {
            value,
            from_cache: false,
            attempts,
            ttl,
        })
    }

    /// Probes the provider once, bypassing the cache and the retry policy.
    #[instrument(skip(self), fields(provider = %self.provider()))]
    pub async fn status(&self) -> ProviderStatus {
        let provider = self.provider();
        let result = self.transport.probe().await;
        let last_checked = Utc::now();

        match result {
            Ok(()) => ProviderStatus {
                provider,
                operational: true,
                message: format!("{} is operational", provider.display_name()),
                last_checked,
            },
            Err(e) => {
                warn!(error = %e, "Health probe failed");
                ProviderStatus {
                    provider,
                    operational: false,
                    message: e.user_message(),
                    last_checked,
                }
            }
        }
    }

    /// Cache statistics, or `None` when caching is disabled.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|cache| cache.stats())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};
    use wxgate_cache::CacheConfig;
    use wxgate_core::constants::FORECAST_TTL;
    use wxgate_core::{Coordinates, ErrorKind, WeatherError};

    use crate::transport::{OpenMeteoConfig, OpenMeteoTransport};

    type Responder = Box<dyn Fn(u32) -> Result<Value> + Send + Sync>;

    /// Transport answering from a closure of the 0-indexed call number.
    struct Scripted {
        calls: AtomicU32,
        respond: Responder,
    }

    impl Scripted {
        fn new(respond: impl Fn(u32) -> Result<Value> + Send + Sync + 'static) -> Self {
            Self {
                calls: AtomicU32::new(0),
                respond: Box::new(respond),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        fn provider(&self) -> ProviderId {
            ProviderId::OpenMeteo
        }

        fn supports(&self, query: &Query) -> bool {
            !matches!(query, Query::Alerts { .. })
        }

        async fn send(&self, _query: &Query) -> Result<Value> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            (self.respond)(call)
        }

        async fn probe(&self) -> Result<()> {
            (self.respond)(0).map(|_| ())
        }
    }

    fn shared_cache() -> Arc<BoundedCache<Value>> {
        Arc::new(BoundedCache::with_config(CacheConfig::with_max_entries(16)))
    }

    fn facade(
        transport: Scripted,
        cache: Option<Arc<BoundedCache<Value>>>,
    ) -> ProviderFacade<Scripted> {
        ProviderFacade::new(transport, RetryPolicy::default(), cache)
            .with_retrier(Retrier::with_seed(RetryPolicy::default(), 7))
    }

    fn forecast() -> Query {
        Query::Forecast {
            coords: Coordinates::new(47.6062, -122.3321),
            days: 3,
        }
    }

    fn unavailable() -> WeatherError {
        WeatherError::upstream_status(ProviderId::OpenMeteo, 503)
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_fetch_is_served_from_cache() {
        let facade = facade(Scripted::new(|_| Ok(json!({"t": 1}))), Some(shared_cache()));

        let first = facade.fetch_detailed(&forecast()).await.unwrap();
        assert!(!first.from_cache);
        assert_eq!(first.attempts, 1);
        assert_eq!(first.ttl, Some(Ttl::Finite(FORECAST_TTL)));

        let second = facade.fetch_detailed(&forecast()).await.unwrap();
        assert!(second.from_cache);
        assert_eq!(second.value, json!({"t": 1}));
        assert_eq!(facade.transport().calls(), 1);

        let stats = facade.cache_stats().unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_value_expires_with_category_ttl() {
        let facade = facade(
            Scripted::new(|n| Ok(json!({"call": n}))),
            Some(shared_cache()),
        );

        facade.fetch(&forecast()).await.unwrap();
        tokio::time::advance(FORECAST_TTL + Duration::from_secs(1)).await;

        let refreshed = facade.fetch(&forecast()).await.unwrap();
        assert_eq!(refreshed, json!({"call": 1}));
        assert_eq!(facade.transport().calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_disabled_always_calls_upstream() {
        let facade = facade(Scripted::new(|_| Ok(json!({}))), None);

        for _ in 0..3 {
            let fetched = facade.fetch_detailed(&forecast()).await.unwrap();
            assert!(!fetched.from_cache);
            assert_eq!(fetched.ttl, None);
        }
        assert_eq!(facade.transport().calls(), 3);
        assert!(facade.cache_stats().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_query_never_reaches_transport() {
        let facade = facade(Scripted::new(|_| Ok(json!({}))), Some(shared_cache()));
        let query = Query::Forecast {
            coords: Coordinates::new(123.0, 0.0),
            days: 3,
        };

        let err = facade.fetch(&query).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(facade.transport().calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsupported_query_is_rejected_before_cache_and_transport() {
        let facade = facade(Scripted::new(|_| Ok(json!({}))), Some(shared_cache()));
        let query = Query::Alerts {
            coords: Coordinates::new(47.6062, -122.3321),
        };

        let err = facade.fetch(&query).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(!err.is_retryable());
        assert_eq!(facade.transport().calls(), 0);

        let stats = facade.cache_stats().unwrap();
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.hits, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_retryable_failure_uses_full_budget() {
        let facade = facade(Scripted::new(|_| Err(unavailable())), Some(shared_cache()));

        let err = facade.fetch(&forecast()).await.unwrap_err();
        assert_eq!(err, unavailable());
        assert!(err.is_retryable());
        assert_eq!(facade.transport().calls(), 4);
        assert!(facade.cache().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_terminal_failure_is_not_retried() {
        let facade = facade(
            Scripted::new(|_| {
                Err(WeatherError::not_found(ProviderId::OpenMeteo, "forecast"))
            }),
            Some(shared_cache()),
        );

        let err = facade.fetch(&forecast()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(facade.transport().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finalized_history_is_cached_forever() {
        let facade = facade(
            Scripted::new(|_| Ok(json!({"daily": {}}))),
            Some(shared_cache()),
        );
        let query = Query::Historical {
            coords: Coordinates::new(40.0, -105.0),
            start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2020, 1, 31).unwrap(),
        };

        let fetched = facade.fetch_detailed(&query).await.unwrap();
        assert_eq!(fetched.ttl, Some(Ttl::Infinite));
    }

    #[tokio::test(start_paused = true)]
    async fn test_facades_sharing_a_cache_do_not_collide() {
        let cache = shared_cache();
        let a = facade(Scripted::new(|_| Ok(json!("a"))), Some(Arc::clone(&cache)));
        let b = facade(Scripted::new(|_| Ok(json!("b"))), Some(Arc::clone(&cache)));

        assert_eq!(a.fetch(&forecast()).await.unwrap(), json!("a"));
        let other = Query::Forecast {
            coords: Coordinates::new(47.6062, -122.3321),
            days: 4,
        };
        assert_eq!(b.fetch(&other).await.unwrap(), json!("b"));
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_status_reports_probe_result() {
        let up = facade(Scripted::new(|_| Ok(json!({}))), None);
        let status = up.status().await;
        assert!(status.operational);
        assert_eq!(status.provider, ProviderId::OpenMeteo);

        let down = facade(Scripted::new(|_| Err(unavailable())), None);
        let status = down.status().await;
        assert!(!status.operational);
        assert!(status.message.contains("temporarily unavailable"));
        assert_eq!(down.transport().calls(), 0);
    }

    fn http_facade(server: &MockServer) -> ProviderFacade<OpenMeteoTransport> {
        let transport =
            OpenMeteoTransport::new(OpenMeteoConfig::default().with_base_url(server.uri()))
                .unwrap();
        let policy = RetryPolicy::new(3, Duration::from_millis(10));
        ProviderFacade::new(transport, policy.clone(), Some(shared_cache()))
            .with_retrier(Retrier::with_seed(policy, 42))
    }

    #[tokio::test]
    async fn test_rate_limited_twice_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"daily": {"ok": true}})),
            )
            .mount(&server)
            .await;

        let facade = http_facade(&server);
        let fetched = facade.fetch_detailed(&forecast()).await.unwrap();
        assert_eq!(fetched.attempts, 3);
        assert_eq!(fetched.value["daily"]["ok"], true);

        let again = facade.fetch_detailed(&forecast()).await.unwrap();
        assert!(again.from_cache);
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_not_found_fails_after_one_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let facade = http_facade(&server);
        let err = facade.fetch(&forecast()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!err.is_retryable());
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }
}
