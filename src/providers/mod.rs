pub mod birdeye;
pub mod dexscreener;
pub mod geckoterminal;
pub mod mock;

pub use birdeye::BirdeyeProvider;
pub use dexscreener::DexScreenerProvider;
pub use geckoterminal::GeckoTerminalProvider;
pub use mock::MockProvider;

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{sleep, Duration, Instant};
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::types::{FilterThresholds, RawTokenRecord};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Rate limit exceeded")]
    RateLimitExceeded,
    #[error("API error: {0}")]
    ApiError(String),
}

impl ProviderError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, ProviderError::RateLimitExceeded)
    }
}

#[async_trait]
pub trait TokenProvider: Send + Sync {
    fn source_name(&self) -> &str;

    /// Fetch candidate tokens mapped into the shared raw-record shape.
    async fn fetch_tokens(
        &self,
        thresholds: &FilterThresholds,
    ) -> Result<Vec<RawTokenRecord>, ProviderError>;

    /// Refresh a single token's market data. Only the primary provider
    /// supports this; the default says so.
    async fn refresh_token(
        &self,
        _contract_address: &str,
    ) -> Result<Option<RawTokenRecord>, ProviderError> {
        Ok(None)
    }
}

/// Shared rate-limit cooldown flag. While tripped, the primary provider is
/// skipped entirely and calls short-circuit to the fallback chain; the
/// snapshot job checks it before every per-token call. Constructed once by
/// the entrypoint and injected, so tests get isolated clocks.
pub struct RateLimitGuard {
    limited_until: RwLock<Option<Instant>>,
    cooldown: Duration,
}

impl RateLimitGuard {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            limited_until: RwLock::new(None),
            cooldown,
        }
    }

    pub async fn is_limited(&self) -> bool {
        let guard = self.limited_until.read().await;
        match *guard {
            Some(until) => Instant::now() < until,
            None => false,
        }
    }

    pub async fn trip(&self) {
        let until = Instant::now() + self.cooldown;
        *self.limited_until.write().await = Some(until);
        warn!("Rate limit tripped; primary provider cooling down for {:?}", self.cooldown);
    }
}

struct CachedFetch {
    at: Instant,
    records: Vec<RawTokenRecord>,
}

pub struct FetcherConfig {
    pub response_cache_ttl: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            response_cache_ttl: Duration::from_secs(30),
        }
    }
}

/// Multi-source fetcher: primary provider under the rate-limit guard, then
/// an ordered fallback chain ending in the static mock dataset so the
/// pipeline never stalls fully.
pub struct MultiSourceFetcher {
    primary: Arc<dyn TokenProvider>,
    fallbacks: Vec<Arc<dyn TokenProvider>>,
    guard: Arc<RateLimitGuard>,
    response_cache: DashMap<String, CachedFetch>,
    response_cache_ttl: Duration,
}

impl MultiSourceFetcher {
    pub fn new(
        primary: Arc<dyn TokenProvider>,
        fallbacks: Vec<Arc<dyn TokenProvider>>,
        guard: Arc<RateLimitGuard>,
        config: FetcherConfig,
    ) -> Self {
        Self {
            primary,
            fallbacks,
            guard,
            response_cache: DashMap::new(),
            response_cache_ttl: config.response_cache_ttl,
        }
    }

    pub fn guard(&self) -> Arc<RateLimitGuard> {
        Arc::clone(&self.guard)
    }

    /// Fetch candidates from the first provider that answers, in declared
    /// order. Successful results are cached keyed by the full filter tuple
    /// so repeat calls within one scheduling interval share one upstream
    /// round trip.
    pub async fn fetch_all(
        &self,
        thresholds: &FilterThresholds,
    ) -> Result<Vec<RawTokenRecord>, PipelineError> {
        let cache_key = thresholds.cache_key();
        if let Some(hit) = self.response_cache.get(&cache_key) {
            if hit.at.elapsed() < self.response_cache_ttl {
                info!("Fetch cache hit ({} records)", hit.records.len());
                return Ok(hit.records.clone());
            }
        }

        if self.guard.is_limited().await {
            info!(
                "Primary provider {} in cooldown, going straight to fallbacks",
                self.primary.source_name()
            );
        } else {
            match self.primary.fetch_tokens(thresholds).await {
                Ok(records) if !records.is_empty() => {
                    self.store(cache_key, &records);
                    return Ok(records);
                }
                Ok(_) => {
                    warn!("Primary provider {} returned no records", self.primary.source_name());
                }
                Err(e) if e.is_rate_limit() => {
                    self.guard.trip().await;
                }
                Err(e) => {
                    warn!("Primary provider {} failed: {}", self.primary.source_name(), e);
                }
            }
        }

        for provider in &self.fallbacks {
            match provider.fetch_tokens(thresholds).await {
                Ok(records) if !records.is_empty() => {
                    info!(
                        "Fallback provider {} supplied {} records",
                        provider.source_name(),
                        records.len()
                    );
                    self.store(cache_key, &records);
                    return Ok(records);
                }
                Ok(_) => {
                    warn!("Fallback provider {} returned no records", provider.source_name());
                }
                Err(e) => {
                    if e.is_rate_limit() {
                        warn!("Fallback provider {} rate limited", provider.source_name());
                    } else {
                        warn!("Fallback provider {} failed: {}", provider.source_name(), e);
                    }
                }
            }
        }

        Err(PipelineError::UpstreamExhausted)
    }

    /// Single-token refresh for the snapshot cycle. Returns `RateLimit`
    /// when the guard is active so the caller can abort the rest of its
    /// cycle instead of burning calls.
    pub async fn refresh_token(
        &self,
        contract_address: &str,
    ) -> Result<Option<RawTokenRecord>, PipelineError> {
        if self.guard.is_limited().await {
            return Err(PipelineError::RateLimit {
                provider: self.primary.source_name().to_string(),
            });
        }
        match self.primary.refresh_token(contract_address).await {
            Ok(record) => Ok(record),
            Err(e) if e.is_rate_limit() => {
                self.guard.trip().await;
                Err(PipelineError::RateLimit {
                    provider: self.primary.source_name().to_string(),
                })
            }
            Err(e) => Err(PipelineError::TransientNetwork(e.to_string())),
        }
    }

    fn store(&self, key: String, records: &[RawTokenRecord]) {
        self.response_cache.insert(
            key,
            CachedFetch {
                at: Instant::now(),
                records: records.to_vec(),
            },
        );
    }
}

/// Capped exponential backoff for transient errors. Rate limits are never
/// retried here; they surface immediately so the cooldown can start.
pub(crate) async fn retry_transient<F, Fut, T>(
    max_attempts: u32,
    mut op: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_rate_limit() => return Err(e),
            Err(e) => {
                attempt += 1;
                if attempt >= max_attempts {
                    return Err(e);
                }
                let base = 250u64 * 2u64.pow(attempt - 1);
                let jitter = rand::random::<u64>() % 100;
                sleep(Duration::from_millis(base + jitter)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedProvider {
        name: &'static str,
        calls: AtomicUsize,
        rate_limited: bool,
        records: Vec<RawTokenRecord>,
    }

    impl ScriptedProvider {
        fn limited(name: &'static str) -> Self {
            Self {
                name,
                calls: AtomicUsize::new(0),
                rate_limited: true,
                records: Vec::new(),
            }
        }

        fn serving(name: &'static str, records: Vec<RawTokenRecord>) -> Self {
            Self {
                name,
                calls: AtomicUsize::new(0),
                rate_limited: false,
                records,
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenProvider for ScriptedProvider {
        fn source_name(&self) -> &str {
            self.name
        }

        async fn fetch_tokens(
            &self,
            _thresholds: &FilterThresholds,
        ) -> Result<Vec<RawTokenRecord>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.rate_limited {
                Err(ProviderError::RateLimitExceeded)
            } else {
                Ok(self.records.clone())
            }
        }
    }

    fn record(contract: &str) -> RawTokenRecord {
        RawTokenRecord {
            contract_address: contract.to_string(),
            chain: "solana".to_string(),
            name: "Test".to_string(),
            symbol: "TST".to_string(),
            price_usd: Some("0.5".to_string()),
            liquidity_usd: Some(100_000.0),
            volume_24h_usd: Some(50_000.0),
            volume_change_24h: Some(0.0),
            market_cap_usd: Some(1_000_000.0),
            fdv_usd: None,
            price_change_24h: Some(0.0),
            pair_address: None,
            dex_id: None,
            pair_created_at: None,
            last_trade_at: None,
            source: "scripted".to_string(),
        }
    }

    fn fetcher_with(
        primary: Arc<ScriptedProvider>,
        fallbacks: Vec<Arc<ScriptedProvider>>,
        cooldown: Duration,
    ) -> MultiSourceFetcher {
        let guard = Arc::new(RateLimitGuard::new(cooldown));
        MultiSourceFetcher::new(
            primary,
            fallbacks.into_iter().map(|f| f as Arc<dyn TokenProvider>).collect(),
            guard,
            FetcherConfig {
                response_cache_ttl: Duration::from_secs(0),
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_primary_is_bypassed_during_cooldown() {
        let primary = Arc::new(ScriptedProvider::limited("primary"));
        let empty_fallback = Arc::new(ScriptedProvider::serving("secondary", Vec::new()));
        let serving_fallback =
            Arc::new(ScriptedProvider::serving("tertiary", vec![record("mint1")]));
        let fetcher = fetcher_with(
            Arc::clone(&primary),
            vec![Arc::clone(&empty_fallback), Arc::clone(&serving_fallback)],
            Duration::from_secs(60),
        );

        let thresholds = FilterThresholds::default();

        // First call trips the cooldown and falls through the chain in order.
        let records = fetcher.fetch_all(&thresholds).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(primary.call_count(), 1);
        assert_eq!(empty_fallback.call_count(), 1);
        assert_eq!(serving_fallback.call_count(), 1);

        // While the cooldown is active the primary is skipped entirely.
        fetcher.fetch_all(&thresholds).await.unwrap();
        assert_eq!(primary.call_count(), 1);
        assert_eq!(serving_fallback.call_count(), 2);

        // The flag clears exactly at its expiry.
        tokio::time::advance(Duration::from_secs(61)).await;
        fetcher.fetch_all(&thresholds).await.unwrap();
        assert_eq!(primary.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn all_providers_failing_surfaces_upstream_exhausted() {
        let primary = Arc::new(ScriptedProvider::limited("primary"));
        let fallback = Arc::new(ScriptedProvider::serving("secondary", Vec::new()));
        let fetcher = fetcher_with(
            Arc::clone(&primary),
            vec![fallback],
            Duration::from_secs(60),
        );

        let err = fetcher.fetch_all(&FilterThresholds::default()).await.unwrap_err();
        assert!(matches!(err, PipelineError::UpstreamExhausted));
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_short_circuits_while_limited() {
        let primary = Arc::new(ScriptedProvider::serving("primary", Vec::new()));
        let fetcher = fetcher_with(Arc::clone(&primary), vec![], Duration::from_secs(60));
        fetcher.guard().trip().await;

        let err = fetcher.refresh_token("mint1").await.unwrap_err();
        assert!(matches!(err, PipelineError::RateLimit { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn successful_fetch_is_served_from_response_cache() {
        let primary = Arc::new(ScriptedProvider::serving("primary", vec![record("mint1")]));
        let guard = Arc::new(RateLimitGuard::new(Duration::from_secs(60)));
        let fetcher = MultiSourceFetcher::new(
            Arc::clone(&primary) as Arc<dyn TokenProvider>,
            vec![],
            guard,
            FetcherConfig {
                response_cache_ttl: Duration::from_secs(30),
            },
        );

        let thresholds = FilterThresholds::default();
        fetcher.fetch_all(&thresholds).await.unwrap();
        fetcher.fetch_all(&thresholds).await.unwrap();
        assert_eq!(primary.call_count(), 1);

        tokio::time::advance(Duration::from_secs(31)).await;
        fetcher.fetch_all(&thresholds).await.unwrap();
        assert_eq!(primary.call_count(), 2);
    }
}
