use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw record as produced by a provider adapter. Field availability varies
/// wildly between providers, so everything market-related is optional and
/// price is kept as the wire string until normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTokenRecord {
    pub contract_address: String,
    pub chain: String,
    pub name: String,
    pub symbol: String,
    pub price_usd: Option<String>,
    pub liquidity_usd: Option<f64>,
    pub volume_24h_usd: Option<f64>,
    pub volume_change_24h: Option<f64>,
    pub market_cap_usd: Option<f64>,
    pub fdv_usd: Option<f64>,
    pub price_change_24h: Option<f64>,
    pub pair_address: Option<String>,
    pub dex_id: Option<String>,
    pub pair_created_at: Option<DateTime<Utc>>,
    pub last_trade_at: Option<DateTime<Utc>>,
    pub source: String,
}

/// Canonical shape consumed by the ingestor. Produced by
/// `pipeline::normalize`; every numeric field is parsed and present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedToken {
    pub contract_address: String,
    pub chain: String,
    pub name: String,
    pub symbol: String,
    pub price_usd: f64,
    pub liquidity_usd: f64,
    pub volume_24h_usd: f64,
    pub volume_change_24h: f64,
    pub market_cap_usd: f64,
    pub fdv_usd: f64,
    pub price_change_24h: f64,
    pub pair_address: String,
    pub dex_id: String,
    pub pair_created_at: DateTime<Utc>,
    pub source: String,
}

/// Server-side and local filter thresholds. Also the cache key for the
/// fetcher's short-TTL response cache, so equal tuples share one upstream
/// call per scheduling interval.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterThresholds {
    pub min_liquidity_usd: f64,
    pub min_volume_24h_usd: f64,
    pub min_market_cap_usd: f64,
    pub min_age_hours: Option<f64>,
}

impl Default for FilterThresholds {
    fn default() -> Self {
        Self {
            min_liquidity_usd: 10_000.0,
            min_volume_24h_usd: 5_000.0,
            min_market_cap_usd: 50_000.0,
            min_age_hours: None,
        }
    }
}

impl FilterThresholds {
    pub fn cache_key(&self) -> String {
        format!(
            "fetch:{}:{}:{}:{}",
            self.min_liquidity_usd,
            self.min_volume_24h_usd,
            self.min_market_cap_usd,
            self.min_age_hours.unwrap_or(0.0),
        )
    }
}

/// A swap event from the on-chain activity feed. `signature` is globally
/// unique and is the idempotency key preventing duplicate ingestion of the
/// same event across repeated polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapEvent {
    pub wallet_address: String,
    pub amount_usd: f64,
    pub side: TradeSide,
    pub timestamp: DateTime<Utc>,
    pub signature: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "buy"),
            TradeSide::Sell => write!(f, "sell"),
        }
    }
}
