use crate::types::FilterThresholds;

/// Process configuration, assembled once by the entrypoint and injected
/// into consumers so tests can instantiate isolated components.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub redis_url: String,
    pub birdeye_api_key: Option<String>,
    /// On-chain activity provider key; wallet-intelligence runs only when set.
    pub onchain_api_key: Option<String>,
    /// AI provider key; the interpretation queue registers only when set.
    pub ai_api_key: Option<String>,
    pub ingestion_interval_secs: u64,
    pub snapshot_interval_secs: u64,
    pub scoring_interval_secs: u64,
    pub wallet_intel_interval_secs: u64,
    pub interpretation_interval_secs: u64,
    /// Max processing time per job run before the queue counts it failed.
    pub job_lock_secs: u64,
    pub ingest_batch_size: usize,
    pub thresholds: FilterThresholds,
    pub http_bind: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/edgescan".to_string(),
            redis_url: "redis://127.0.0.1/".to_string(),
            birdeye_api_key: None,
            onchain_api_key: None,
            ai_api_key: None,
            ingestion_interval_secs: 60,
            snapshot_interval_secs: 300,
            scoring_interval_secs: 600,
            wallet_intel_interval_secs: 300,
            interpretation_interval_secs: 900,
            job_lock_secs: 120,
            ingest_batch_size: 10,
            thresholds: FilterThresholds::default(),
            http_bind: "0.0.0.0:3000".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            database_url: env_or("DATABASE_URL", &defaults.database_url),
            redis_url: env_or("REDIS_URL", &defaults.redis_url),
            birdeye_api_key: std::env::var("BIRDEYE_API_KEY").ok().filter(|k| !k.is_empty()),
            onchain_api_key: std::env::var("HELIUS_API_KEY").ok().filter(|k| !k.is_empty()),
            ai_api_key: std::env::var("AI_API_KEY").ok().filter(|k| !k.is_empty()),
            ingestion_interval_secs: env_parse("INGESTION_INTERVAL_SECS", defaults.ingestion_interval_secs),
            snapshot_interval_secs: env_parse("SNAPSHOT_INTERVAL_SECS", defaults.snapshot_interval_secs),
            scoring_interval_secs: env_parse("SCORING_INTERVAL_SECS", defaults.scoring_interval_secs),
            wallet_intel_interval_secs: env_parse("WALLET_INTEL_INTERVAL_SECS", defaults.wallet_intel_interval_secs),
            interpretation_interval_secs: env_parse("INTERPRETATION_INTERVAL_SECS", defaults.interpretation_interval_secs),
            job_lock_secs: env_parse("JOB_LOCK_SECS", defaults.job_lock_secs),
            ingest_batch_size: env_parse("INGEST_BATCH_SIZE", defaults.ingest_batch_size),
            thresholds: FilterThresholds {
                min_liquidity_usd: env_parse("MIN_LIQUIDITY_USD", defaults.thresholds.min_liquidity_usd),
                min_volume_24h_usd: env_parse("MIN_VOLUME_24H_USD", defaults.thresholds.min_volume_24h_usd),
                min_market_cap_usd: env_parse("MIN_MARKET_CAP_USD", defaults.thresholds.min_market_cap_usd),
                min_age_hours: std::env::var("MIN_AGE_HOURS").ok().and_then(|v| v.parse().ok()),
            },
            http_bind: env_or("HTTP_BIND", &defaults.http_bind),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
