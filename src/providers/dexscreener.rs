use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tokio::time::Duration;
use tracing::info;

use super::{ProviderError, TokenProvider};
use crate::types::{FilterThresholds, RawTokenRecord};

const SEARCH_URL: &str = "https://api.dexscreener.com/latest/dex/search";

/// Tertiary provider: free-text pair search, filtered down to the target
/// chain before mapping.
pub struct DexScreenerProvider {
    client: Client,
    chain: String,
    query: String,
}

impl DexScreenerProvider {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            chain: "solana".to_string(),
            query: "SOL".to_string(),
        }
    }

    fn map_pair(&self, pair: &Value) -> Option<RawTokenRecord> {
        let base = pair.get("baseToken")?;
        let address = base.get("address").and_then(|v| v.as_str())?;

        Some(RawTokenRecord {
            contract_address: address.to_string(),
            chain: self.chain.clone(),
            name: base
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown Token")
                .to_string(),
            symbol: base
                .get("symbol")
                .and_then(|v| v.as_str())
                .unwrap_or("UNKNOWN")
                .to_string(),
            price_usd: pair
                .get("priceUsd")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            liquidity_usd: pair
                .get("liquidity")
                .and_then(|l| l.get("usd"))
                .and_then(|v| v.as_f64()),
            volume_24h_usd: pair
                .get("volume")
                .and_then(|v| v.get("h24"))
                .and_then(|v| v.as_f64()),
            volume_change_24h: None,
            market_cap_usd: pair.get("marketCap").and_then(|v| v.as_f64()),
            fdv_usd: pair.get("fdv").and_then(|v| v.as_f64()),
            price_change_24h: pair
                .get("priceChange")
                .and_then(|p| p.get("h24"))
                .and_then(|v| v.as_f64()),
            pair_address: pair
                .get("pairAddress")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            dex_id: pair.get("dexId").and_then(|v| v.as_str()).map(|s| s.to_string()),
            pair_created_at: pair
                .get("pairCreatedAt")
                .and_then(|v| v.as_i64())
                .and_then(|ms| chrono::DateTime::from_timestamp_millis(ms)),
            last_trade_at: None,
            source: "dexscreener".to_string(),
        })
    }
}

#[async_trait]
impl TokenProvider for DexScreenerProvider {
    fn source_name(&self) -> &str {
        "dexscreener"
    }

    async fn fetch_tokens(
        &self,
        thresholds: &FilterThresholds,
    ) -> Result<Vec<RawTokenRecord>, ProviderError> {
        let url = format!("{}?q={}", SEARCH_URL, self.query);

        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .await?;
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimitExceeded);
        }

        let body: Value = response.json().await?;
        let pairs = body
            .get("pairs")
            .and_then(|p| p.as_array())
            .ok_or_else(|| ProviderError::ApiError("Missing pairs array in response".to_string()))?;

        let records: Vec<RawTokenRecord> = pairs
            .iter()
            .filter(|p| {
                p.get("chainId").and_then(|v| v.as_str()) == Some(self.chain.as_str())
            })
            .filter_map(|p| self.map_pair(p))
            .filter(|r| r.liquidity_usd.unwrap_or(0.0) >= thresholds.min_liquidity_usd)
            .collect();

        info!("DexScreener search returned {} pairs on {}", records.len(), self.chain);
        Ok(records)
    }
}
