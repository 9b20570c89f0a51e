use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tokio::time::Duration;
use tracing::info;

use super::{ProviderError, TokenProvider};
use crate::types::{FilterThresholds, RawTokenRecord};

const POOLS_URL: &str = "https://api.geckoterminal.com/api/v2/networks/solana/pools?page=1";

/// Secondary provider: broad top-pool query, no server-side thresholds.
/// Below-threshold pools are discarded locally so downstream sees the same
/// contract as the primary.
pub struct GeckoTerminalProvider {
    client: Client,
}

impl GeckoTerminalProvider {
    pub fn new() -> Self {
        Self { client: Client::new() }
    }

    fn map_pool(pool: &Value) -> Option<RawTokenRecord> {
        let attributes = pool.get("attributes")?;

        // base_token id looks like "solana_<mint>"
        let base_token_id = pool
            .get("relationships")
            .and_then(|r| r.get("base_token"))
            .and_then(|b| b.get("data"))
            .and_then(|d| d.get("id"))
            .and_then(|v| v.as_str())?;
        let contract_address = base_token_id.split_once('_').map(|(_, mint)| mint)?;

        let name = attributes
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown Pool");
        let symbol = name.split('/').next().unwrap_or("UNKNOWN").trim();

        Some(RawTokenRecord {
            contract_address: contract_address.to_string(),
            chain: "solana".to_string(),
            name: name.to_string(),
            symbol: symbol.to_string(),
            price_usd: attributes
                .get("base_token_price_usd")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            liquidity_usd: parse_numeric(attributes.get("reserve_in_usd")),
            volume_24h_usd: parse_numeric(
                attributes.get("volume_usd").and_then(|v| v.get("h24")),
            ),
            volume_change_24h: None,
            market_cap_usd: parse_numeric(attributes.get("market_cap_usd")),
            fdv_usd: parse_numeric(attributes.get("fdv_usd")),
            price_change_24h: parse_numeric(
                attributes
                    .get("price_change_percentage")
                    .and_then(|v| v.get("h24")),
            ),
            pair_address: attributes
                .get("address")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            dex_id: pool
                .get("relationships")
                .and_then(|r| r.get("dex"))
                .and_then(|d| d.get("data"))
                .and_then(|d| d.get("id"))
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            pair_created_at: attributes
                .get("pool_created_at")
                .and_then(|v| v.as_str())
                .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&chrono::Utc)),
            last_trade_at: None,
            source: "geckoterminal".to_string(),
        })
    }
}

#[async_trait]
impl TokenProvider for GeckoTerminalProvider {
    fn source_name(&self) -> &str {
        "geckoterminal"
    }

    async fn fetch_tokens(
        &self,
        thresholds: &FilterThresholds,
    ) -> Result<Vec<RawTokenRecord>, ProviderError> {
        let response = self
            .client
            .get(POOLS_URL)
            .timeout(Duration::from_secs(10))
            .header("Accept", "application/json")
            .send()
            .await?;
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimitExceeded);
        }

        let body: Value = response.json().await?;
        let pools = body
            .get("data")
            .and_then(|d| d.as_array())
            .ok_or_else(|| ProviderError::ApiError("Missing data array in response".to_string()))?;

        let records: Vec<RawTokenRecord> = pools
            .iter()
            .filter_map(Self::map_pool)
            .filter(|r| r.liquidity_usd.unwrap_or(0.0) >= thresholds.min_liquidity_usd)
            .collect();

        info!("GeckoTerminal fetched {} pools", records.len());
        Ok(records)
    }
}

fn parse_numeric(value: Option<&Value>) -> Option<f64> {
    match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
}
