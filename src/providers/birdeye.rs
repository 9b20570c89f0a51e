use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use super::{retry_transient, ProviderError, RateLimitGuard, TokenProvider};
use crate::types::{FilterThresholds, RawTokenRecord};

const BASE_URL: &str = "https://public-api.birdeye.so";
const PAGE_SIZE: usize = 50;
const MAX_PAGES: usize = 4;
const MAX_CONSECUTIVE_ERRORS: u32 = 3;

/// Primary provider: paginated token list with server-side filters.
/// Pagination is sequential with an explicit inter-request pause to respect
/// a shared external rate limit; hitting a 429 (or a body-level limit
/// message) trips the shared guard.
pub struct BirdeyeProvider {
    client: Client,
    api_key: Option<String>,
    guard: Arc<RateLimitGuard>,
    throttle: Duration,
    chain: String,
}

impl BirdeyeProvider {
    pub fn new(api_key: Option<String>, guard: Arc<RateLimitGuard>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            guard,
            throttle: Duration::from_millis(500),
            chain: "solana".to_string(),
        }
    }

    async fn fetch_page(
        &self,
        thresholds: &FilterThresholds,
        offset: usize,
    ) -> Result<Vec<RawTokenRecord>, ProviderError> {
        let url = format!(
            "{}/defi/tokenlist?sort_by=v24hUSD&sort_type=desc&offset={}&limit={}&min_liquidity={}",
            BASE_URL, offset, PAGE_SIZE, thresholds.min_liquidity_usd
        );

        let mut request = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(10))
            .header("x-chain", &self.chain);
        if let Some(key) = &self.api_key {
            request = request.header("X-API-KEY", key);
        }

        let response = request.send().await?;
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimitExceeded);
        }

        let body: Value = response.json().await?;
        if let Some(message) = body.get("message").and_then(|v| v.as_str()) {
            if message.to_lowercase().contains("limit exceeded") {
                return Err(ProviderError::RateLimitExceeded);
            }
        }

        let tokens = body
            .get("data")
            .and_then(|d| d.get("tokens"))
            .and_then(|t| t.as_array())
            .ok_or_else(|| ProviderError::ApiError("Missing data.tokens in response".to_string()))?;

        Ok(tokens.iter().filter_map(|t| self.map_token(t)).collect())
    }

    fn map_token(&self, token: &Value) -> Option<RawTokenRecord> {
        let address = token.get("address").and_then(|v| v.as_str())?;
        Some(RawTokenRecord {
            contract_address: address.to_string(),
            chain: self.chain.clone(),
            name: token
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown Token")
                .to_string(),
            symbol: token
                .get("symbol")
                .and_then(|v| v.as_str())
                .unwrap_or("UNKNOWN")
                .to_string(),
            price_usd: token.get("price").and_then(|v| v.as_f64()).map(|p| p.to_string()),
            liquidity_usd: token.get("liquidity").and_then(|v| v.as_f64()),
            volume_24h_usd: token.get("v24hUSD").and_then(|v| v.as_f64()),
            volume_change_24h: token.get("v24hChangePercent").and_then(|v| v.as_f64()),
            market_cap_usd: token.get("mc").and_then(|v| v.as_f64()),
            fdv_usd: token.get("fdv").and_then(|v| v.as_f64()),
            price_change_24h: token.get("priceChange24hPercent").and_then(|v| v.as_f64()),
            pair_address: None,
            dex_id: None,
            pair_created_at: None,
            last_trade_at: token
                .get("lastTradeUnixTime")
                .and_then(|v| v.as_i64())
                .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0)),
            source: "birdeye".to_string(),
        })
    }
}

#[async_trait]
impl TokenProvider for BirdeyeProvider {
    fn source_name(&self) -> &str {
        "birdeye"
    }

    async fn fetch_tokens(
        &self,
        thresholds: &FilterThresholds,
    ) -> Result<Vec<RawTokenRecord>, ProviderError> {
        let mut all_records = Vec::new();
        let mut consecutive_errors = 0u32;

        for page in 0..MAX_PAGES {
            if page > 0 {
                sleep(self.throttle).await;
            }

            let offset = page * PAGE_SIZE;
            match retry_transient(3, || self.fetch_page(thresholds, offset)).await {
                Ok(records) => {
                    consecutive_errors = 0;
                    let count = records.len();
                    all_records.extend(records);
                    if count < PAGE_SIZE {
                        break;
                    }
                }
                Err(ProviderError::RateLimitExceeded) => {
                    self.guard.trip().await;
                    if all_records.is_empty() {
                        return Err(ProviderError::RateLimitExceeded);
                    }
                    // Keep the pages fetched before the limit hit.
                    warn!("Rate limited mid-pagination, keeping {} records", all_records.len());
                    break;
                }
                Err(e) => {
                    consecutive_errors += 1;
                    warn!("Birdeye page {} failed: {}", page, e);
                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        if all_records.is_empty() {
                            return Err(e);
                        }
                        break;
                    }
                }
            }
        }

        info!("Birdeye fetched {} tokens", all_records.len());
        Ok(all_records)
    }

    async fn refresh_token(
        &self,
        contract_address: &str,
    ) -> Result<Option<RawTokenRecord>, ProviderError> {
        let url = format!("{}/defi/token_overview?address={}", BASE_URL, contract_address);

        let mut request = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(10))
            .header("x-chain", &self.chain);
        if let Some(key) = &self.api_key {
            request = request.header("X-API-KEY", key);
        }

        let response = request.send().await?;
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimitExceeded);
        }

        let body: Value = response.json().await?;
        let data = match body.get("data") {
            Some(d) if !d.is_null() => d.clone(),
            _ => return Ok(None),
        };

        let mut record = match self.map_token(&data) {
            Some(r) => r,
            None => return Ok(None),
        };
        record.contract_address = contract_address.to_string();
        Ok(Some(record))
    }
}
