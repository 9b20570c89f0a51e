use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{info, warn};

use super::RecurringJob;
use crate::providers::ProviderError;
use crate::storage::TokenStore;
use crate::types::{SwapEvent, TradeSide};

/// Seam over the on-chain activity provider so the job is testable with
/// scripted swap feeds.
#[async_trait]
pub trait WalletActivitySource: Send + Sync {
    async fn recent_swaps(&self, contract_address: &str) -> Result<Vec<SwapEvent>, ProviderError>;
}

const ONCHAIN_BASE_URL: &str = "https://api.helius.xyz/v0";

/// HTTP-backed activity source. Parses the provider's enhanced
/// transaction payloads defensively; anything without the fields a swap
/// needs is skipped.
pub struct OnchainActivitySource {
    client: Client,
    api_key: String,
}

impl OnchainActivitySource {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
        }
    }

    fn map_swap(event: &Value) -> Option<SwapEvent> {
        let signature = event.get("signature")?.as_str()?.to_string();
        let wallet_address = event.get("feePayer")?.as_str()?.to_string();
        let amount_usd = event
            .get("events")
            .and_then(|e| e.get("swap"))
            .and_then(|s| s.get("amountUsd"))
            .and_then(|v| v.as_f64())
            .or_else(|| event.get("amountUsd").and_then(|v| v.as_f64()))?;
        let side = match event.get("side").and_then(|v| v.as_str()) {
            Some("sell") => TradeSide::Sell,
            _ => TradeSide::Buy,
        };
        let timestamp = event
            .get("timestamp")
            .and_then(|v| v.as_i64())
            .and_then(|secs| DateTime::from_timestamp(secs, 0))?;

        Some(SwapEvent {
            wallet_address,
            amount_usd,
            side,
            timestamp,
            signature,
        })
    }
}

#[async_trait]
impl WalletActivitySource for OnchainActivitySource {
    async fn recent_swaps(&self, contract_address: &str) -> Result<Vec<SwapEvent>, ProviderError> {
        let url = format!(
            "{}/addresses/{}/transactions?api-key={}&type=SWAP",
            ONCHAIN_BASE_URL, contract_address, self.api_key
        );

        let response = self.client.get(&url).send().await?;
        if response.status().as_u16() == 429 {
            return Err(ProviderError::RateLimitExceeded);
        }
        if !response.status().is_success() {
            return Err(ProviderError::ApiError(format!(
                "activity endpoint returned {}",
                response.status()
            )));
        }

        let body: Value = response.json().await?;
        let events = body.as_array().cloned().unwrap_or_default();
        Ok(events.iter().filter_map(Self::map_swap).collect())
    }
}

/// Polls recent swap activity per tracked token, records it idempotently
/// (signature is the unique key) and re-derives smart-wallet scores.
pub struct WalletIntelJob {
    source: Arc<dyn WalletActivitySource>,
    store: Arc<dyn TokenStore>,
    interval: Duration,
}

impl WalletIntelJob {
    pub fn new(
        source: Arc<dyn WalletActivitySource>,
        store: Arc<dyn TokenStore>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            store,
            interval,
        }
    }
}

#[async_trait]
impl RecurringJob for WalletIntelJob {
    fn queue_name(&self) -> &'static str {
        "wallet-intelligence"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run(&self) -> anyhow::Result<()> {
        let since = Utc::now() - ChronoDuration::hours(24);
        let tokens = self.store.tokens_seen_since(since).await?;

        let mut recorded = 0u64;
        let mut wallets_scored = 0usize;
        for token in &tokens {
            let swaps = match self.source.recent_swaps(&token.contract_address).await {
                Ok(swaps) => swaps,
                Err(e) => {
                    warn!("Activity fetch failed for {}: {}", token.symbol, e);
                    continue;
                }
            };
            if swaps.is_empty() {
                continue;
            }

            match self.store.record_swaps(token.id, &swaps).await {
                Ok(inserted) => recorded += inserted,
                Err(e) => {
                    warn!("Swap write failed for {}: {}", token.symbol, e);
                    continue;
                }
            }

            for (wallet, score, trades, last_active) in
                score_wallets(&swaps, token.first_seen_at)
            {
                match self
                    .store
                    .upsert_smart_wallet(&wallet, score, trades, last_active)
                    .await
                {
                    Ok(()) => wallets_scored += 1,
                    Err(e) => warn!("Smart wallet upsert failed for {}: {}", wallet, e),
                }
            }
        }

        info!(
            "Wallet intelligence: {} swaps recorded, {} wallets scored across {} tokens",
            recorded,
            wallets_scored,
            tokens.len()
        );
        Ok(())
    }
}

/// Per-wallet smart score from one token's swap window. Rewards trade
/// size, entry within the first hour of discovery, and realized rotation
/// (sell volume exceeding buy volume). Wallets with a single trade under
/// $500 are not worth tracking and are skipped.
fn score_wallets(
    swaps: &[SwapEvent],
    token_first_seen: DateTime<Utc>,
) -> Vec<(String, f64, i64, DateTime<Utc>)> {
    let mut by_wallet: HashMap<&str, Vec<&SwapEvent>> = HashMap::new();
    for swap in swaps {
        by_wallet.entry(&swap.wallet_address).or_default().push(swap);
    }

    let early_cutoff = token_first_seen + ChronoDuration::hours(1);
    let mut scored = Vec::new();

    for (wallet, trades) in by_wallet {
        let total: f64 = trades.iter().map(|t| t.amount_usd).sum();
        let avg_size = total / trades.len() as f64;
        if trades.len() == 1 && avg_size < 500.0 {
            continue;
        }

        let mut score: f64 = 40.0;
        if avg_size >= 5_000.0 {
            score += 25.0;
        } else if avg_size >= 1_000.0 {
            score += 15.0;
        }

        let first_trade = trades.iter().map(|t| t.timestamp).min();
        if first_trade.is_some_and(|at| at <= early_cutoff) {
            score += 20.0;
        }

        let buys: f64 = trades
            .iter()
            .filter(|t| t.side == TradeSide::Buy)
            .map(|t| t.amount_usd)
            .sum();
        let sells: f64 = trades
            .iter()
            .filter(|t| t.side == TradeSide::Sell)
            .map(|t| t.amount_usd)
            .sum();
        if buys > 0.0 && sells > buys {
            score += 15.0;
        }
        if trades.len() >= 5 {
            score += 10.0;
        }

        let last_active = trades
            .iter()
            .map(|t| t.timestamp)
            .max()
            .unwrap_or(token_first_seen);

        scored.push((
            wallet.to_string(),
            score.clamp(0.0, 100.0),
            trades.len() as i64,
            last_active,
        ));
    }

    scored
}
