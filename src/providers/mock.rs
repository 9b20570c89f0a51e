use async_trait::async_trait;
use once_cell::sync::Lazy;
use tracing::warn;

use super::{ProviderError, TokenProvider};
use crate::types::{FilterThresholds, RawTokenRecord};

/// Last link in the fallback chain: a static dataset that guarantees the
/// pipeline never stalls fully, at the cost of freshness.
pub struct MockProvider;

static MOCK_TOKENS: Lazy<Vec<RawTokenRecord>> = Lazy::new(|| {
    vec![
        mock_record(
            "So11111111111111111111111111111111111111112",
            "Wrapped SOL",
            "SOL",
            "150.0",
            5_000_000.0,
            12_000_000.0,
            70_000_000_000.0,
            1.2,
        ),
        mock_record(
            "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
            "USD Coin",
            "USDC",
            "1.0",
            8_000_000.0,
            20_000_000.0,
            32_000_000_000.0,
            0.0,
        ),
        mock_record(
            "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263",
            "Bonk",
            "BONK",
            "0.000021",
            900_000.0,
            3_500_000.0,
            1_400_000_000.0,
            4.8,
        ),
        mock_record(
            "JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN",
            "Jupiter",
            "JUP",
            "0.82",
            2_400_000.0,
            6_100_000.0,
            1_100_000_000.0,
            -2.3,
        ),
    ]
});

fn mock_record(
    contract: &str,
    name: &str,
    symbol: &str,
    price: &str,
    liquidity: f64,
    volume: f64,
    market_cap: f64,
    price_change: f64,
) -> RawTokenRecord {
    RawTokenRecord {
        contract_address: contract.to_string(),
        chain: "solana".to_string(),
        name: name.to_string(),
        symbol: symbol.to_string(),
        price_usd: Some(price.to_string()),
        liquidity_usd: Some(liquidity),
        volume_24h_usd: Some(volume),
        volume_change_24h: Some(0.0),
        market_cap_usd: Some(market_cap),
        fdv_usd: Some(market_cap),
        price_change_24h: Some(price_change),
        pair_address: None,
        dex_id: Some("raydium".to_string()),
        pair_created_at: None,
        last_trade_at: Some(chrono::Utc::now()),
        source: "mock".to_string(),
    }
}

#[async_trait]
impl TokenProvider for MockProvider {
    fn source_name(&self) -> &str {
        "mock"
    }

    async fn fetch_tokens(
        &self,
        thresholds: &FilterThresholds,
    ) -> Result<Vec<RawTokenRecord>, ProviderError> {
        warn!("All live providers unavailable, serving static mock dataset");
        Ok(MOCK_TOKENS
            .iter()
            .filter(|r| r.liquidity_usd.unwrap_or(0.0) >= thresholds.min_liquidity_usd)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_dataset_respects_thresholds() {
        let provider = MockProvider;
        let mut thresholds = FilterThresholds::default();
        thresholds.min_liquidity_usd = 1_000_000.0;

        let records = provider.fetch_tokens(&thresholds).await.unwrap();
        assert!(!records.is_empty());
        assert!(records.iter().all(|r| r.liquidity_usd.unwrap() >= 1_000_000.0));
    }
}
