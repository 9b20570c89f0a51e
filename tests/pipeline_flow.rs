use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Duration;
use uuid::Uuid;

use edgescan_backend::error::PipelineError;
use edgescan_backend::jobs::{RecurringJob, ScanJob, WalletActivitySource, WalletIntelJob};
use edgescan_backend::pipeline::{filter, normalize, Ingestor};
use edgescan_backend::providers::{
    FetcherConfig, MultiSourceFetcher, ProviderError, RateLimitGuard, TokenProvider,
};
use edgescan_backend::storage::{
    MarketSnapshot, MarketStore, PersistOutcome, Signal, Token, TokenStore, WalletTransaction,
};
use edgescan_backend::types::{
    FilterThresholds, NormalizedToken, RawTokenRecord, SwapEvent, TradeSide,
};

/// In-memory stand-in for the relational store, keyed the same way the
/// real one is: (contract, chain) identifies a token, every persist
/// appends one snapshot.
#[derive(Default)]
struct MemoryStore {
    tokens: Mutex<HashMap<(String, String), Uuid>>,
    snapshots: Mutex<Vec<NormalizedToken>>,
    tracked: Mutex<Vec<Token>>,
    swap_signatures: Mutex<HashSet<String>>,
}

#[async_trait]
impl MarketStore for MemoryStore {
    async fn persist_market_record(
        &self,
        record: &NormalizedToken,
    ) -> Result<PersistOutcome, PipelineError> {
        let key = (record.contract_address.clone(), record.chain.clone());
        let token_id = *self
            .tokens
            .lock()
            .await
            .entry(key)
            .or_insert_with(Uuid::new_v4);
        self.snapshots.lock().await.push(record.clone());
        Ok(PersistOutcome {
            token_id,
            snapshot_inserted: true,
        })
    }
}

struct FixedProvider {
    records: Vec<RawTokenRecord>,
}

#[async_trait]
impl TokenProvider for FixedProvider {
    fn source_name(&self) -> &str {
        "fixed"
    }

    async fn fetch_tokens(
        &self,
        _thresholds: &FilterThresholds,
    ) -> Result<Vec<RawTokenRecord>, ProviderError> {
        Ok(self.records.clone())
    }
}

fn record(contract: &str, liquidity: f64, volume: f64, mcap: f64) -> RawTokenRecord {
    RawTokenRecord {
        contract_address: contract.to_string(),
        chain: "solana".to_string(),
        name: contract.to_string(),
        symbol: contract.to_uppercase(),
        price_usd: Some("0.0042".to_string()),
        liquidity_usd: Some(liquidity),
        volume_24h_usd: Some(volume),
        volume_change_24h: Some(3.0),
        market_cap_usd: Some(mcap),
        fdv_usd: None,
        price_change_24h: Some(8.0),
        pair_address: Some(format!("pair-{}", contract)),
        dex_id: Some("raydium".to_string()),
        pair_created_at: Some(chrono::Utc::now()),
        last_trade_at: None,
        source: "fixed".to_string(),
    }
}

fn fetcher(records: Vec<RawTokenRecord>) -> Arc<MultiSourceFetcher> {
    Arc::new(MultiSourceFetcher::new(
        Arc::new(FixedProvider { records }),
        vec![],
        Arc::new(RateLimitGuard::new(Duration::from_secs(60))),
        FetcherConfig {
            response_cache_ttl: Duration::from_secs(0),
        },
    ))
}

#[tokio::test]
async fn fetch_filter_normalize_ingest_round_trip() {
    // Two records pass the default thresholds, one is under-capitalized.
    let records = vec![
        record("mint1", 50_000.0, 25_000.0, 400_000.0),
        record("mint2", 120_000.0, 80_000.0, 900_000.0),
        record("dust", 500.0, 100.0, 2_000.0),
    ];

    let thresholds = FilterThresholds::default();
    let raw = fetcher(records).fetch_all(&thresholds).await.unwrap();
    assert_eq!(raw.len(), 3);

    let normalized = normalize(filter(raw, &thresholds));
    assert_eq!(normalized.len(), 2);

    let store = Arc::new(MemoryStore::default());
    let ingestor = Ingestor::new(Arc::clone(&store) as Arc<dyn MarketStore>, 10);
    let report = ingestor.ingest(&normalized).await;

    assert_eq!(report.upserted, 2);
    assert_eq!(report.snapshots, 2);
    assert!(!report.aborted);
    assert_eq!(store.tokens.lock().await.len(), 2);
}

#[tokio::test]
async fn repeat_scans_upsert_without_duplicating_tokens() {
    let records = vec![record("mint1", 50_000.0, 25_000.0, 400_000.0)];
    let fetcher = fetcher(records);
    let store = Arc::new(MemoryStore::default());
    let ingestor = Arc::new(Ingestor::new(
        Arc::clone(&store) as Arc<dyn MarketStore>,
        10,
    ));

    let scan = ScanJob::new(
        fetcher,
        ingestor,
        FilterThresholds::default(),
        Duration::from_secs(60),
    );

    scan.run().await.unwrap();
    scan.run().await.unwrap();

    // Same identity twice: one token, two appended snapshots.
    assert_eq!(store.tokens.lock().await.len(), 1);
    assert_eq!(store.snapshots.lock().await.len(), 2);
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn tokens_seen_since(&self, _since: DateTime<Utc>) -> anyhow::Result<Vec<Token>> {
        Ok(self.tracked.lock().await.clone())
    }

    async fn snapshots_since(
        &self,
        _token_id: Uuid,
        _since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<MarketSnapshot>> {
        Ok(Vec::new())
    }

    async fn record_swaps(&self, _token_id: Uuid, swaps: &[SwapEvent]) -> anyhow::Result<u64> {
        let mut seen = self.swap_signatures.lock().await;
        let inserted = swaps
            .iter()
            .filter(|swap| seen.insert(swap.signature.clone()))
            .count();
        Ok(inserted as u64)
    }

    async fn wallet_transactions_since(
        &self,
        _token_id: Uuid,
        _since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<WalletTransaction>> {
        Ok(Vec::new())
    }

    async fn upsert_smart_wallet(
        &self,
        _wallet_address: &str,
        _smart_score: f64,
        _total_trades: i64,
        _last_active: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn smart_wallet_addresses(&self) -> anyhow::Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn update_token_scores(
        &self,
        _token_id: Uuid,
        _momentum_score: f64,
        _conviction_score: f64,
        _threat_level: &str,
        _smart_wallet_flow: f64,
        _cluster_detected: bool,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn update_ai_summary(&self, _token_id: Uuid, _summary: &str) -> anyhow::Result<()> {
        Ok(())
    }

    async fn replace_signal(&self, _signal: &Signal) -> anyhow::Result<()> {
        Ok(())
    }
}

fn tracked_token(contract: &str) -> Token {
    let now = Utc::now();
    Token {
        id: Uuid::new_v4(),
        contract_address: contract.to_string(),
        chain: "solana".to_string(),
        name: contract.to_string(),
        symbol: contract.to_uppercase(),
        price_usd: 0.0042,
        liquidity_usd: 50_000.0,
        volume_24h_usd: 25_000.0,
        market_cap_usd: 400_000.0,
        pair_address: format!("pair-{}", contract),
        dex_id: "raydium".to_string(),
        first_seen_at: now,
        last_seen_at: now,
        last_ingested_at: now,
        momentum_score: None,
        conviction_score: None,
        threat_level: None,
        smart_wallet_flow: None,
        cluster_detected: None,
        ai_summary: None,
        mint_authority_active: None,
        freeze_authority_active: None,
        top10_holder_pct: None,
        liquidity_locked: None,
        ownership_renounced: None,
    }
}

/// Replays the same two swaps on every poll, the way an activity API
/// window overlaps between runs.
struct ReplayedActivity;

#[async_trait]
impl WalletActivitySource for ReplayedActivity {
    async fn recent_swaps(
        &self,
        _contract_address: &str,
    ) -> Result<Vec<SwapEvent>, ProviderError> {
        Ok(vec![
            SwapEvent {
                wallet_address: "whale".to_string(),
                amount_usd: 6_000.0,
                side: TradeSide::Buy,
                timestamp: Utc::now(),
                signature: "sig-1".to_string(),
            },
            SwapEvent {
                wallet_address: "whale".to_string(),
                amount_usd: 2_500.0,
                side: TradeSide::Sell,
                timestamp: Utc::now(),
                signature: "sig-2".to_string(),
            },
        ])
    }
}

#[tokio::test]
async fn repeated_swap_polls_insert_each_signature_once() {
    let store = Arc::new(MemoryStore::default());
    store.tracked.lock().await.push(tracked_token("mint1"));

    let job = WalletIntelJob::new(
        Arc::new(ReplayedActivity),
        Arc::clone(&store) as Arc<dyn TokenStore>,
        Duration::from_secs(300),
    );

    job.run().await.unwrap();
    job.run().await.unwrap();

    // The second poll replays both signatures and inserts nothing new.
    assert_eq!(store.swap_signatures.lock().await.len(), 2);

    let replayed = ReplayedActivity.recent_swaps("mint1").await.unwrap();
    let token_id = store.tracked.lock().await[0].id;
    assert_eq!(store.record_swaps(token_id, &replayed).await.unwrap(), 0);
}
