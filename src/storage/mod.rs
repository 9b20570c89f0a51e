pub mod models;
pub mod repository;

pub use models::*;
pub use repository::TokenRepository;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::types::{NormalizedToken, SwapEvent};

#[derive(Debug, Clone)]
pub struct PersistOutcome {
    pub token_id: Uuid,
    pub snapshot_inserted: bool,
}

/// Seam between the ingestor and the relational store, so ingestion logic
/// is testable against mock stores.
#[async_trait]
pub trait MarketStore: Send + Sync {
    /// Apply one record atomically: upsert the token by (contract, chain)
    /// and append one market snapshot.
    async fn persist_market_record(
        &self,
        record: &NormalizedToken,
    ) -> Result<PersistOutcome, PipelineError>;
}

/// Read/write surface the background jobs depend on. Keeping jobs behind
/// this trait lets their failure-isolation paths run against mock stores.
#[async_trait]
pub trait TokenStore: MarketStore {
    async fn tokens_seen_since(&self, since: DateTime<Utc>) -> anyhow::Result<Vec<Token>>;

    async fn snapshots_since(
        &self,
        token_id: Uuid,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<MarketSnapshot>>;

    /// Insert swaps keyed by on-chain signature. Re-submitted signatures
    /// are ignored; the return value counts rows actually inserted.
    async fn record_swaps(&self, token_id: Uuid, swaps: &[SwapEvent]) -> anyhow::Result<u64>;

    async fn wallet_transactions_since(
        &self,
        token_id: Uuid,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<WalletTransaction>>;

    async fn upsert_smart_wallet(
        &self,
        wallet_address: &str,
        smart_score: f64,
        total_trades: i64,
        last_active: DateTime<Utc>,
    ) -> anyhow::Result<()>;

    async fn smart_wallet_addresses(&self) -> anyhow::Result<Vec<String>>;

    async fn update_token_scores(
        &self,
        token_id: Uuid,
        momentum_score: f64,
        conviction_score: f64,
        threat_level: &str,
        smart_wallet_flow: f64,
        cluster_detected: bool,
    ) -> anyhow::Result<()>;

    async fn update_ai_summary(&self, token_id: Uuid, summary: &str) -> anyhow::Result<()>;

    /// Overwrite the materialized signal row for the signal's token.
    async fn replace_signal(&self, signal: &Signal) -> anyhow::Result<()>;
}
