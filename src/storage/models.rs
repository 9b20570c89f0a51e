use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A discovered token. Unique by (contract_address, chain); created on
/// first successful ingestion, metrics refreshed by later ingestions,
/// derived scores overwritten by the scoring job. Never hard-deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Token {
    pub id: Uuid,
    pub contract_address: String,
    pub chain: String,
    pub name: String,
    pub symbol: String,
    pub price_usd: f64,
    pub liquidity_usd: f64,
    pub volume_24h_usd: f64,
    pub market_cap_usd: f64,
    pub pair_address: String,
    pub dex_id: String,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub last_ingested_at: DateTime<Utc>,
    // Derived scores, written only by the scoring job.
    pub momentum_score: Option<f64>,
    pub conviction_score: Option<f64>,
    pub threat_level: Option<String>,
    pub smart_wallet_flow: Option<f64>,
    pub cluster_detected: Option<bool>,
    pub ai_summary: Option<String>,
    // On-chain security facts; NULL means unknown and is scored as such.
    pub mint_authority_active: Option<bool>,
    pub freeze_authority_active: Option<bool>,
    pub top10_holder_pct: Option<f64>,
    pub liquidity_locked: Option<bool>,
    pub ownership_renounced: Option<bool>,
}

/// Immutable point-in-time market record, append-only, owned by a Token.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MarketSnapshot {
    pub id: Uuid,
    pub token_id: Uuid,
    pub price_usd: f64,
    pub liquidity_usd: f64,
    pub volume_24h_usd: f64,
    pub market_cap_usd: f64,
    pub fdv_usd: f64,
    pub price_change_24h: f64,
    pub timestamp: DateTime<Utc>,
}

/// A recorded swap. `signature` is globally unique, so re-submitting the
/// same on-chain event across polls inserts at most one row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WalletTransaction {
    pub id: Uuid,
    pub token_id: Uuid,
    pub wallet_address: String,
    pub amount_usd: f64,
    pub side: String,
    pub timestamp: DateTime<Utc>,
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SmartWallet {
    pub wallet_address: String,
    pub smart_score: f64,
    pub total_trades: i64,
    pub last_active: DateTime<Utc>,
}

/// Denormalized read-optimized view, one-to-one with Token, fully
/// overwritten each scoring cycle.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Signal {
    pub token_id: Uuid,
    pub conviction_score: f64,
    pub momentum_phase: String,
    pub threat_level: String,
    pub edge_verdict: String,
    pub confidence: f64,
    pub updated_at: DateTime<Utc>,
}
