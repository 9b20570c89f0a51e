//! In-memory store and fixtures shared by the job tests.

use std::collections::HashSet;
use std::sync::Mutex;

use anyhow::bail;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::storage::{
    MarketSnapshot, MarketStore, PersistOutcome, Signal, Token, TokenStore, WalletTransaction,
};
use crate::types::{NormalizedToken, SwapEvent};

pub(crate) fn sample_token(symbol: &str) -> Token {
    let now = Utc::now();
    Token {
        id: Uuid::new_v4(),
        contract_address: format!("{}mint", symbol.to_lowercase()),
        chain: "solana".to_string(),
        name: symbol.to_string(),
        symbol: symbol.to_string(),
        price_usd: 1.0,
        liquidity_usd: 120_000.0,
        volume_24h_usd: 80_000.0,
        market_cap_usd: 900_000.0,
        pair_address: "pair".to_string(),
        dex_id: "raydium".to_string(),
        first_seen_at: now,
        last_seen_at: now,
        last_ingested_at: now,
        momentum_score: Some(55.0),
        conviction_score: Some(60.0),
        threat_level: Some("GREEN".to_string()),
        smart_wallet_flow: Some(10.0),
        cluster_detected: Some(false),
        ai_summary: None,
        mint_authority_active: Some(false),
        freeze_authority_active: Some(false),
        top10_holder_pct: Some(20.0),
        liquidity_locked: Some(true),
        ownership_renounced: Some(true),
    }
}

/// TokenStore double that records every write and can be told to reject
/// writes for a specific token, so per-record isolation is observable.
pub(crate) struct RecordingStore {
    pub tokens: Vec<Token>,
    pub fail_replace_signal_for: Option<Uuid>,
    pub fail_record_swaps_for: Option<Uuid>,
    pub fail_summary_for: Option<Uuid>,
    pub signals: Mutex<Vec<Uuid>>,
    pub score_updates: Mutex<Vec<Uuid>>,
    pub swap_signatures: Mutex<HashSet<String>>,
    pub wallets: Mutex<Vec<(String, f64)>>,
    pub summaries: Mutex<Vec<(Uuid, String)>>,
}

impl RecordingStore {
    pub(crate) fn with_tokens(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            fail_replace_signal_for: None,
            fail_record_swaps_for: None,
            fail_summary_for: None,
            signals: Mutex::new(Vec::new()),
            score_updates: Mutex::new(Vec::new()),
            swap_signatures: Mutex::new(HashSet::new()),
            wallets: Mutex::new(Vec::new()),
            summaries: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MarketStore for RecordingStore {
    async fn persist_market_record(
        &self,
        record: &NormalizedToken,
    ) -> Result<PersistOutcome, PipelineError> {
        Err(PipelineError::Persistence(format!(
            "no market writes expected for {}",
            record.symbol
        )))
    }
}

#[async_trait]
impl TokenStore for RecordingStore {
    async fn tokens_seen_since(&self, _since: DateTime<Utc>) -> anyhow::Result<Vec<Token>> {
        Ok(self.tokens.clone())
    }

    async fn snapshots_since(
        &self,
        _token_id: Uuid,
        _since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<MarketSnapshot>> {
        Ok(Vec::new())
    }

    async fn record_swaps(&self, token_id: Uuid, swaps: &[SwapEvent]) -> anyhow::Result<u64> {
        if self.fail_record_swaps_for == Some(token_id) {
            bail!("swap write rejected");
        }
        let mut seen = self.swap_signatures.lock().unwrap();
        let mut inserted = 0;
        for swap in swaps {
            if seen.insert(swap.signature.clone()) {
                inserted += 1;
            }
        }
        Ok(inserted)
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
        wallet_address: &str,
        smart_score: f64,
        _total_trades: i64,
        _last_active: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        self.wallets
            .lock()
            .unwrap()
            .push((wallet_address.to_string(), smart_score));
        Ok(())
    }

    async fn smart_wallet_addresses(&self) -> anyhow::Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn update_token_scores(
        &self,
        token_id: Uuid,
        _momentum_score: f64,
        _conviction_score: f64,
        _threat_level: &str,
        _smart_wallet_flow: f64,
        _cluster_detected: bool,
    ) -> anyhow::Result<()> {
        self.score_updates.lock().unwrap().push(token_id);
        Ok(())
    }

    async fn update_ai_summary(&self, token_id: Uuid, summary: &str) -> anyhow::Result<()> {
        if self.fail_summary_for == Some(token_id) {
            bail!("summary write rejected");
        }
        self.summaries
            .lock()
            .unwrap()
            .push((token_id, summary.to_string()));
        Ok(())
    }

    async fn replace_signal(&self, signal: &Signal) -> anyhow::Result<()> {
        if self.fail_replace_signal_for == Some(signal.token_id) {
            bail!("signal write rejected");
        }
        self.signals.lock().unwrap().push(signal.token_id);
        Ok(())
    }
}
