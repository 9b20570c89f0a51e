use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use super::models::*;
use super::{MarketStore, PersistOutcome, TokenStore};
use crate::error::PipelineError;
use crate::types::{NormalizedToken, SwapEvent};

pub struct TokenRepository {
    pool: PgPool,
}

impl TokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn token_count(&self) -> anyhow::Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM tokens")
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get::<i64, _>("count"))
    }
}

#[async_trait]
impl TokenStore for TokenRepository {
    async fn tokens_seen_since(&self, since: DateTime<Utc>) -> anyhow::Result<Vec<Token>> {
        let tokens = sqlx::query_as::<_, Token>(
            r#"
            SELECT * FROM tokens
            WHERE last_seen_at >= $1
            ORDER BY last_seen_at DESC
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(tokens)
    }

    async fn snapshots_since(
        &self,
        token_id: Uuid,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<MarketSnapshot>> {
        let snapshots = sqlx::query_as::<_, MarketSnapshot>(
            r#"
            SELECT * FROM market_snapshots
            WHERE token_id = $1 AND timestamp >= $2
            ORDER BY timestamp ASC
            "#,
        )
        .bind(token_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(snapshots)
    }

    /// Insert swap events idempotently: signature is the unique key, so a
    /// re-poll of the same window inserts nothing new.
    async fn record_swaps(&self, token_id: Uuid, swaps: &[SwapEvent]) -> anyhow::Result<u64> {
        let mut inserted = 0;
        for swap in swaps {
            let result = sqlx::query(
                r#"
                INSERT INTO wallet_transactions (id, token_id, wallet_address, amount_usd, side, timestamp, signature)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (signature) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(token_id)
            .bind(&swap.wallet_address)
            .bind(swap.amount_usd)
            .bind(swap.side.to_string())
            .bind(swap.timestamp)
            .bind(&swap.signature)
            .execute(&self.pool)
            .await?;
            inserted += result.rows_affected();
        }
        Ok(inserted)
    }

    async fn wallet_transactions_since(
        &self,
        token_id: Uuid,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<WalletTransaction>> {
        let transactions = sqlx::query_as::<_, WalletTransaction>(
            r#"
            SELECT * FROM wallet_transactions
            WHERE token_id = $1 AND timestamp >= $2
            ORDER BY timestamp ASC
            "#,
        )
        .bind(token_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }

    async fn upsert_smart_wallet(
        &self,
        wallet_address: &str,
        smart_score: f64,
        total_trades: i64,
        last_active: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO smart_wallets (wallet_address, smart_score, total_trades, last_active)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (wallet_address) DO UPDATE SET
                smart_score = EXCLUDED.smart_score,
                total_trades = EXCLUDED.total_trades,
                last_active = EXCLUDED.last_active
            "#,
        )
        .bind(wallet_address)
        .bind(smart_score)
        .bind(total_trades)
        .bind(last_active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn smart_wallet_addresses(&self) -> anyhow::Result<Vec<String>> {
        let rows = sqlx::query("SELECT wallet_address FROM smart_wallets WHERE smart_score >= 60")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|row| row.get("wallet_address")).collect())
    }

    async fn update_token_scores(
        &self,
        token_id: Uuid,
        momentum_score: f64,
        conviction_score: f64,
        threat_level: &str,
        smart_wallet_flow: f64,
        cluster_detected: bool,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE tokens
            SET momentum_score = $2,
                conviction_score = $3,
                threat_level = $4,
                smart_wallet_flow = $5,
                cluster_detected = $6
            WHERE id = $1
            "#,
        )
        .bind(token_id)
        .bind(momentum_score)
        .bind(conviction_score)
        .bind(threat_level)
        .bind(smart_wallet_flow)
        .bind(cluster_detected)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_ai_summary(&self, token_id: Uuid, summary: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE tokens SET ai_summary = $2 WHERE id = $1")
            .bind(token_id)
            .bind(summary)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Full overwrite, no partial merge: last writer wins by design.
    async fn replace_signal(&self, signal: &Signal) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO signals (token_id, conviction_score, momentum_phase, threat_level, edge_verdict, confidence, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (token_id) DO UPDATE SET
                conviction_score = EXCLUDED.conviction_score,
                momentum_phase = EXCLUDED.momentum_phase,
                threat_level = EXCLUDED.threat_level,
                edge_verdict = EXCLUDED.edge_verdict,
                confidence = EXCLUDED.confidence,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(signal.token_id)
        .bind(signal.conviction_score)
        .bind(&signal.momentum_phase)
        .bind(&signal.threat_level)
        .bind(&signal.edge_verdict)
        .bind(signal.confidence)
        .bind(signal.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl MarketStore for TokenRepository {
    async fn persist_market_record(
        &self,
        record: &NormalizedToken,
    ) -> Result<PersistOutcome, PipelineError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            INSERT INTO tokens (id, contract_address, chain, name, symbol, price_usd,
                                liquidity_usd, volume_24h_usd, market_cap_usd,
                                pair_address, dex_id,
                                first_seen_at, last_seen_at, last_ingested_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW(), NOW(), NOW())
            ON CONFLICT (contract_address, chain) DO UPDATE SET
                name = EXCLUDED.name,
                symbol = EXCLUDED.symbol,
                price_usd = EXCLUDED.price_usd,
                liquidity_usd = EXCLUDED.liquidity_usd,
                volume_24h_usd = EXCLUDED.volume_24h_usd,
                market_cap_usd = EXCLUDED.market_cap_usd,
                pair_address = EXCLUDED.pair_address,
                dex_id = EXCLUDED.dex_id,
                last_seen_at = NOW(),
                last_ingested_at = NOW()
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&record.contract_address)
        .bind(&record.chain)
        .bind(&record.name)
        .bind(&record.symbol)
        .bind(record.price_usd)
        .bind(record.liquidity_usd)
        .bind(record.volume_24h_usd)
        .bind(record.market_cap_usd)
        .bind(&record.pair_address)
        .bind(&record.dex_id)
        .fetch_one(&mut *tx)
        .await?;

        let token_id: Uuid = row.get("id");

        sqlx::query(
            r#"
            INSERT INTO market_snapshots (id, token_id, price_usd, liquidity_usd,
                                          volume_24h_usd, market_cap_usd, fdv_usd,
                                          price_change_24h, timestamp)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(token_id)
        .bind(record.price_usd)
        .bind(record.liquidity_usd)
        .bind(record.volume_24h_usd)
        .bind(record.market_cap_usd)
        .bind(record.fdv_usd)
        .bind(record.price_change_24h)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!("Persisted {} ({})", record.symbol, token_id);

        Ok(PersistOutcome {
            token_id,
            snapshot_inserted: true,
        })
    }
}
