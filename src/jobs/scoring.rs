use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{info, warn};

use super::RecurringJob;
use crate::cache::{CacheLayer, TTL_INTELLIGENCE};
use crate::scoring::{
    alpha_score, conviction_score, dev_reputation, edge_score, integrity_report, momentum_score,
    threat_assessment, EdgeInputs, ThreatInputs,
};
use crate::storage::{MarketSnapshot, Signal, Token, TokenStore, WalletTransaction};

/// Channel carrying freshly recomputed signals to the realtime fan-out.
const SIGNAL_CHANNEL: &str = "signals:updated";

/// Recomputes every engine from stored history for all tokens seen in the
/// last 24h, overwrites the derived token fields and the per-token signal
/// row, and publishes the result. Last writer wins throughout; nothing
/// here merges.
pub struct ScoringJob {
    store: Arc<dyn TokenStore>,
    cache: CacheLayer,
    interval: Duration,
}

impl ScoringJob {
    pub fn new(store: Arc<dyn TokenStore>, cache: CacheLayer, interval: Duration) -> Self {
        Self {
            store,
            cache,
            interval,
        }
    }

    async fn score_token(
        &self,
        token: &Token,
        smart_wallets: &[String],
    ) -> anyhow::Result<Signal> {
        let since = Utc::now() - ChronoDuration::hours(24);
        let snapshots = self.store.snapshots_since(token.id, since).await?;
        let transactions = self
            .store
            .wallet_transactions_since(token.id, since)
            .await?;

        let (price_change, volume_change) = market_deltas(&snapshots);
        let momentum = momentum_score(price_change, volume_change);
        let conviction = conviction_score(
            token.liquidity_usd,
            token.market_cap_usd,
            &transactions,
            smart_wallets,
        );
        let threat = threat_assessment(&ThreatInputs {
            mint_authority_active: token.mint_authority_active,
            freeze_authority_active: token.freeze_authority_active,
            top10_holder_pct: token.top10_holder_pct,
            liquidity_locked: token.liquidity_locked,
            ownership_renounced: token.ownership_renounced,
        });
        let integrity = integrity_report(&transactions);
        let alpha = alpha_score(momentum.score, conviction.score, threat.safety_score);

        // No creator-history source is wired yet; reputation stays at its
        // neutral default. Same for bundle risk and narrative.
        let reputation = dev_reputation(0, 0);
        let smart_flow = smart_flow_pct(&transactions, smart_wallets);
        let edge = edge_score(&EdgeInputs {
            dev_reputation: reputation.score,
            dev_label: reputation.label,
            bundle_risk_score: 0.0,
            threat_safety_score: threat.safety_score,
            narrative_score: 50.0,
            smart_flow_score: smart_flow,
            integrity_score: integrity.integrity_score,
            drain_alert_active: false,
        });

        self.store
            .update_token_scores(
                token.id,
                momentum.score,
                conviction.score,
                threat.level.label(),
                smart_flow,
                integrity.collusion_detected,
            )
            .await?;

        info!(
            "Scored {}: momentum {:.0}, conviction {:.0}, threat {}, alpha {} ({:.0}), edge {} ({:.0})",
            token.symbol,
            momentum.score,
            conviction.score,
            threat.level.label(),
            alpha.bucket.label(),
            alpha.score,
            edge.verdict.label(),
            edge.score
        );

        Ok(Signal {
            token_id: token.id,
            conviction_score: conviction.score,
            momentum_phase: momentum.phase.label().to_string(),
            threat_level: threat.level.label().to_string(),
            edge_verdict: edge.verdict.label().to_string(),
            confidence: edge.recommendation.confidence,
            updated_at: Utc::now(),
        })
    }
}

#[async_trait]
impl RecurringJob for ScoringJob {
    fn queue_name(&self) -> &'static str {
        "scoring"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run(&self) -> anyhow::Result<()> {
        let since = Utc::now() - ChronoDuration::hours(24);
        let tokens = self.store.tokens_seen_since(since).await?;
        let smart_wallets = self.store.smart_wallet_addresses().await?;

        let mut scored = 0usize;
        for token in &tokens {
            let signal = match self.score_token(token, &smart_wallets).await {
                Ok(signal) => signal,
                Err(e) => {
                    warn!("Scoring failed for {}: {}", token.symbol, e);
                    continue;
                }
            };

            if let Err(e) = self.store.replace_signal(&signal).await {
                warn!("Signal write failed for {}: {}", token.symbol, e);
                continue;
            }

            let key = CacheLayer::intelligence_key(&token.contract_address);
            let previous: Option<Signal> = self.cache.get_json(&key);
            self.cache.set_json(&key, &signal, TTL_INTELLIGENCE);
            if signal_changed(previous.as_ref(), &signal) {
                self.cache.publish(SIGNAL_CHANNEL, &signal);
            }
            scored += 1;
        }

        info!("Scoring cycle: {}/{} tokens scored", scored, tokens.len());
        Ok(())
    }
}

/// A signal is fanned out only when it says something new: first sight
/// of a token, or a verdict or threat transition since the cached copy.
fn signal_changed(previous: Option<&Signal>, current: &Signal) -> bool {
    match previous {
        Some(prev) => {
            prev.edge_verdict != current.edge_verdict || prev.threat_level != current.threat_level
        }
        None => true,
    }
}

/// 24h price and volume change derived from the snapshot series. Price
/// change comes off the latest snapshot; volume change is computed across
/// the window's ends. Fewer than two snapshots means no volume trend.
fn market_deltas(snapshots: &[MarketSnapshot]) -> (Option<f64>, Option<f64>) {
    let latest = match snapshots.last() {
        Some(snapshot) => snapshot,
        None => return (None, None),
    };

    let volume_change = snapshots.first().and_then(|first| {
        if snapshots.len() < 2 || first.volume_24h_usd <= 0.0 {
            None
        } else {
            Some((latest.volume_24h_usd - first.volume_24h_usd) / first.volume_24h_usd * 100.0)
        }
    });

    (Some(latest.price_change_24h), volume_change)
}

/// Share of recorded buy volume attributable to known smart wallets,
/// as a 0-100 score.
fn smart_flow_pct(transactions: &[WalletTransaction], smart_wallets: &[String]) -> f64 {
    let buys: Vec<&WalletTransaction> =
        transactions.iter().filter(|t| t.side == "buy").collect();
    let total: f64 = buys.iter().map(|t| t.amount_usd).sum();
    if total <= 0.0 {
        return 0.0;
    }

    let smart: f64 = buys
        .iter()
        .filter(|t| smart_wallets.contains(&t.wallet_address))
        .map(|t| t.amount_usd)
        .sum();
    (smart / total * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use uuid::Uuid;

    fn snapshot(volume: f64, price_change: f64, minutes: i64) -> MarketSnapshot {
        MarketSnapshot {
            id: Uuid::new_v4(),
            token_id: Uuid::new_v4(),
            price_usd: 1.0,
            liquidity_usd: 100_000.0,
            volume_24h_usd: volume,
            market_cap_usd: 1_000_000.0,
            fdv_usd: 1_000_000.0,
            price_change_24h: price_change,
            timestamp: DateTime::from_timestamp(1_700_000_000 + minutes * 60, 0).unwrap(),
        }
    }

    fn tx(wallet: &str, usd: f64, side: &str) -> WalletTransaction {
        WalletTransaction {
            id: Uuid::new_v4(),
            token_id: Uuid::new_v4(),
            wallet_address: wallet.to_string(),
            amount_usd: usd,
            side: side.to_string(),
            timestamp: Utc::now(),
            signature: Uuid::new_v4().to_string(),
        }
    }

    #[test]
    fn deltas_need_two_snapshots_for_a_volume_trend() {
        let one = vec![snapshot(50_000.0, 12.0, 0)];
        assert_eq!(market_deltas(&one), (Some(12.0), None));

        let two = vec![snapshot(50_000.0, 12.0, 0), snapshot(75_000.0, 20.0, 60)];
        let (price, volume) = market_deltas(&two);
        assert_eq!(price, Some(20.0));
        assert_eq!(volume, Some(50.0));
    }

    #[test]
    fn empty_history_yields_no_deltas() {
        assert_eq!(market_deltas(&[]), (None, None));
    }

    #[test]
    fn smart_flow_is_the_smart_share_of_buy_volume() {
        let smart_wallets = vec!["alpha".to_string()];
        let transactions = vec![
            tx("alpha", 3_000.0, "buy"),
            tx("retail", 1_000.0, "buy"),
            tx("alpha", 9_999.0, "sell"),
        ];

        assert_eq!(smart_flow_pct(&transactions, &smart_wallets), 75.0);
        assert_eq!(smart_flow_pct(&[], &smart_wallets), 0.0);
    }

    #[test]
    fn signals_fan_out_on_first_sight_and_on_transitions() {
        let base = Signal {
            token_id: Uuid::new_v4(),
            conviction_score: 60.0,
            momentum_phase: "ACCUMULATION".to_string(),
            threat_level: "GREEN".to_string(),
            edge_verdict: "EDGE".to_string(),
            confidence: 55.0,
            updated_at: Utc::now(),
        };

        assert!(signal_changed(None, &base));

        let mut rescored = base.clone();
        rescored.conviction_score = 61.0;
        assert!(!signal_changed(Some(&base), &rescored));

        rescored.edge_verdict = "AVOID".to_string();
        assert!(signal_changed(Some(&base), &rescored));
    }

    #[tokio::test]
    async fn one_failed_signal_write_does_not_abort_the_cycle() {
        let first = crate::jobs::support::sample_token("AAA");
        let second = crate::jobs::support::sample_token("BBB");
        let second_id = second.id;

        let mut store = crate::jobs::support::RecordingStore::with_tokens(vec![first.clone(), second]);
        store.fail_replace_signal_for = Some(first.id);
        let store = Arc::new(store);

        let cache = CacheLayer::new("redis://127.0.0.1:6390/0").unwrap();
        let job = ScoringJob::new(store.clone(), cache, Duration::from_secs(600));

        job.run().await.unwrap();

        // Both tokens were scored; only the healthy one got a signal row.
        assert_eq!(store.score_updates.lock().unwrap().len(), 2);
        assert_eq!(*store.signals.lock().unwrap(), vec![second_id]);
    }
}
