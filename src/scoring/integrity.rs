use serde::Serialize;
use std::collections::{HashMap, HashSet};

use super::clamp_score;
use crate::storage::WalletTransaction;

/// Minimum sample before variance-based bot heuristics apply.
const MIN_SAMPLE: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub integrity_score: f64,
    pub wash_percent: f64,
    pub self_traded_volume_usd: f64,
    pub wash_wallets: Vec<String>,
    pub bot_probability: f64,
    pub collusion_detected: bool,
    pub cluster_wallets: usize,
    pub signals: Vec<String>,
}

/// Market-integrity heuristics over one token's recorded swaps: wash
/// trading (wallets on both sides of the book), bot probability (uniform
/// sizes, repeated round sizes, metronomic timing), and collusive
/// same-size same-window clusters.
pub fn integrity_report(transactions: &[WalletTransaction]) -> IntegrityReport {
    if transactions.is_empty() {
        return IntegrityReport {
            integrity_score: 100.0,
            wash_percent: 0.0,
            self_traded_volume_usd: 0.0,
            wash_wallets: Vec::new(),
            bot_probability: 0.0,
            collusion_detected: false,
            cluster_wallets: 0,
            signals: vec!["No recorded swaps, integrity assumed clean".to_string()],
        };
    }

    let (wash_percent, self_volume, wash_wallets) = wash_trading(transactions);
    let bot_probability = bot_probability(transactions);
    let cluster_wallets = collusion_cluster_wallets(transactions);
    let collusion_detected = cluster_wallets > 0;

    let collusion_penalty = if collusion_detected {
        20.0 + 2.0 * cluster_wallets as f64
    } else {
        0.0
    };
    let integrity_score =
        clamp_score(100.0 - 0.5 * wash_percent - collusion_penalty - 0.3 * bot_probability);

    let mut signals = Vec::new();
    if !wash_wallets.is_empty() {
        signals.push(format!(
            "{} wallets trading both sides, ~${:.0} self-traded",
            wash_wallets.len(),
            self_volume
        ));
    }
    if bot_probability >= 50.0 {
        signals.push(format!("Bot-like execution pattern ({:.0}% probability)", bot_probability));
    }
    if collusion_detected {
        signals.push(format!("Collusive network suspected across {} wallets", cluster_wallets));
    }
    if signals.is_empty() {
        signals.push("No integrity flags raised".to_string());
    }

    IntegrityReport {
        integrity_score,
        wash_percent,
        self_traded_volume_usd: self_volume,
        wash_wallets,
        bot_probability,
        collusion_detected,
        cluster_wallets,
        signals,
    }
}

/// Wallets with both buy and sell activity; self-traded volume estimated
/// as min(buys, sells) x that wallet's average trade size.
fn wash_trading(transactions: &[WalletTransaction]) -> (f64, f64, Vec<String>) {
    struct WalletActivity {
        buys: u32,
        sells: u32,
        volume: f64,
        trades: u32,
    }

    let mut per_wallet: HashMap<&str, WalletActivity> = HashMap::new();
    let mut total_volume = 0.0;

    for tx in transactions {
        total_volume += tx.amount_usd;
        let entry = per_wallet.entry(tx.wallet_address.as_str()).or_insert(WalletActivity {
            buys: 0,
            sells: 0,
            volume: 0.0,
            trades: 0,
        });
        if tx.side == "buy" {
            entry.buys += 1;
        } else {
            entry.sells += 1;
        }
        entry.volume += tx.amount_usd;
        entry.trades += 1;
    }

    let mut self_volume = 0.0;
    let mut wash_wallets = Vec::new();
    for (wallet, activity) in &per_wallet {
        if activity.buys > 0 && activity.sells > 0 {
            let avg_size = activity.volume / activity.trades as f64;
            self_volume += activity.buys.min(activity.sells) as f64 * avg_size;
            wash_wallets.push(wallet.to_string());
        }
    }
    wash_wallets.sort();

    let wash_percent = if total_volume > 0.0 {
        (self_volume / total_volume * 100.0).min(100.0)
    } else {
        0.0
    };

    (wash_percent, self_volume, wash_wallets)
}

/// 0-100 from three additive components: near-uniform trade sizes (40),
/// sizes repeating at least three times when rounded to the nearest unit
/// (30), near-uniform inter-transaction intervals (30).
fn bot_probability(transactions: &[WalletTransaction]) -> f64 {
    if transactions.len() < MIN_SAMPLE {
        return 0.0;
    }

    let mut probability = 0.0;

    let sizes: Vec<f64> = transactions.iter().map(|t| t.amount_usd).collect();
    if coefficient_of_variation(&sizes) < 0.1 {
        probability += 40.0;
    }

    let mut rounded_counts: HashMap<i64, u32> = HashMap::new();
    for size in &sizes {
        *rounded_counts.entry(size.round() as i64).or_insert(0) += 1;
    }
    if rounded_counts.values().any(|&count| count >= 3) {
        probability += 30.0;
    }

    let mut timestamps: Vec<i64> = transactions.iter().map(|t| t.timestamp.timestamp()).collect();
    timestamps.sort_unstable();
    let intervals: Vec<f64> = timestamps.windows(2).map(|w| (w[1] - w[0]) as f64).collect();
    if intervals.len() >= MIN_SAMPLE - 1 && coefficient_of_variation(&intervals) < 0.2 {
        probability += 30.0;
    }

    probability
}

/// Clusters of at least three distinct wallets trading near-identical USD
/// sizes inside the same 5-minute bucket.
fn collusion_cluster_wallets(transactions: &[WalletTransaction]) -> usize {
    let mut groups: HashMap<(i64, i64), HashSet<&str>> = HashMap::new();
    for tx in transactions {
        let bucket = tx.timestamp.timestamp() / 300;
        let size = tx.amount_usd.round() as i64;
        groups.entry((bucket, size)).or_default().insert(tx.wallet_address.as_str());
    }

    let mut clustered: HashSet<&str> = HashSet::new();
    for wallets in groups.values() {
        if wallets.len() >= 3 {
            clustered.extend(wallets.iter());
        }
    }
    clustered.len()
}

fn coefficient_of_variation(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::MAX;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    if mean == 0.0 {
        // All-zero samples (e.g. same-second trade intervals) have no
        // spread at all, which is the most uniform case, not the least.
        return if values.iter().all(|v| *v == 0.0) {
            0.0
        } else {
            f64::MAX
        };
    }
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt() / mean.abs()
}
