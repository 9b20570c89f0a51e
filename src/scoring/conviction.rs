use serde::Serialize;

use super::clamp_score;
use crate::storage::WalletTransaction;

#[derive(Debug, Clone, Serialize)]
pub struct ConvictionScore {
    pub score: f64,
    pub liquidity_ratio_pct: f64,
    pub repeat_buyers: usize,
    pub smart_wallet_entries: usize,
    pub signals: Vec<String>,
}

/// Conviction ratio = liquidity / market cap; a deep pool behind a small
/// cap is a defensible price level. Bands: >=15% (76-100), 8-15% (56-75),
/// 3-8% (31-55), <3% (0-30), then boosted by repeat-buyer and
/// smart-wallet-entry counts from the last 24h of recorded swaps.
pub fn conviction_score(
    liquidity_usd: f64,
    market_cap_usd: f64,
    recent_transactions: &[WalletTransaction],
    smart_wallets: &[String],
) -> ConvictionScore {
    if market_cap_usd <= 0.0 {
        return ConvictionScore {
            score: 0.0,
            liquidity_ratio_pct: 0.0,
            repeat_buyers: 0,
            smart_wallet_entries: 0,
            signals: vec!["No market cap data, conviction unscored".to_string()],
        };
    }

    let ratio = liquidity_usd / market_cap_usd * 100.0;

    let base = if ratio >= 15.0 {
        clamp_score(76.0 + (ratio - 15.0) / 85.0 * 24.0)
    } else if ratio >= 8.0 {
        56.0 + (ratio - 8.0) / 7.0 * 19.0
    } else if ratio >= 3.0 {
        31.0 + (ratio - 3.0) / 5.0 * 24.0
    } else {
        ratio / 3.0 * 30.0
    };

    let repeat_buyers = count_repeat_buyers(recent_transactions);
    let smart_entries = recent_transactions
        .iter()
        .filter(|t| t.side == "buy" && smart_wallets.contains(&t.wallet_address))
        .count();

    let boost = (repeat_buyers as f64 * 2.0).min(10.0) + (smart_entries as f64 * 3.0).min(15.0);
    let score = clamp_score(base + boost);

    let mut signals = vec![format!("Liquidity/market-cap ratio {:.1}%", ratio)];
    if repeat_buyers > 0 {
        signals.push(format!("{} repeat buyers in 24h", repeat_buyers));
    }
    if smart_entries > 0 {
        signals.push(format!("{} smart-wallet entries in 24h", smart_entries));
    }

    ConvictionScore {
        score,
        liquidity_ratio_pct: ratio,
        repeat_buyers,
        smart_wallet_entries: smart_entries,
        signals,
    }
}

fn count_repeat_buyers(transactions: &[WalletTransaction]) -> usize {
    let mut buys_per_wallet = std::collections::HashMap::new();
    for tx in transactions.iter().filter(|t| t.side == "buy") {
        *buys_per_wallet.entry(tx.wallet_address.as_str()).or_insert(0u32) += 1;
    }
    buys_per_wallet.values().filter(|&&count| count >= 2).count()
}
