use chrono::Utc;

use crate::types::{FilterThresholds, RawTokenRecord};

/// Price above this is treated as a parse artifact, not a market.
const MAX_SANE_PRICE: f64 = 1e12;

/// Pure predicate chain. Every surviving record satisfies all configured
/// thresholds; no record meeting all of them is ever dropped.
pub fn filter(records: Vec<RawTokenRecord>, thresholds: &FilterThresholds) -> Vec<RawTokenRecord> {
    records
        .into_iter()
        .filter(|r| passes(r, thresholds))
        .collect()
}

fn passes(record: &RawTokenRecord, thresholds: &FilterThresholds) -> bool {
    if record.contract_address.is_empty() || record.symbol.is_empty() {
        return false;
    }

    match parsed_price(record) {
        Some(price) if price > 0.0 && price <= MAX_SANE_PRICE => {}
        _ => return false,
    }

    if record.liquidity_usd.unwrap_or(0.0) < thresholds.min_liquidity_usd {
        return false;
    }
    if record.volume_24h_usd.unwrap_or(0.0) < thresholds.min_volume_24h_usd {
        return false;
    }
    if record.market_cap_usd.unwrap_or(0.0) < thresholds.min_market_cap_usd {
        return false;
    }

    // Age gate uses the last-trade timestamp, the only age signal every
    // provider carries.
    if let Some(min_age_hours) = thresholds.min_age_hours {
        match record.last_trade_at.or(record.pair_created_at) {
            Some(seen) => {
                let age_hours = (Utc::now() - seen).num_seconds() as f64 / 3600.0;
                if age_hours < min_age_hours {
                    return false;
                }
            }
            None => return false,
        }
    }

    true
}

pub(crate) fn parsed_price(record: &RawTokenRecord) -> Option<f64> {
    record.price_usd.as_deref().and_then(|s| s.parse().ok())
}
