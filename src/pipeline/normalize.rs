use chrono::Utc;
use tracing::debug;

use super::filter::parsed_price;
use crate::types::{NormalizedToken, RawTokenRecord};

/// Best-effort mapping from raw to canonical. Malformed entries are
/// dropped silently rather than failing the whole pass; idempotent on
/// already-canonical input and never increases record count.
pub fn normalize(records: Vec<RawTokenRecord>) -> Vec<NormalizedToken> {
    records
        .into_iter()
        .filter_map(|r| match normalize_one(&r) {
            Some(token) => Some(token),
            None => {
                debug!("Dropping malformed record {} from {}", r.contract_address, r.source);
                None
            }
        })
        .collect()
}

fn normalize_one(record: &RawTokenRecord) -> Option<NormalizedToken> {
    let price_usd = parsed_price(record)?;

    // Providers without pool detail get a derived pair identity so the
    // downstream uniqueness key is always populated.
    let pair_address = record
        .pair_address
        .clone()
        .unwrap_or_else(|| format!("derived:{}", record.contract_address));
    let dex_id = record.dex_id.clone().unwrap_or_else(|| "unknown".to_string());

    // Pair creation estimated from the last trade when the provider lacks
    // it; a token that trades existed at least as long ago as that trade.
    let pair_created_at = record
        .pair_created_at
        .or(record.last_trade_at)
        .unwrap_or_else(Utc::now);

    Some(NormalizedToken {
        contract_address: record.contract_address.clone(),
        chain: record.chain.clone(),
        name: record.name.clone(),
        symbol: record.symbol.clone(),
        price_usd,
        liquidity_usd: record.liquidity_usd.unwrap_or(0.0),
        volume_24h_usd: record.volume_24h_usd.unwrap_or(0.0),
        volume_change_24h: record.volume_change_24h.unwrap_or(0.0),
        market_cap_usd: record.market_cap_usd.unwrap_or(0.0),
        fdv_usd: record.fdv_usd.or(record.market_cap_usd).unwrap_or(0.0),
        price_change_24h: record.price_change_24h.unwrap_or(0.0),
        pair_address,
        dex_id,
        pair_created_at,
        source: record.source.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(contract: &str, price: Option<&str>) -> RawTokenRecord {
        RawTokenRecord {
            contract_address: contract.to_string(),
            chain: "solana".to_string(),
            name: "Test".to_string(),
            symbol: "TST".to_string(),
            price_usd: price.map(|s| s.to_string()),
            liquidity_usd: Some(20_000.0),
            volume_24h_usd: Some(10_000.0),
            volume_change_24h: None,
            market_cap_usd: Some(100_000.0),
            fdv_usd: None,
            price_change_24h: Some(2.5),
            pair_address: None,
            dex_id: None,
            pair_created_at: None,
            last_trade_at: None,
            source: "test".to_string(),
        }
    }

    #[test]
    fn parses_price_and_derives_pair_identity() {
        let tokens = normalize(vec![raw("mint1", Some("0.5"))]);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].price_usd, 0.5);
        assert_eq!(tokens[0].pair_address, "derived:mint1");
        assert_eq!(tokens[0].dex_id, "unknown");
        assert_eq!(tokens[0].fdv_usd, 100_000.0);
    }

    #[test]
    fn unparseable_price_drops_only_that_record() {
        let tokens = normalize(vec![raw("mint1", Some("abc")), raw("mint2", Some("1.25"))]);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].contract_address, "mint2");
    }

    #[test]
    fn never_increases_record_count() {
        let input = vec![raw("mint1", Some("0.5")), raw("mint2", None)];
        let count = input.len();
        assert!(normalize(input).len() <= count);
    }

    #[test]
    fn pair_creation_estimated_from_last_trade() {
        let mut record = raw("mint1", Some("0.5"));
        let last_trade = Utc::now() - chrono::Duration::hours(12);
        record.last_trade_at = Some(last_trade);

        let tokens = normalize(vec![record]);
        assert_eq!(tokens[0].pair_created_at, last_trade);
    }
}
