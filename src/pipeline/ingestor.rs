use std::sync::Arc;
use tracing::{error, info, warn};

use crate::storage::MarketStore;
use crate::types::NormalizedToken;

/// Consecutive fully-failing batches (with zero successes overall) that
/// distinguish "the store appears to be down" from "a few bad records".
const FAILED_BATCH_LIMIT: u32 = 3;

#[derive(Debug, Default, PartialEq)]
pub struct IngestReport {
    pub upserted: u64,
    pub snapshots: u64,
    pub failed_batches: u32,
    pub aborted: bool,
}

/// Persists normalized records in small fixed-size batches. Each record is
/// applied inside its own transaction, so one bad record never rolls back
/// its batch siblings. Sustained systemic failure trips the circuit
/// breaker and aborts the remaining batches.
pub struct Ingestor {
    store: Arc<dyn MarketStore>,
    batch_size: usize,
}

impl Ingestor {
    pub fn new(store: Arc<dyn MarketStore>, batch_size: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
        }
    }

    pub async fn ingest(&self, records: &[NormalizedToken]) -> IngestReport {
        let mut report = IngestReport::default();

        for batch in records.chunks(self.batch_size) {
            let results = futures::future::join_all(
                batch.iter().map(|record| self.store.persist_market_record(record)),
            )
            .await;

            let mut batch_failed = false;
            for (record, result) in batch.iter().zip(results) {
                match result {
                    Ok(outcome) => {
                        report.upserted += 1;
                        if outcome.snapshot_inserted {
                            report.snapshots += 1;
                        }
                    }
                    Err(e) => {
                        batch_failed = true;
                        warn!("Failed to persist {}: {}", record.contract_address, e);
                    }
                }
            }

            if batch_failed {
                report.failed_batches += 1;
            }

            if report.failed_batches >= FAILED_BATCH_LIMIT && report.upserted == 0 {
                error!(
                    "Circuit breaker tripped after {} failed batches with no successes, aborting ingestion",
                    report.failed_batches
                );
                report.aborted = true;
                break;
            }
        }

        info!(
            "Ingestion complete: {} upserted, {} snapshots, {} failed batches",
            report.upserted, report.snapshots, report.failed_batches
        );
        report
    }
}
