use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::info;

use super::RecurringJob;
use crate::pipeline::{filter, normalize, Ingestor};
use crate::providers::MultiSourceFetcher;
use crate::types::FilterThresholds;

/// The discovery loop: fetch candidates, filter against thresholds,
/// normalize into canonical records, hand them to the ingestor.
pub struct ScanJob {
    fetcher: Arc<MultiSourceFetcher>,
    ingestor: Arc<Ingestor>,
    thresholds: FilterThresholds,
    interval: Duration,
}

impl ScanJob {
    pub fn new(
        fetcher: Arc<MultiSourceFetcher>,
        ingestor: Arc<Ingestor>,
        thresholds: FilterThresholds,
        interval: Duration,
    ) -> Self {
        Self {
            fetcher,
            ingestor,
            thresholds,
            interval,
        }
    }
}

#[async_trait]
impl RecurringJob for ScanJob {
    fn queue_name(&self) -> &'static str {
        "token-scan"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn run_immediately(&self) -> bool {
        true
    }

    async fn run(&self) -> anyhow::Result<()> {
        let raw = self.fetcher.fetch_all(&self.thresholds).await?;
        let fetched = raw.len();

        let kept = filter(raw, &self.thresholds);
        let normalized = normalize(kept);
        info!(
            "Scan: {} fetched, {} survived filter/normalize",
            fetched,
            normalized.len()
        );

        let report = self.ingestor.ingest(&normalized).await;
        if report.aborted {
            anyhow::bail!(
                "ingestion aborted by circuit breaker after {} failed batches",
                report.failed_batches
            );
        }

        info!(
            "Scan complete: {} upserted, {} snapshots",
            report.upserted, report.snapshots
        );
        Ok(())
    }
}
