use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{info, warn};

use super::RecurringJob;
use crate::error::PipelineError;
use crate::pipeline::normalize;
use crate::providers::MultiSourceFetcher;
use crate::storage::TokenStore;

/// Per-token market refresh. Deliberately sequential: the shared
/// rate-limit flag is consulted before every upstream call, and the
/// moment a limit trips mid-run the rest of the cycle is abandoned
/// instead of burning calls into a known-limited provider.
pub struct SnapshotJob {
    fetcher: Arc<MultiSourceFetcher>,
    store: Arc<dyn TokenStore>,
    interval: Duration,
}

impl SnapshotJob {
    pub fn new(
        fetcher: Arc<MultiSourceFetcher>,
        store: Arc<dyn TokenStore>,
        interval: Duration,
    ) -> Self {
        Self {
            fetcher,
            store,
            interval,
        }
    }
}

#[async_trait]
impl RecurringJob for SnapshotJob {
    fn queue_name(&self) -> &'static str {
        "snapshot"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run(&self) -> anyhow::Result<()> {
        let since = Utc::now() - ChronoDuration::hours(24);
        let tokens = self.store.tokens_seen_since(since).await?;

        let mut refreshed = 0usize;
        for token in &tokens {
            match self.fetcher.refresh_token(&token.contract_address).await {
                Ok(Some(raw)) => {
                    let normalized = normalize(vec![raw]);
                    if let Some(record) = normalized.first() {
                        match self.store.persist_market_record(record).await {
                            Ok(_) => refreshed += 1,
                            Err(e) => warn!("Snapshot persist failed for {}: {}", token.symbol, e),
                        }
                    }
                }
                Ok(None) => {}
                Err(PipelineError::RateLimit { provider }) => {
                    warn!(
                        "Snapshot cycle aborted: {} rate limited after {} of {} tokens",
                        provider,
                        refreshed,
                        tokens.len()
                    );
                    break;
                }
                Err(e) => warn!("Snapshot refresh failed for {}: {}", token.symbol, e),
            }
        }

        info!("Snapshot cycle: {}/{} tokens refreshed", refreshed, tokens.len());
        Ok(())
    }
}
