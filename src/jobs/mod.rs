pub mod interpret;
pub mod scan;
pub mod scoring;
pub mod snapshot;
pub mod wallet_intel;

#[cfg(test)]
pub(crate) mod support;

pub use interpret::{HttpInterpreter, InterpretationJob, Interpreter};
pub use scan::ScanJob;
pub use scoring::ScoringJob;
pub use snapshot::SnapshotJob;
pub use wallet_intel::{OnchainActivitySource, WalletActivitySource, WalletIntelJob};

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, timeout, Duration, MissedTickBehavior};
use tracing::{error, info, warn};

/// Delay before the single in-slot retry of a failed run.
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// A recurring unit of work bound to its own queue. Each queue runs one
/// job at a time; queues run concurrently with each other.
#[async_trait]
pub trait RecurringJob: Send + Sync {
    fn queue_name(&self) -> &'static str;

    fn interval(&self) -> Duration;

    /// Whether the first run fires immediately instead of waiting one
    /// full interval.
    fn run_immediately(&self) -> bool {
        false
    }

    async fn run(&self) -> anyhow::Result<()>;
}

#[derive(Debug, Default)]
pub struct QueueStats {
    pub completed: AtomicU64,
    pub failed: AtomicU64,
    pub timed_out: AtomicU64,
}

impl QueueStats {
    pub fn snapshot(&self) -> (u64, u64, u64) {
        (
            self.completed.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
            self.timed_out.load(Ordering::Relaxed),
        )
    }
}

struct Queue {
    job: Arc<dyn RecurringJob>,
    stats: Arc<QueueStats>,
}

/// Owns the recurring queues. Built once by the entrypoint, started once,
/// and drained on shutdown: in-flight runs finish (bounded by the lock
/// duration), then the loops exit.
pub struct Orchestrator {
    queues: Vec<Queue>,
    lock_duration: Duration,
    is_running: Arc<RwLock<bool>>,
    shutdown_tx: watch::Sender<bool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Orchestrator {
    pub fn new(lock_duration: Duration) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            queues: Vec::new(),
            lock_duration,
            is_running: Arc::new(RwLock::new(false)),
            shutdown_tx,
            handles: Mutex::new(Vec::new()),
        }
    }

    pub fn register(&mut self, job: Arc<dyn RecurringJob>) {
        info!(
            "Registered queue {} (every {:?})",
            job.queue_name(),
            job.interval()
        );
        self.queues.push(Queue {
            job,
            stats: Arc::new(QueueStats::default()),
        });
    }

    pub fn stats(&self) -> Vec<(&'static str, Arc<QueueStats>)> {
        self.queues
            .iter()
            .map(|q| (q.job.queue_name(), Arc::clone(&q.stats)))
            .collect()
    }

    pub async fn start(&self) {
        {
            let mut running = self.is_running.write().await;
            if *running {
                warn!("Orchestrator already running");
                return;
            }
            *running = true;
        }

        let mut handles = self.handles.lock().await;
        for queue in &self.queues {
            let job = Arc::clone(&queue.job);
            let stats = Arc::clone(&queue.stats);
            let lock_duration = self.lock_duration;
            let mut shutdown_rx = self.shutdown_tx.subscribe();

            handles.push(tokio::spawn(async move {
                let mut ticker = interval(job.interval());
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                if !job.run_immediately() {
                    // The first tick of a tokio interval is immediate.
                    ticker.tick().await;
                }

                loop {
                    tokio::select! {
                        _ = ticker.tick() => {}
                        _ = shutdown_rx.changed() => {
                            info!("Queue {} draining", job.queue_name());
                            break;
                        }
                    }

                    run_once(job.as_ref(), &stats, lock_duration).await;
                }
            }));
        }

        info!("Orchestrator started with {} queues", self.queues.len());
    }

    /// Close all queues and wait for in-flight runs to finish.
    pub async fn shutdown(&self) {
        {
            let mut running = self.is_running.write().await;
            if !*running {
                return;
            }
            *running = false;
        }

        let _ = self.shutdown_tx.send(true);
        let mut handles = self.handles.lock().await;
        for handle in handles.drain(..) {
            if let Err(e) = handle.await {
                error!("Queue task panicked during drain: {}", e);
            }
        }
        info!("Orchestrator drained");
    }
}

/// Execute one scheduled slot: the run is bounded by the lock duration,
/// and a failed run gets exactly one in-slot retry before deferring to
/// the next tick.
async fn run_once(job: &dyn RecurringJob, stats: &QueueStats, lock_duration: Duration) {
    for attempt in 0..2u32 {
        match timeout(lock_duration, job.run()).await {
            Ok(Ok(())) => {
                stats.completed.fetch_add(1, Ordering::Relaxed);
                return;
            }
            Ok(Err(e)) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "Queue {} run failed (attempt {}): {}",
                    job.queue_name(),
                    attempt + 1,
                    e
                );
            }
            Err(_) => {
                stats.timed_out.fetch_add(1, Ordering::Relaxed);
                error!(
                    "Queue {} run exceeded lock duration {:?}, counting as failed",
                    job.queue_name(),
                    lock_duration
                );
            }
        }

        if attempt == 0 {
            sleep(RETRY_DELAY).await;
        }
    }
}
