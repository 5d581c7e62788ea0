//! Dispatch worker loop.
//!
//! One bounded batch per tick, processed sequentially; multiple worker
//! processes may run against the shared store, relying on the position
//! uniqueness constraint rather than any in-process lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::services::dispatcher::{DispatchSummary, ExecutionDispatcher};

/// Cumulative counters across ticks
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerStats {
    pub ticks: u64,
    pub executed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub store_failures: u64,
}

pub struct DispatchWorker {
    dispatcher: Arc<ExecutionDispatcher>,
    interval: Duration,
    running: Arc<AtomicBool>,
    stats: Arc<RwLock<WorkerStats>>,
}

impl DispatchWorker {
    pub fn new(dispatcher: Arc<ExecutionDispatcher>, interval_secs: u64) -> Self {
        Self {
            dispatcher,
            interval: Duration::from_secs(interval_secs),
            running: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(RwLock::new(WorkerStats::default())),
        }
    }

    pub async fn stats(&self) -> WorkerStats {
        *self.stats.read().await
    }

    /// Start the polling loop
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Dispatch worker already running");
            return;
        }

        info!(interval_secs = self.interval.as_secs(), "Starting dispatch worker");

        let dispatcher = self.dispatcher.clone();
        let running = self.running.clone();
        let stats = self.stats.clone();
        let interval_duration = self.interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(interval_duration);

            while running.load(Ordering::SeqCst) {
                interval.tick().await;

                match dispatcher.process_pending().await {
                    Ok(summary) => {
                        let mut s = stats.write().await;
                        s.ticks += 1;
                        record(&mut s, summary);
                    }
                    Err(e) => {
                        // Store unavailability aborts the tick; the next
                        // interval retries from a fresh scan.
                        error!("Dispatch tick aborted: {}", e);
                        let mut s = stats.write().await;
                        s.ticks += 1;
                        s.store_failures += 1;
                    }
                }
            }

            info!("Dispatch worker stopped");
        });
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        info!("Dispatch worker stop requested");
    }
}

fn record(stats: &mut WorkerStats, summary: DispatchSummary) {
    stats.executed += summary.executed;
    stats.failed += summary.failed;
    stats.skipped += summary.skipped;
}
