use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{Deployment, Signal};
use crate::error::Result;
use crate::store::DispatchStore;

/// A pending signal paired with the deployments that can act on it
#[derive(Debug, Clone)]
pub struct EligibleSignal {
    pub signal: Signal,
    pub deployments: Vec<Deployment>,
}

/// Selects the bounded, oldest-first batch of work for one tick.
///
/// Eligibility is decided store-side (pending signal, ACTIVE agent, no
/// positions); deployment resolution failures for one signal are logged
/// and drop only that signal from the batch.
pub struct EligibilityScanner {
    store: Arc<dyn DispatchStore>,
    batch_size: i64,
}

impl EligibilityScanner {
    pub fn new(store: Arc<dyn DispatchStore>, batch_size: i64) -> Self {
        Self { store, batch_size }
    }

    pub async fn scan(&self) -> Result<Vec<EligibleSignal>> {
        let signals = self.store.scan_pending_signals(self.batch_size).await?;
        debug!(count = signals.len(), "Scanned pending signals");

        let mut batch = Vec::with_capacity(signals.len());
        for signal in signals {
            match self.store.eligible_deployments(signal.agent_id).await {
                Ok(deployments) => {
                    if deployments.is_empty() {
                        debug!(signal_id = %signal.id, "No eligible deployments this cycle");
                        continue;
                    }
                    batch.push(EligibleSignal {
                        signal,
                        deployments,
                    });
                }
                Err(e) => {
                    warn!(
                        signal_id = %signal.id,
                        agent_id = %signal.agent_id,
                        error = %e,
                        "Failed to resolve deployments; skipping signal this cycle"
                    );
                }
            }
        }

        Ok(batch)
    }
}
