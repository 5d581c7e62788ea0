//! State reconciler.
//!
//! Authorization can be granted or revoked directly on-chain, outside
//! platform control. This service periodically re-reads the chain and
//! overwrites the cached `module_enabled` flag (chain is ground truth),
//! appending an audit row per correction.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::adapters::AuthorizationReader;
use crate::config::ReconcilerConfig;
use crate::domain::AuthorizationAudit;
use crate::error::Result;
use crate::store::DispatchStore;

/// Result of one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub checked: u64,
    pub drifted: u64,
    pub read_failures: u64,
}

pub struct StateReconciler {
    store: Arc<dyn DispatchStore>,
    reader: Arc<dyn AuthorizationReader>,
    module_id: String,
    interval: Duration,
    read_timeout: Duration,
    running: Arc<AtomicBool>,
}

impl StateReconciler {
    pub fn new(
        store: Arc<dyn DispatchStore>,
        reader: Arc<dyn AuthorizationReader>,
        config: &ReconcilerConfig,
    ) -> Self {
        Self {
            store,
            reader,
            module_id: config.module_id.clone(),
            interval: Duration::from_secs(config.interval_secs),
            read_timeout: Duration::from_millis(config.read_timeout_ms),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Compare every deployment's cached flag against the chain and
    /// correct drift. Read failures leave the cache untouched.
    pub async fn reconcile_once(&self) -> Result<ReconcileSummary> {
        let deployments = self.store.list_deployments().await?;
        let mut summary = ReconcileSummary::default();

        for deployment in deployments {
            summary.checked += 1;

            let on_chain = match timeout(
                self.read_timeout,
                self.reader
                    .is_authorized(&deployment.custody_account, &self.module_id),
            )
            .await
            {
                Ok(Ok(authorized)) => authorized,
                Ok(Err(e)) => {
                    warn!(deployment_id = %deployment.id, error = %e, "Authorization read failed");
                    summary.read_failures += 1;
                    continue;
                }
                Err(_) => {
                    warn!(deployment_id = %deployment.id, "Authorization read timed out");
                    summary.read_failures += 1;
                    continue;
                }
            };

            if on_chain == deployment.module_enabled {
                continue;
            }

            info!(
                deployment_id = %deployment.id,
                cached = deployment.module_enabled,
                on_chain,
                "Authorization drift detected; chain wins"
            );

            self.store
                .set_module_enabled(deployment.id, on_chain)
                .await?;
            self.store
                .record_authorization_audit(&AuthorizationAudit {
                    deployment_id: deployment.id,
                    previous: deployment.module_enabled,
                    new: on_chain,
                    observed_at: Utc::now(),
                })
                .await?;
            summary.drifted += 1;
        }

        debug!(
            checked = summary.checked,
            drifted = summary.drifted,
            read_failures = summary.read_failures,
            "Reconciliation pass complete"
        );
        Ok(summary)
    }

    /// Start the periodic reconciliation loop
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("State reconciler already running");
            return;
        }

        info!(interval_secs = self.interval.as_secs(), "Starting state reconciler");

        let reconciler = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(reconciler.interval);

            while reconciler.running.load(Ordering::SeqCst) {
                interval.tick().await;

                match reconciler.reconcile_once().await {
                    Ok(summary) if summary.drifted > 0 => {
                        info!(drifted = summary.drifted, "Reconciler corrected drift");
                    }
                    Ok(_) => {}
                    Err(e) => error!("Reconciliation pass failed: {}", e),
                }
            }

            info!("State reconciler stopped");
        });
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        info!("State reconciler stop requested");
    }
}
