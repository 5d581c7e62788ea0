//! Reconciler tests: cached authorization flags converge to the chain
//! view, with one audit row per correction.

mod support;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use strada::adapters::{AuthorizationReader, StaticAuthorizations};
use strada::config::ReconcilerConfig;
use strada::domain::Venue;
use strada::error::{Result, StradaError};
use strada::services::StateReconciler;

use support::{make_deployment, MemoryStore};

struct FailingReader;

#[async_trait]
impl AuthorizationReader for FailingReader {
    async fn is_authorized(&self, custody_account: &str, _module_id: &str) -> Result<bool> {
        Err(StradaError::AuthorizationRead {
            account: custody_account.to_string(),
            reason: "rpc unreachable".to_string(),
        })
    }
}

fn reconciler(
    store: Arc<MemoryStore>,
    reader: Arc<dyn AuthorizationReader>,
) -> Arc<StateReconciler> {
    Arc::new(StateReconciler::new(
        store,
        reader,
        &ReconcilerConfig::default(),
    ))
}

#[tokio::test]
async fn revocation_disables_cached_flag_and_audits() {
    let store = MemoryStore::new();
    let mut deployment = make_deployment(Uuid::new_v4(), vec![Venue::Hyperliquid]);
    deployment.module_enabled = true;
    let deployment_id = deployment.id;
    let custody = deployment.custody_account.clone();
    store.add_deployment(deployment);

    let auth = Arc::new(StaticAuthorizations::new(true));
    auth.set(&custody, false);

    let summary = reconciler(store.clone(), auth)
        .reconcile_once()
        .await
        .unwrap();
    assert_eq!(summary.checked, 1);
    assert_eq!(summary.drifted, 1);
    assert_eq!(store.module_enabled(deployment_id), Some(false));

    let audits = store.audits();
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].deployment_id, deployment_id);
    assert!(audits[0].previous);
    assert!(!audits[0].new);
}

#[tokio::test]
async fn regrant_reenables_cached_flag() {
    let store = MemoryStore::new();
    let mut deployment = make_deployment(Uuid::new_v4(), vec![Venue::Jupiter]);
    deployment.module_enabled = false;
    let deployment_id = deployment.id;
    let custody = deployment.custody_account.clone();
    store.add_deployment(deployment);

    let auth = Arc::new(StaticAuthorizations::new(false));
    auth.set(&custody, true);

    let summary = reconciler(store.clone(), auth)
        .reconcile_once()
        .await
        .unwrap();
    assert_eq!(summary.drifted, 1);
    assert_eq!(store.module_enabled(deployment_id), Some(true));
}

#[tokio::test]
async fn matching_state_writes_nothing() {
    let store = MemoryStore::new();
    let deployment = make_deployment(Uuid::new_v4(), vec![Venue::Hyperliquid]);
    let custody = deployment.custody_account.clone();
    store.add_deployment(deployment);

    let auth = Arc::new(StaticAuthorizations::new(false));
    auth.set(&custody, true);

    let summary = reconciler(store.clone(), auth)
        .reconcile_once()
        .await
        .unwrap();
    assert_eq!(summary.checked, 1);
    assert_eq!(summary.drifted, 0);
    assert!(store.audits().is_empty());
}

#[tokio::test]
async fn read_failure_leaves_cache_untouched() {
    let store = MemoryStore::new();
    let deployment = make_deployment(Uuid::new_v4(), vec![Venue::Hyperliquid]);
    let deployment_id = deployment.id;
    store.add_deployment(deployment);

    let summary = reconciler(store.clone(), Arc::new(FailingReader))
        .reconcile_once()
        .await
        .unwrap();
    assert_eq!(summary.checked, 1);
    assert_eq!(summary.read_failures, 1);
    assert_eq!(summary.drifted, 0);

    // Revocation is never assumed from a failed read.
    assert_eq!(store.module_enabled(deployment_id), Some(true));
    assert!(store.audits().is_empty());
}
