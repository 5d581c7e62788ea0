pub mod postgres;

pub use postgres::PostgresStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    AuthorizationAudit, Deployment, InsertOutcome, Position, RoutingAttempt, Signal,
    VenueRoutingConfig,
};
use crate::error::Result;

/// Persistence seam for the dispatch pipeline.
///
/// `PostgresStore` is the production implementation; tests drive the
/// services through in-memory doubles. The trait carries the store-level
/// guarantees dispatch correctness rests on: `insert_position` is
/// insert-if-absent against the `(deployment_id, signal_id)` unique key,
/// and `mark_signal_skipped` only ever transitions `None -> Some`.
#[async_trait]
pub trait DispatchStore: Send + Sync {
    /// Oldest-first pending signals: not skipped, owning agent ACTIVE,
    /// and at least one eligible deployment without a position yet.
    /// Pendency is per deployment so one deployment's commit never
    /// removes a signal a sibling deployment still has to execute.
    /// Bounded by `limit`.
    async fn scan_pending_signals(&self, limit: i64) -> Result<Vec<Signal>>;

    /// Deployments of an agent that can execute right now (ACTIVE,
    /// subscribed, module enabled, at least one venue).
    async fn eligible_deployments(&self, agent_id: Uuid) -> Result<Vec<Deployment>>;

    /// All deployments regardless of eligibility (reconciler input).
    async fn list_deployments(&self) -> Result<Vec<Deployment>>;

    async fn find_position(
        &self,
        deployment_id: Uuid,
        signal_id: Uuid,
    ) -> Result<Option<Position>>;

    /// The single commit point. A conflicting row yields
    /// `InsertOutcome::Duplicate`, never an error.
    async fn insert_position(&self, position: &Position) -> Result<InsertOutcome>;

    /// One-way transition; returns false when the signal was already
    /// skipped (the stored reason wins).
    async fn mark_signal_skipped(&self, signal_id: Uuid, reason: &str) -> Result<bool>;

    /// Agent-scoped routing config, falling back to the global row.
    /// `None` means no row at all; callers apply the hard-coded default.
    async fn routing_config(&self, agent_id: Uuid) -> Result<Option<VenueRoutingConfig>>;

    async fn record_routing_attempt(&self, attempt: &RoutingAttempt) -> Result<()>;

    /// Reconciler-only write to the cached on-chain authorization flag.
    async fn set_module_enabled(&self, deployment_id: Uuid, enabled: bool) -> Result<()>;

    async fn record_authorization_audit(&self, audit: &AuthorizationAudit) -> Result<()>;
}
