use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::{
    AgentStatus, AuthorizationAudit, Deployment, DeploymentStatus, InsertOutcome, Position,
    RiskModel, RoutingAttempt, RoutingStrategy, Side, Signal, SizeModel, Venue,
    VenueRoutingConfig, VenueSelector,
};
use crate::error::{Result, StradaError};

use super::DispatchStore;

/// PostgreSQL storage adapter
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Create a store from an existing connection pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn map_signal(row: &PgRow) -> Result<Signal> {
        let requested_venue: String = row.get("requested_venue");
        let side: String = row.get("side");
        let size_model: serde_json::Value = row.get("size_model");
        let risk_model: serde_json::Value = row.get("risk_model");

        Ok(Signal {
            id: row.get("id"),
            agent_id: row.get("agent_id"),
            requested_venue: VenueSelector::from_str(&requested_venue)
                .map_err(|e| StradaError::Validation(format!("requested_venue: {e}")))?,
            token_symbol: row.get("token_symbol"),
            side: Side::try_from(side.as_str()).map_err(StradaError::Validation)?,
            confidence: row.get::<i16, _>("confidence").clamp(0, 100) as u8,
            size_model: serde_json::from_value::<SizeModel>(size_model)?,
            risk_model: serde_json::from_value::<RiskModel>(risk_model)?,
            source_evidence: row.get("source_evidence"),
            created_at: row.get("created_at"),
            skipped_reason: row.get("skipped_reason"),
        })
    }

    fn map_deployment(row: &PgRow) -> Result<Deployment> {
        let status: String = row.get("status");
        let enabled_venues: Vec<String> = row.get("enabled_venues");
        let venue_agents: serde_json::Value = row.get("venue_agents");

        let enabled_venues = enabled_venues
            .iter()
            .filter_map(|raw| match Venue::from_str(raw) {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(venue = %raw, "Ignoring unknown venue tag on deployment");
                    None
                }
            })
            .collect();

        let venue_agents: HashMap<Venue, String> =
            serde_json::from_value::<HashMap<String, String>>(venue_agents)?
                .into_iter()
                .filter_map(|(k, v)| Venue::from_str(&k).ok().map(|venue| (venue, v)))
                .collect();

        Ok(Deployment {
            id: row.get("id"),
            agent_id: row.get("agent_id"),
            owner_account: row.get("owner_account"),
            custody_account: row.get("custody_account"),
            status: DeploymentStatus::try_from(status.as_str()).map_err(StradaError::Validation)?,
            module_enabled: row.get("module_enabled"),
            subscription_active: row.get("subscription_active"),
            enabled_venues,
            venue_agents,
            created_at: row.get("created_at"),
        })
    }

    fn map_position(row: &PgRow) -> Result<Position> {
        let venue: String = row.get("venue");
        let side: String = row.get("side");

        Ok(Position {
            id: row.get("id"),
            deployment_id: row.get("deployment_id"),
            signal_id: row.get("signal_id"),
            venue: Venue::from_str(&venue)
                .map_err(|e| StradaError::Validation(format!("venue: {e}")))?,
            token_symbol: row.get("token_symbol"),
            side: Side::try_from(side.as_str()).map_err(StradaError::Validation)?,
            qty: row.get("qty"),
            entry_price: row.get("entry_price"),
            entry_tx_ref: row.get("entry_tx_ref"),
            stop_loss: row.get("stop_loss"),
            take_profit: row.get("take_profit"),
            opened_at: row.get("opened_at"),
            closed_at: row.get("closed_at"),
        })
    }
}

#[async_trait]
impl DispatchStore for PostgresStore {
    #[instrument(skip(self))]
    async fn scan_pending_signals(&self, limit: i64) -> Result<Vec<Signal>> {
        // Pendency is per deployment: a signal stays scannable while any
        // eligible deployment still lacks its position, so a sibling's
        // commit never starves a deployment whose attempt failed
        // retryably.
        let rows = sqlx::query(
            r#"
            SELECT s.id, s.agent_id, s.requested_venue, s.token_symbol, s.side,
                   s.confidence, s.size_model, s.risk_model, s.source_evidence,
                   s.created_at, s.skipped_reason
            FROM signals s
            JOIN agents a ON a.id = s.agent_id
            WHERE s.skipped_reason IS NULL
              AND a.status = $1
              AND EXISTS (
                  SELECT 1 FROM deployments d
                  WHERE d.agent_id = s.agent_id
                    AND d.status = $2
                    AND d.subscription_active
                    AND d.module_enabled
                    AND cardinality(d.enabled_venues) > 0
                    AND NOT EXISTS (
                        SELECT 1 FROM positions p
                        WHERE p.deployment_id = d.id AND p.signal_id = s.id
                    )
              )
            ORDER BY s.created_at ASC
            LIMIT $3
            "#,
        )
        .bind(AgentStatus::Active.as_str())
        .bind(DeploymentStatus::Active.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        // A malformed row is logged and dropped from this batch rather
        // than failing the whole scan.
        let mut signals = Vec::with_capacity(rows.len());
        for row in &rows {
            match Self::map_signal(row) {
                Ok(signal) => signals.push(signal),
                Err(e) => {
                    let id: Uuid = row.get("id");
                    warn!(signal_id = %id, error = %e, "Skipping unreadable signal row");
                }
            }
        }

        Ok(signals)
    }

    async fn eligible_deployments(&self, agent_id: Uuid) -> Result<Vec<Deployment>> {
        let rows = sqlx::query(
            r#"
            SELECT id, agent_id, owner_account, custody_account, status,
                   module_enabled, subscription_active, enabled_venues,
                   venue_agents, created_at
            FROM deployments
            WHERE agent_id = $1
              AND status = $2
              AND subscription_active
              AND module_enabled
              AND cardinality(enabled_venues) > 0
            ORDER BY created_at ASC
            "#,
        )
        .bind(agent_id)
        .bind(DeploymentStatus::Active.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::map_deployment).collect()
    }

    async fn list_deployments(&self) -> Result<Vec<Deployment>> {
        let rows = sqlx::query(
            r#"
            SELECT id, agent_id, owner_account, custody_account, status,
                   module_enabled, subscription_active, enabled_venues,
                   venue_agents, created_at
            FROM deployments
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::map_deployment).collect()
    }

    async fn find_position(
        &self,
        deployment_id: Uuid,
        signal_id: Uuid,
    ) -> Result<Option<Position>> {
        let row = sqlx::query(
            r#"
            SELECT id, deployment_id, signal_id, venue, token_symbol, side,
                   qty, entry_price, entry_tx_ref, stop_loss, take_profit,
                   opened_at, closed_at
            FROM positions
            WHERE deployment_id = $1 AND signal_id = $2
            "#,
        )
        .bind(deployment_id)
        .bind(signal_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::map_position).transpose()
    }

    #[instrument(skip(self, position), fields(deployment_id = %position.deployment_id, signal_id = %position.signal_id))]
    async fn insert_position(&self, position: &Position) -> Result<InsertOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO positions (
                id, deployment_id, signal_id, venue, token_symbol, side,
                qty, entry_price, entry_tx_ref, stop_loss, take_profit,
                opened_at, closed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (deployment_id, signal_id) DO NOTHING
            "#,
        )
        .bind(position.id)
        .bind(position.deployment_id)
        .bind(position.signal_id)
        .bind(position.venue.as_str())
        .bind(&position.token_symbol)
        .bind(position.side.as_str())
        .bind(position.qty)
        .bind(position.entry_price)
        .bind(&position.entry_tx_ref)
        .bind(position.stop_loss)
        .bind(position.take_profit)
        .bind(position.opened_at)
        .bind(position.closed_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            Ok(InsertOutcome::Duplicate)
        } else {
            Ok(InsertOutcome::Inserted)
        }
    }

    async fn mark_signal_skipped(&self, signal_id: Uuid, reason: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE signals SET skipped_reason = $1
            WHERE id = $2 AND skipped_reason IS NULL
            "#,
        )
        .bind(reason)
        .bind(signal_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn routing_config(&self, agent_id: Uuid) -> Result<Option<VenueRoutingConfig>> {
        // Agent-scoped row wins over the global (NULL agent) default row.
        let row = sqlx::query(
            r#"
            SELECT agent_id, venue_priority, strategy, failover_enabled
            FROM venue_routing_configs
            WHERE agent_id = $1 OR agent_id IS NULL
            ORDER BY agent_id NULLS LAST
            LIMIT 1
            "#,
        )
        .bind(agent_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            let strategy: String = r.get("strategy");
            let venue_priority: Vec<String> = r.get("venue_priority");
            Ok(VenueRoutingConfig {
                agent_id: r.get("agent_id"),
                venue_priority: venue_priority
                    .iter()
                    .filter_map(|raw| Venue::from_str(raw).ok())
                    .collect(),
                strategy: RoutingStrategy::try_from(strategy.as_str())
                    .map_err(StradaError::Validation)?,
                failover_enabled: r.get("failover_enabled"),
            })
        })
        .transpose()
    }

    async fn record_routing_attempt(&self, attempt: &RoutingAttempt) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO venue_routing_history (
                signal_id, deployment_id, venue, outcome, detail,
                duration_ms, attempted_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(attempt.signal_id)
        .bind(attempt.deployment_id)
        .bind(attempt.venue.as_str())
        .bind(attempt.outcome.as_str())
        .bind(&attempt.detail)
        .bind(attempt.duration_ms)
        .bind(attempt.attempted_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_module_enabled(&self, deployment_id: Uuid, enabled: bool) -> Result<()> {
        sqlx::query("UPDATE deployments SET module_enabled = $1 WHERE id = $2")
            .bind(enabled)
            .bind(deployment_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn record_authorization_audit(&self, audit: &AuthorizationAudit) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO authorization_audit (deployment_id, previous_enabled, new_enabled, observed_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(audit.deployment_id)
        .bind(audit.previous)
        .bind(audit.new)
        .bind(audit.observed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
