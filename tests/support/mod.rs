//! Shared test doubles: an in-memory store with the same commit
//! guarantees as the Postgres implementation, and a scripted venue
//! backend whose fills and failures are queued per test.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use strada::domain::{
    AgentStatus, AuthorizationAudit, Deployment, DeploymentStatus, InsertOutcome, Position,
    RiskModel, RoutingAttempt, Side, Signal, SizeModel, Venue, VenueRoutingConfig, VenueSelector,
};
use strada::error::{Result, StradaError, VenueError};
use strada::store::DispatchStore;
use strada::venues::{MarketInfo, OrderTicket, VenueExecutionBackend, VenueFill, VenueRegistry};

#[derive(Default)]
struct MemoryInner {
    agents: HashMap<Uuid, AgentStatus>,
    signals: Vec<Signal>,
    deployments: Vec<Deployment>,
    positions: HashMap<(Uuid, Uuid), Position>,
    routing_configs: Vec<VenueRoutingConfig>,
    attempts: Vec<RoutingAttempt>,
    audits: Vec<AuthorizationAudit>,
}

/// In-memory `DispatchStore` mirroring the schema-level guarantees:
/// `(deployment_id, signal_id)` uniqueness on insert and the one-way
/// `skipped_reason` transition.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_agent(&self, agent_id: Uuid, status: AgentStatus) {
        self.lock().agents.insert(agent_id, status);
    }

    pub fn add_signal(&self, signal: Signal) {
        self.lock().signals.push(signal);
    }

    pub fn add_deployment(&self, deployment: Deployment) {
        self.lock().deployments.push(deployment);
    }

    pub fn add_routing_config(&self, config: VenueRoutingConfig) {
        self.lock().routing_configs.push(config);
    }

    pub fn positions(&self) -> Vec<Position> {
        self.lock().positions.values().cloned().collect()
    }

    pub fn positions_for_signal(&self, signal_id: Uuid) -> Vec<Position> {
        self.lock()
            .positions
            .values()
            .filter(|p| p.signal_id == signal_id)
            .cloned()
            .collect()
    }

    pub fn signal(&self, signal_id: Uuid) -> Option<Signal> {
        self.lock()
            .signals
            .iter()
            .find(|s| s.id == signal_id)
            .cloned()
    }

    pub fn attempts(&self) -> Vec<RoutingAttempt> {
        self.lock().attempts.clone()
    }

    pub fn attempts_for_signal(&self, signal_id: Uuid) -> Vec<RoutingAttempt> {
        self.lock()
            .attempts
            .iter()
            .filter(|a| a.signal_id == signal_id)
            .cloned()
            .collect()
    }

    pub fn audits(&self) -> Vec<AuthorizationAudit> {
        self.lock().audits.clone()
    }

    pub fn module_enabled(&self, deployment_id: Uuid) -> Option<bool> {
        self.lock()
            .deployments
            .iter()
            .find(|d| d.id == deployment_id)
            .map(|d| d.module_enabled)
    }
}

#[async_trait]
impl DispatchStore for MemoryStore {
    async fn scan_pending_signals(&self, limit: i64) -> Result<Vec<Signal>> {
        let inner = self.lock();
        // Per-deployment pendency, mirroring the Postgres scan: a signal
        // stays pending while any eligible deployment lacks its position.
        let mut pending: Vec<Signal> = inner
            .signals
            .iter()
            .filter(|s| {
                s.skipped_reason.is_none()
                    && inner
                        .agents
                        .get(&s.agent_id)
                        .map(|status| *status == AgentStatus::Active)
                        .unwrap_or(false)
                    && inner.deployments.iter().any(|d| {
                        d.agent_id == s.agent_id
                            && d.is_execution_eligible()
                            && !inner.positions.contains_key(&(d.id, s.id))
                    })
            })
            .cloned()
            .collect();
        pending.sort_by_key(|s| s.created_at);
        pending.truncate(limit as usize);
        Ok(pending)
    }

    async fn eligible_deployments(&self, agent_id: Uuid) -> Result<Vec<Deployment>> {
        Ok(self
            .lock()
            .deployments
            .iter()
            .filter(|d| d.agent_id == agent_id && d.is_execution_eligible())
            .cloned()
            .collect())
    }

    async fn list_deployments(&self) -> Result<Vec<Deployment>> {
        Ok(self.lock().deployments.clone())
    }

    async fn find_position(
        &self,
        deployment_id: Uuid,
        signal_id: Uuid,
    ) -> Result<Option<Position>> {
        Ok(self.lock().positions.get(&(deployment_id, signal_id)).cloned())
    }

    async fn insert_position(&self, position: &Position) -> Result<InsertOutcome> {
        let mut inner = self.lock();
        let key = (position.deployment_id, position.signal_id);
        if inner.positions.contains_key(&key) {
            return Ok(InsertOutcome::Duplicate);
        }
        inner.positions.insert(key, position.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn mark_signal_skipped(&self, signal_id: Uuid, reason: &str) -> Result<bool> {
        let mut inner = self.lock();
        let signal = inner
            .signals
            .iter_mut()
            .find(|s| s.id == signal_id)
            .ok_or_else(|| StradaError::Validation(format!("unknown signal {signal_id}")))?;
        if signal.skipped_reason.is_some() {
            return Ok(false);
        }
        signal.skipped_reason = Some(reason.to_string());
        Ok(true)
    }

    async fn routing_config(&self, agent_id: Uuid) -> Result<Option<VenueRoutingConfig>> {
        let inner = self.lock();
        let scoped = inner
            .routing_configs
            .iter()
            .find(|c| c.agent_id == Some(agent_id));
        let global = inner.routing_configs.iter().find(|c| c.agent_id.is_none());
        Ok(scoped.or(global).cloned())
    }

    async fn record_routing_attempt(&self, attempt: &RoutingAttempt) -> Result<()> {
        self.lock().attempts.push(attempt.clone());
        Ok(())
    }

    async fn set_module_enabled(&self, deployment_id: Uuid, enabled: bool) -> Result<()> {
        let mut inner = self.lock();
        if let Some(deployment) = inner.deployments.iter_mut().find(|d| d.id == deployment_id) {
            deployment.module_enabled = enabled;
        }
        Ok(())
    }

    async fn record_authorization_audit(&self, audit: &AuthorizationAudit) -> Result<()> {
        self.lock().audits.push(audit.clone());
        Ok(())
    }
}

/// Store double simulating a concurrent worker winning the commit race:
/// the pre-insert lookup sees nothing, but the insert hits the
/// uniqueness constraint.
pub struct LostRaceStore {
    inner: Arc<MemoryStore>,
}

impl LostRaceStore {
    pub fn new(inner: Arc<MemoryStore>) -> Arc<Self> {
        Arc::new(Self { inner })
    }
}

#[async_trait]
impl DispatchStore for LostRaceStore {
    async fn scan_pending_signals(&self, limit: i64) -> Result<Vec<Signal>> {
        self.inner.scan_pending_signals(limit).await
    }

    async fn eligible_deployments(&self, agent_id: Uuid) -> Result<Vec<Deployment>> {
        self.inner.eligible_deployments(agent_id).await
    }

    async fn list_deployments(&self) -> Result<Vec<Deployment>> {
        self.inner.list_deployments().await
    }

    async fn find_position(
        &self,
        _deployment_id: Uuid,
        _signal_id: Uuid,
    ) -> Result<Option<Position>> {
        Ok(None)
    }

    async fn insert_position(&self, _position: &Position) -> Result<InsertOutcome> {
        Ok(InsertOutcome::Duplicate)
    }

    async fn mark_signal_skipped(&self, signal_id: Uuid, reason: &str) -> Result<bool> {
        self.inner.mark_signal_skipped(signal_id, reason).await
    }

    async fn routing_config(&self, agent_id: Uuid) -> Result<Option<VenueRoutingConfig>> {
        self.inner.routing_config(agent_id).await
    }

    async fn record_routing_attempt(&self, attempt: &RoutingAttempt) -> Result<()> {
        self.inner.record_routing_attempt(attempt).await
    }

    async fn set_module_enabled(&self, deployment_id: Uuid, enabled: bool) -> Result<()> {
        self.inner.set_module_enabled(deployment_id, enabled).await
    }

    async fn record_authorization_audit(&self, audit: &AuthorizationAudit) -> Result<()> {
        self.inner.record_authorization_audit(audit).await
    }
}

/// Store double whose deployment resolution fails for one agent,
/// exercising the scanner's per-signal isolation.
pub struct BrokenRelationStore {
    inner: Arc<MemoryStore>,
    failing_agent: Uuid,
}

impl BrokenRelationStore {
    pub fn new(inner: Arc<MemoryStore>, failing_agent: Uuid) -> Arc<Self> {
        Arc::new(Self {
            inner,
            failing_agent,
        })
    }
}

#[async_trait]
impl DispatchStore for BrokenRelationStore {
    async fn scan_pending_signals(&self, limit: i64) -> Result<Vec<Signal>> {
        self.inner.scan_pending_signals(limit).await
    }

    async fn eligible_deployments(&self, agent_id: Uuid) -> Result<Vec<Deployment>> {
        if agent_id == self.failing_agent {
            return Err(StradaError::Validation(format!(
                "dangling deployment relation for agent {agent_id}"
            )));
        }
        self.inner.eligible_deployments(agent_id).await
    }

    async fn list_deployments(&self) -> Result<Vec<Deployment>> {
        self.inner.list_deployments().await
    }

    async fn find_position(
        &self,
        deployment_id: Uuid,
        signal_id: Uuid,
    ) -> Result<Option<Position>> {
        self.inner.find_position(deployment_id, signal_id).await
    }

    async fn insert_position(&self, position: &Position) -> Result<InsertOutcome> {
        self.inner.insert_position(position).await
    }

    async fn mark_signal_skipped(&self, signal_id: Uuid, reason: &str) -> Result<bool> {
        self.inner.mark_signal_skipped(signal_id, reason).await
    }

    async fn routing_config(&self, agent_id: Uuid) -> Result<Option<VenueRoutingConfig>> {
        self.inner.routing_config(agent_id).await
    }

    async fn record_routing_attempt(&self, attempt: &RoutingAttempt) -> Result<()> {
        self.inner.record_routing_attempt(attempt).await
    }

    async fn set_module_enabled(&self, deployment_id: Uuid, enabled: bool) -> Result<()> {
        self.inner.set_module_enabled(deployment_id, enabled).await
    }

    async fn record_authorization_audit(&self, audit: &AuthorizationAudit) -> Result<()> {
        self.inner.record_authorization_audit(audit).await
    }
}

/// Venue backend with queued execute results; an empty queue fills at a
/// fixed price so happy-path tests need no scripting.
pub struct ScriptedVenue {
    venue: Venue,
    markets: Mutex<HashMap<String, MarketInfo>>,
    script: Mutex<VecDeque<std::result::Result<VenueFill, VenueError>>>,
    executed: Mutex<Vec<OrderTicket>>,
    balance: Decimal,
}

impl ScriptedVenue {
    pub fn new(venue: Venue) -> Self {
        Self {
            venue,
            markets: Mutex::new(HashMap::new()),
            script: Mutex::new(VecDeque::new()),
            executed: Mutex::new(Vec::new()),
            balance: dec!(10000),
        }
    }

    pub fn with_market(self, token: &str, min_order_usd: Decimal, tradable: bool) -> Self {
        self.markets.lock().unwrap_or_else(|e| e.into_inner()).insert(
            token.to_string(),
            MarketInfo {
                min_order_usd,
                tradable,
            },
        );
        self
    }

    pub fn with_listing(self, token: &str) -> Self {
        self.with_market(token, dec!(1), true)
    }

    pub fn queue_failure(&self, error: VenueError) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Err(error));
    }

    pub fn queue_fill(&self, fill: VenueFill) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Ok(fill));
    }

    pub fn executed_tickets(&self) -> Vec<OrderTicket> {
        self.executed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn default_fill(&self) -> VenueFill {
        VenueFill {
            tx_ref: format!("{}-{}", self.venue, Uuid::new_v4()),
            filled_qty: dec!(1),
            filled_price: dec!(100),
        }
    }
}

#[async_trait]
impl VenueExecutionBackend for ScriptedVenue {
    fn venue(&self) -> Venue {
        self.venue
    }

    async fn market(&self, token_symbol: &str) -> Result<Option<MarketInfo>> {
        Ok(self
            .markets
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(token_symbol)
            .cloned())
    }

    async fn execute(&self, ticket: &OrderTicket) -> std::result::Result<VenueFill, VenueError> {
        self.executed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(ticket.clone());
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| Ok(self.default_fill()))
    }

    async fn account_balance(&self, _account: &str) -> Result<Decimal> {
        Ok(self.balance)
    }
}

pub fn registry_of(backends: Vec<Arc<ScriptedVenue>>) -> Arc<VenueRegistry> {
    let mut registry = VenueRegistry::new();
    for backend in backends {
        registry.register(backend);
    }
    Arc::new(registry)
}

pub fn make_signal(agent_id: Uuid, token: &str, requested: VenueSelector) -> Signal {
    Signal {
        id: Uuid::new_v4(),
        agent_id,
        requested_venue: requested,
        token_symbol: token.to_string(),
        side: Side::Long,
        confidence: 80,
        size_model: SizeModel::ConfidenceWeighted,
        risk_model: RiskModel {
            stop_loss_pct: Some(dec!(0.05)),
            take_profit_pct: Some(dec!(0.10)),
            leverage: 1,
        },
        source_evidence: vec!["test".to_string()],
        created_at: Utc::now(),
        skipped_reason: None,
    }
}

pub fn make_deployment(agent_id: Uuid, venues: Vec<Venue>) -> Deployment {
    Deployment {
        id: Uuid::new_v4(),
        agent_id,
        owner_account: "0xowner".to_string(),
        custody_account: format!("0xcustody-{}", Uuid::new_v4()),
        status: DeploymentStatus::Active,
        module_enabled: true,
        subscription_active: true,
        enabled_venues: venues,
        venue_agents: HashMap::new(),
        created_at: Utc::now(),
    }
}
