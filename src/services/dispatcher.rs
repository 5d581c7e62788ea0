//! Execution dispatcher.
//!
//! Drives scanner -> sizer -> router -> venue backend -> store commit for
//! one tick. The position insert is the single commit point; everything
//! before it can fail or repeat without lasting effect, and the store's
//! uniqueness constraint on (deployment_id, signal_id) is the final
//! authority under concurrent workers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::BalanceSource;
use crate::config::{DispatchConfig, RoutingDefaults, SizingConfig};
use crate::domain::{
    AttemptOutcome, Deployment, InsertOutcome, Position, RoutingAttempt, Side, Signal, Venue,
    VenueRoutingConfig,
};
use crate::error::{Result, VenueError};
use crate::services::{router::VenueRouter, scanner::EligibilityScanner, sizer};
use crate::store::DispatchStore;
use crate::venues::{OrderTicket, VenueRegistry};

/// Tick result returned by the admin trigger
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub executed: u64,
    pub failed: u64,
    pub skipped: u64,
}

/// Outcome of one (signal, deployment) unit of work
#[derive(Debug, Clone)]
enum UnitOutcome {
    Executed,
    /// Idempotency check or duplicate insert: the work was already done
    AlreadyExecuted,
    /// Permanent: contributes to the signal's skipped_reason
    SkippedPermanent(String),
    /// Retryable: the signal stays pending for a future tick
    FailedRetryable(String),
}

pub struct ExecutionDispatcher {
    store: Arc<dyn DispatchStore>,
    registry: Arc<VenueRegistry>,
    balances: Arc<dyn BalanceSource>,
    scanner: EligibilityScanner,
    router: VenueRouter,
    sizing: SizingConfig,
    routing_defaults: RoutingDefaults,
    execution_timeout: Duration,
    slippage_bps: u32,
}

impl ExecutionDispatcher {
    pub fn new(
        store: Arc<dyn DispatchStore>,
        registry: Arc<VenueRegistry>,
        balances: Arc<dyn BalanceSource>,
        dispatch: &DispatchConfig,
        sizing: SizingConfig,
        routing_defaults: RoutingDefaults,
    ) -> Self {
        let scanner = EligibilityScanner::new(store.clone(), dispatch.batch_size);
        let router = VenueRouter::new(registry.clone());
        Self {
            store,
            registry,
            balances,
            scanner,
            router,
            sizing,
            routing_defaults,
            execution_timeout: Duration::from_millis(dispatch.execution_timeout_ms),
            slippage_bps: dispatch.slippage_bps,
        }
    }

    /// Process one bounded batch of pending signals.
    ///
    /// Per-unit failures are folded into the summary; only the initial
    /// scan (total store unavailability) aborts the tick.
    #[instrument(skip(self))]
    pub async fn process_pending(&self) -> Result<DispatchSummary> {
        let batch = self.scanner.scan().await?;
        let mut summary = DispatchSummary::default();

        for eligible in batch {
            self.process_signal(&eligible.signal, &eligible.deployments, &mut summary)
                .await;
        }

        info!(
            executed = summary.executed,
            failed = summary.failed,
            skipped = summary.skipped,
            "Dispatch tick complete"
        );
        Ok(summary)
    }

    async fn process_signal(
        &self,
        signal: &Signal,
        deployments: &[Deployment],
        summary: &mut DispatchSummary,
    ) {
        let routing_config = match self.store.routing_config(signal.agent_id).await {
            Ok(Some(config)) => config,
            Ok(None) => VenueRoutingConfig::fallback(&self.routing_defaults),
            Err(e) => {
                warn!(signal_id = %signal.id, error = %e, "Routing config lookup failed");
                summary.failed += 1;
                return;
            }
        };

        let mut outcomes = Vec::with_capacity(deployments.len());
        for deployment in deployments {
            let outcome = self
                .process_deployment(signal, deployment, &routing_config)
                .await;
            match &outcome {
                UnitOutcome::Executed => summary.executed += 1,
                UnitOutcome::AlreadyExecuted => summary.skipped += 1,
                UnitOutcome::SkippedPermanent(reason) => {
                    debug!(signal_id = %signal.id, deployment_id = %deployment.id, %reason, "Unit skipped");
                    summary.skipped += 1;
                }
                UnitOutcome::FailedRetryable(reason) => {
                    debug!(signal_id = %signal.id, deployment_id = %deployment.id, %reason, "Unit failed, will retry");
                    summary.failed += 1;
                }
            }
            outcomes.push(outcome);
        }

        // A signal is skipped for good only when this tick produced
        // outcomes, none executed, and every failure was permanent; any
        // retryable outcome leaves it pending for the next tick.
        let any_progress = outcomes
            .iter()
            .any(|o| matches!(o, UnitOutcome::Executed | UnitOutcome::AlreadyExecuted));
        let all_permanent = !outcomes.is_empty()
            && outcomes
                .iter()
                .all(|o| matches!(o, UnitOutcome::SkippedPermanent(_)));

        if !any_progress && all_permanent {
            let reason = outcomes
                .iter()
                .find_map(|o| match o {
                    UnitOutcome::SkippedPermanent(reason) => Some(reason.clone()),
                    _ => None,
                })
                .unwrap_or_else(|| "no executable deployment".to_string());

            match self.store.mark_signal_skipped(signal.id, &reason).await {
                Ok(true) => info!(signal_id = %signal.id, %reason, "Signal skipped"),
                Ok(false) => debug!(signal_id = %signal.id, "Signal was already skipped"),
                Err(e) => warn!(signal_id = %signal.id, error = %e, "Failed to mark signal skipped"),
            }
        }
    }

    async fn process_deployment(
        &self,
        signal: &Signal,
        deployment: &Deployment,
        routing_config: &VenueRoutingConfig,
    ) -> UnitOutcome {
        // Idempotency re-check right before acting; concurrent workers
        // may have committed since the scan.
        match self.store.find_position(deployment.id, signal.id).await {
            Ok(Some(_)) => return UnitOutcome::AlreadyExecuted,
            Ok(None) => {}
            Err(e) => return UnitOutcome::FailedRetryable(format!("position lookup: {e}")),
        }

        let balance = match self
            .balances
            .available_balance(&deployment.custody_account)
            .await
        {
            Ok(balance) => balance,
            Err(e) => return UnitOutcome::FailedRetryable(format!("balance lookup: {e}")),
        };

        let sizing = sizer::size_for_model(balance, signal.confidence, &signal.size_model, &self.sizing);
        debug!(
            signal_id = %signal.id,
            deployment_id = %deployment.id,
            amount = %sizing.amount,
            tier = sizing.tier.as_str(),
            reasoning = ?sizing.reasoning,
            "Sized trade"
        );
        if !sizing.is_tradable() {
            return UnitOutcome::SkippedPermanent(sizer::BELOW_MINIMUM_REASON.to_string());
        }

        let candidates = match self.router.route(signal, deployment, routing_config).await {
            Ok(candidates) => candidates,
            Err(e) => return UnitOutcome::FailedRetryable(format!("routing: {e}")),
        };
        if candidates.is_empty() {
            return UnitOutcome::SkippedPermanent(format!(
                "No venue available for token {}",
                signal.token_symbol
            ));
        }

        for venue in candidates {
            match self
                .attempt_venue(signal, deployment, venue, sizing.amount)
                .await
            {
                VenueAttempt::Committed => return UnitOutcome::Executed,
                VenueAttempt::Duplicate => return UnitOutcome::AlreadyExecuted,
                VenueAttempt::Retryable(reason) => {
                    // Retryable failures never fail over; the signal is
                    // simply retried on a future scan cycle.
                    return UnitOutcome::FailedRetryable(reason);
                }
                VenueAttempt::Permanent(reason) => {
                    if !routing_config.failover_enabled {
                        return UnitOutcome::SkippedPermanent(reason);
                    }
                    // Failover: advance to the next candidate.
                }
            }
        }

        UnitOutcome::SkippedPermanent(format!(
            "No venue available for token {}",
            signal.token_symbol
        ))
    }

    /// One venue attempt: preconditions, execute with timeout, history
    /// row, and (on success) the position commit.
    async fn attempt_venue(
        &self,
        signal: &Signal,
        deployment: &Deployment,
        venue: Venue,
        size_usd: Decimal,
    ) -> VenueAttempt {
        let Some(backend) = self.registry.get(venue) else {
            return VenueAttempt::Permanent(format!("no backend registered for {venue}"));
        };

        let started = Instant::now();

        // Precondition validation: tradable market, venue minimum.
        match backend.market(&signal.token_symbol).await {
            Ok(Some(market)) if market.tradable => {
                if size_usd < market.min_order_usd {
                    let reason = format!(
                        "below venue minimum on {venue}: ${size_usd} < ${}",
                        market.min_order_usd
                    );
                    self.record_attempt(
                        signal,
                        deployment,
                        venue,
                        AttemptOutcome::FailedPermanent,
                        Some(reason.clone()),
                        started,
                    )
                    .await;
                    return VenueAttempt::Permanent(reason);
                }
            }
            Ok(_) => {
                let reason = format!("market unavailable on {venue}");
                self.record_attempt(
                    signal,
                    deployment,
                    venue,
                    AttemptOutcome::FailedPermanent,
                    Some(reason.clone()),
                    started,
                )
                .await;
                return VenueAttempt::Permanent(reason);
            }
            Err(e) => {
                let reason = format!("market lookup on {venue}: {e}");
                self.record_attempt(
                    signal,
                    deployment,
                    venue,
                    AttemptOutcome::FailedRetryable,
                    Some(reason.clone()),
                    started,
                )
                .await;
                return VenueAttempt::Retryable(reason);
            }
        }

        let ticket = OrderTicket {
            deployment_id: deployment.id,
            signal_id: signal.id,
            venue_agent: deployment.venue_agents.get(&venue).cloned(),
            token_symbol: signal.token_symbol.clone(),
            side: signal.side,
            size_usd,
            leverage: signal.risk_model.leverage,
            slippage_bps: self.slippage_bps,
        };

        let result = tokio::time::timeout(self.execution_timeout, backend.execute(&ticket)).await;

        let fill = match result {
            Ok(Ok(fill)) => fill,
            Ok(Err(err)) => {
                let outcome = if err.is_retryable() {
                    AttemptOutcome::FailedRetryable
                } else {
                    AttemptOutcome::FailedPermanent
                };
                self.record_attempt(signal, deployment, venue, outcome, Some(err.to_string()), started)
                    .await;
                return if err.is_retryable() {
                    VenueAttempt::Retryable(err.to_string())
                } else {
                    VenueAttempt::Permanent(err.to_string())
                };
            }
            Err(_) => {
                // A stuck call converts to a retryable failure instead of
                // stalling the batch.
                let err = VenueError::Timeout {
                    elapsed_ms: self.execution_timeout.as_millis() as u64,
                };
                self.record_attempt(
                    signal,
                    deployment,
                    venue,
                    AttemptOutcome::FailedRetryable,
                    Some(err.to_string()),
                    started,
                )
                .await;
                return VenueAttempt::Retryable(err.to_string());
            }
        };

        self.record_attempt(signal, deployment, venue, AttemptOutcome::Executed, None, started)
            .await;

        let position = build_position(signal, deployment, venue, &fill);
        match self.store.insert_position(&position).await {
            Ok(InsertOutcome::Inserted) => {
                info!(
                    signal_id = %signal.id,
                    deployment_id = %deployment.id,
                    venue = %venue,
                    qty = %position.qty,
                    entry_price = %position.entry_price,
                    tx_ref = %position.entry_tx_ref,
                    "Position committed"
                );
                VenueAttempt::Committed
            }
            Ok(InsertOutcome::Duplicate) => {
                // The uniqueness constraint fired: a concurrent run won
                // the race. Already executed, not an error.
                warn!(
                    signal_id = %signal.id,
                    deployment_id = %deployment.id,
                    "Duplicate position insert; treating as already executed"
                );
                VenueAttempt::Duplicate
            }
            Err(e) => {
                // The venue filled but the commit failed; surface loudly
                // and retry next tick, where the idempotency re-check
                // and the constraint prevent a double fill from our side.
                warn!(
                    signal_id = %signal.id,
                    deployment_id = %deployment.id,
                    error = %e,
                    "Position commit failed after fill"
                );
                VenueAttempt::Retryable(format!("position commit: {e}"))
            }
        }
    }

    async fn record_attempt(
        &self,
        signal: &Signal,
        deployment: &Deployment,
        venue: Venue,
        outcome: AttemptOutcome,
        detail: Option<String>,
        started: Instant,
    ) {
        let attempt = RoutingAttempt {
            signal_id: signal.id,
            deployment_id: deployment.id,
            venue,
            outcome,
            detail,
            duration_ms: started.elapsed().as_millis() as i64,
            attempted_at: Utc::now(),
        };

        // History is best-effort audit; a write failure must not change
        // the dispatch outcome.
        if let Err(e) = self.store.record_routing_attempt(&attempt).await {
            warn!(signal_id = %signal.id, venue = %venue, error = %e, "Failed to record routing attempt");
        }
    }
}

enum VenueAttempt {
    Committed,
    Duplicate,
    Permanent(String),
    Retryable(String),
}

fn build_position(
    signal: &Signal,
    deployment: &Deployment,
    venue: Venue,
    fill: &crate::venues::VenueFill,
) -> Position {
    let (stop_loss, take_profit) = risk_prices(signal, fill.filled_price);
    Position {
        id: Uuid::new_v4(),
        deployment_id: deployment.id,
        signal_id: signal.id,
        venue,
        token_symbol: signal.token_symbol.clone(),
        side: signal.side,
        qty: fill.filled_qty,
        entry_price: fill.filled_price,
        entry_tx_ref: fill.tx_ref.clone(),
        stop_loss,
        take_profit,
        opened_at: Utc::now(),
        closed_at: None,
    }
}

/// Absolute stop/take prices from the signal's percentage risk model
fn risk_prices(signal: &Signal, entry_price: Decimal) -> (Option<Decimal>, Option<Decimal>) {
    let direction = match signal.side {
        Side::Long => Decimal::ONE,
        Side::Short => Decimal::NEGATIVE_ONE,
    };
    let stop_loss = signal
        .risk_model
        .stop_loss_pct
        .map(|pct| entry_price * (Decimal::ONE - direction * pct));
    let take_profit = signal
        .risk_model
        .take_profit_pct
        .map(|pct| entry_price * (Decimal::ONE + direction * pct));
    (stop_loss, take_profit)
}
