use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Venue;
use crate::config::RoutingDefaults;

/// Routing strategy for MULTI signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoutingStrategy {
    /// Attempt candidates strictly in priority order
    FirstAvailable,
}

impl RoutingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingStrategy::FirstAvailable => "FIRST_AVAILABLE",
        }
    }
}

impl TryFrom<&str> for RoutingStrategy {
    type Error = String;

    fn try_from(s: &str) -> std::result::Result<Self, Self::Error> {
        match s.to_uppercase().as_str() {
            "FIRST_AVAILABLE" => Ok(RoutingStrategy::FirstAvailable),
            _ => Err(format!("Unknown routing strategy: {}", s)),
        }
    }
}

/// Venue priority and failover policy, scoped per agent or global.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueRoutingConfig {
    /// None = the global default row
    pub agent_id: Option<Uuid>,
    pub venue_priority: Vec<Venue>,
    pub strategy: RoutingStrategy,
    pub failover_enabled: bool,
}

impl VenueRoutingConfig {
    /// Hard-coded fallback used when no row matches the agent.
    pub fn fallback(defaults: &RoutingDefaults) -> Self {
        Self {
            agent_id: None,
            venue_priority: defaults.venue_priority.clone(),
            strategy: RoutingStrategy::FirstAvailable,
            failover_enabled: defaults.failover_enabled,
        }
    }
}

/// Outcome of one attempted venue for one signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptOutcome {
    Executed,
    FailedPermanent,
    FailedRetryable,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Executed => "EXECUTED",
            AttemptOutcome::FailedPermanent => "FAILED_PERMANENT",
            AttemptOutcome::FailedRetryable => "FAILED_RETRYABLE",
        }
    }
}

impl TryFrom<&str> for AttemptOutcome {
    type Error = String;

    fn try_from(s: &str) -> std::result::Result<Self, Self::Error> {
        match s.to_uppercase().as_str() {
            "EXECUTED" => Ok(AttemptOutcome::Executed),
            "FAILED_PERMANENT" => Ok(AttemptOutcome::FailedPermanent),
            "FAILED_RETRYABLE" => Ok(AttemptOutcome::FailedRetryable),
            _ => Err(format!("Unknown attempt outcome: {}", s)),
        }
    }
}

/// Append-only audit row: one per attempted venue per signal,
/// written whether the attempt succeeded or failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingAttempt {
    pub signal_id: Uuid,
    pub deployment_id: Uuid,
    pub venue: Venue,
    pub outcome: AttemptOutcome,
    pub detail: Option<String>,
    pub duration_ms: i64,
    pub attempted_at: DateTime<Utc>,
}

/// Authorization drift audit record appended by the reconciler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationAudit {
    pub deployment_id: Uuid,
    pub previous: bool,
    pub new: bool,
    pub observed_at: DateTime<Utc>,
}
