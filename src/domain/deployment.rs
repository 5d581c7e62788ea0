use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::Venue;

/// Deployment lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeploymentStatus {
    Active,
    Paused,
    Suspended,
}

impl DeploymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStatus::Active => "ACTIVE",
            DeploymentStatus::Paused => "PAUSED",
            DeploymentStatus::Suspended => "SUSPENDED",
        }
    }
}

impl TryFrom<&str> for DeploymentStatus {
    type Error = String;

    fn try_from(s: &str) -> std::result::Result<Self, Self::Error> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Ok(DeploymentStatus::Active),
            "PAUSED" => Ok(DeploymentStatus::Paused),
            "SUSPENDED" => Ok(DeploymentStatus::Suspended),
            _ => Err(format!("Unknown deployment status: {}", s)),
        }
    }
}

/// A user's binding of an agent's strategy to a funding account.
///
/// `module_enabled` caches the on-chain authorization state; it is
/// mutated only by the reconciler (or an explicit setup flow), never by
/// the dispatch path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub owner_account: String,
    /// The funds-holding account queried for balance and authorization
    pub custody_account: String,
    pub status: DeploymentStatus,
    pub module_enabled: bool,
    pub subscription_active: bool,
    pub enabled_venues: Vec<Venue>,
    /// Per-venue execution-agent identifiers (sub-account ids, API wallets)
    pub venue_agents: HashMap<Venue, String>,
    pub created_at: DateTime<Utc>,
}

impl Deployment {
    /// A deployment can act only while ACTIVE, subscribed, authorized
    /// on-chain, and capable on at least one venue.
    pub fn is_execution_eligible(&self) -> bool {
        self.status == DeploymentStatus::Active
            && self.subscription_active
            && self.module_enabled
            && !self.enabled_venues.is_empty()
    }

    pub fn supports_venue(&self, venue: Venue) -> bool {
        self.enabled_venues.contains(&venue)
    }
}
