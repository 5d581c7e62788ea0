use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::VenueSelector;

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Long => "LONG",
            Side::Short => "SHORT",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for Side {
    type Error = String;

    fn try_from(s: &str) -> std::result::Result<Self, Self::Error> {
        match s.to_uppercase().as_str() {
            "LONG" => Ok(Side::Long),
            "SHORT" => Ok(Side::Short),
            _ => Err(format!("Unknown side: {}", s)),
        }
    }
}

/// How the trade amount is derived for a signal.
///
/// Stored as a tagged JSON column and validated by serde at the store
/// boundary; use sites match on the enum, never on raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SizeModel {
    /// Fixed dollar amount, still clamped to bounds and available balance
    FixedUsd { amount: Decimal },
    /// Percentage of available balance (0-1)
    BalancePercentage { pct: Decimal },
    /// Tiered sizing from the signal's confidence score
    ConfidenceWeighted,
}

/// Risk parameters attached to a signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskModel {
    pub stop_loss_pct: Option<Decimal>,
    pub take_profit_pct: Option<Decimal>,
    #[serde(default = "default_leverage")]
    pub leverage: u8,
}

fn default_leverage() -> u8 {
    1
}

impl Default for RiskModel {
    fn default() -> Self {
        Self {
            stop_loss_pct: None,
            take_profit_pct: None,
            leverage: 1,
        }
    }
}

/// A structured trading intent derived from an external event source.
///
/// Immutable once ingested except the one-way transition
/// `skipped_reason: None -> Some(_)`, enforced at the store layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub requested_venue: VenueSelector,
    pub token_symbol: String,
    pub side: Side,
    /// Classifier confidence, 0-100
    pub confidence: u8,
    pub size_model: SizeModel,
    pub risk_model: RiskModel,
    /// Opaque references to the originating events (tweet ids etc.)
    pub source_evidence: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub skipped_reason: Option<String>,
}

impl Signal {
    pub fn is_pending(&self) -> bool {
        self.skipped_reason.is_none()
    }
}

/// Agent lifecycle status; only ACTIVE agents' signals are dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AgentStatus {
    Active,
    Paused,
    Retired,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Active => "ACTIVE",
            AgentStatus::Paused => "PAUSED",
            AgentStatus::Retired => "RETIRED",
        }
    }
}

impl TryFrom<&str> for AgentStatus {
    type Error = String;

    fn try_from(s: &str) -> std::result::Result<Self, Self::Error> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Ok(AgentStatus::Active),
            "PAUSED" => Ok(AgentStatus::Paused),
            "RETIRED" => Ok(AgentStatus::Retired),
            _ => Err(format!("Unknown agent status: {}", s)),
        }
    }
}

/// The strategy owner a signal belongs to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: Uuid,
    pub name: String,
    pub status: AgentStatus,
}
