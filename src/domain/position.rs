use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Side, Venue};

/// The record of a filled order.
///
/// The `(deployment_id, signal_id)` pair is unique at the store layer;
/// that constraint, not application logic, is the system's idempotency
/// guarantee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: Uuid,
    pub deployment_id: Uuid,
    pub signal_id: Uuid,
    pub venue: Venue,
    pub token_symbol: String,
    pub side: Side,
    pub qty: Decimal,
    pub entry_price: Decimal,
    /// Transaction reference returned by the venue backend
    pub entry_tx_ref: String,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Position {
    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }

    /// Notional dollar value at entry
    pub fn entry_value(&self) -> Decimal {
        self.qty * self.entry_price
    }
}

/// Outcome of an insert-if-absent position commit.
///
/// `Duplicate` means the uniqueness constraint fired: the trade was
/// already committed by a concurrent run and must be treated as
/// "already executed", not as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Duplicate,
}
