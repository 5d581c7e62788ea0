use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Side, Venue};
use crate::error::{Result, StradaError, VenueError};

/// Everything a backend needs to fill one order for one deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderTicket {
    pub deployment_id: Uuid,
    pub signal_id: Uuid,
    /// Venue-specific execution agent for the deployment, when one exists
    pub venue_agent: Option<String>,
    pub token_symbol: String,
    pub side: Side,
    /// Trade size in USD notional
    pub size_usd: Decimal,
    pub leverage: u8,
    pub slippage_bps: u32,
}

/// Typed result of a filled order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueFill {
    pub tx_ref: String,
    pub filled_qty: Decimal,
    pub filled_price: Decimal,
}

/// Market metadata used for routing and precondition checks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketInfo {
    pub min_order_usd: Decimal,
    pub tradable: bool,
}

/// Opaque order-filling interface, one implementation per venue.
///
/// `execute` failures carry the retryable/permanent classification the
/// dispatcher's failover logic depends on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VenueExecutionBackend: Send + Sync {
    fn venue(&self) -> Venue;

    /// Market lookup for a token; `None` means the venue lists no such
    /// market at all.
    async fn market(&self, token_symbol: &str) -> Result<Option<MarketInfo>>;

    async fn execute(&self, ticket: &OrderTicket) -> std::result::Result<VenueFill, VenueError>;

    /// Spendable balance of a custody account on this venue. Venues
    /// without an account API keep the default.
    async fn account_balance(&self, _account: &str) -> Result<Decimal> {
        Err(StradaError::Validation(format!(
            "account_balance is not implemented for venue '{}'",
            self.venue()
        )))
    }
}
