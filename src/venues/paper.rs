use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::info;
use uuid::Uuid;

use crate::domain::Venue;
use crate::error::{Result, VenueError};

use super::{MarketInfo, OrderTicket, VenueExecutionBackend, VenueFill};

/// Dry-run backend: fills every order against a synthetic market.
///
/// Used when `venues.dry_run` is set and as the harness backend in tests.
/// Fill prices are deterministic per token so repeated runs are comparable.
#[derive(Clone)]
pub struct PaperVenue {
    venue: Venue,
    tokens: Vec<String>,
    min_order_usd: Decimal,
    account_balance: Decimal,
}

impl PaperVenue {
    pub fn new(tokens: Vec<String>) -> Self {
        Self {
            venue: Venue::Paper,
            tokens,
            min_order_usd: dec!(1),
            account_balance: dec!(10000),
        }
    }

    /// Re-tag this backend as another venue (dry-run registry fills
    /// every slot with paper).
    pub fn with_venue(self, venue: Venue) -> Self {
        Self { venue, ..self }
    }

    fn mark_price(token_symbol: &str) -> Decimal {
        // Stable pseudo-price derived from the symbol bytes
        let seed: u32 = token_symbol.bytes().map(u32::from).sum();
        Decimal::from(seed % 900 + 100)
    }
}

#[async_trait]
impl VenueExecutionBackend for PaperVenue {
    fn venue(&self) -> Venue {
        self.venue
    }

    async fn market(&self, token_symbol: &str) -> Result<Option<MarketInfo>> {
        if self.tokens.iter().any(|t| t.eq_ignore_ascii_case(token_symbol)) {
            Ok(Some(MarketInfo {
                min_order_usd: self.min_order_usd,
                tradable: true,
            }))
        } else {
            Ok(None)
        }
    }

    async fn execute(&self, ticket: &OrderTicket) -> std::result::Result<VenueFill, VenueError> {
        if !self
            .tokens
            .iter()
            .any(|t| t.eq_ignore_ascii_case(&ticket.token_symbol))
        {
            return Err(VenueError::UnsupportedToken {
                token: ticket.token_symbol.clone(),
            });
        }

        if ticket.size_usd < self.min_order_usd {
            return Err(VenueError::BelowMinimum {
                requested: ticket.size_usd,
                minimum: self.min_order_usd,
            });
        }

        let price = Self::mark_price(&ticket.token_symbol);
        let fill = VenueFill {
            tx_ref: format!("paper-{}", Uuid::new_v4().simple()),
            filled_qty: ticket.size_usd / price,
            filled_price: price,
        };

        info!(
            venue = %self.venue,
            token = %ticket.token_symbol,
            size_usd = %ticket.size_usd,
            price = %fill.filled_price,
            "Paper fill"
        );

        Ok(fill)
    }

    async fn account_balance(&self, _account: &str) -> Result<Decimal> {
        Ok(self.account_balance)
    }
}
