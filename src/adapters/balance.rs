use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::Venue;
use crate::error::{Result, StradaError};
use crate::venues::VenueRegistry;

/// Read-only balance lookup for a custody account
#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn available_balance(&self, account: &str) -> Result<Decimal>;
}

/// Fixed balances, for dry-run mode and tests
#[derive(Debug, Clone, Default)]
pub struct StaticBalances {
    balances: HashMap<String, Decimal>,
    fallback: Decimal,
}

impl StaticBalances {
    pub fn new(fallback: Decimal) -> Self {
        Self {
            balances: HashMap::new(),
            fallback,
        }
    }

    pub fn with_balance(mut self, account: &str, balance: Decimal) -> Self {
        self.balances.insert(account.to_string(), balance);
        self
    }
}

#[async_trait]
impl BalanceSource for StaticBalances {
    async fn available_balance(&self, account: &str) -> Result<Decimal> {
        Ok(self.balances.get(account).copied().unwrap_or(self.fallback))
    }
}

/// Balance lookup delegated to a venue's account endpoint.
///
/// The custody account's spendable balance lives venue-side; we query the
/// primary venue's market/account API rather than walking chain state.
pub struct VenueBalanceSource {
    registry: Arc<VenueRegistry>,
    primary: Venue,
}

impl VenueBalanceSource {
    pub fn new(registry: Arc<VenueRegistry>, primary: Venue) -> Self {
        Self { registry, primary }
    }
}

#[async_trait]
impl BalanceSource for VenueBalanceSource {
    async fn available_balance(&self, account: &str) -> Result<Decimal> {
        let backend = self.registry.get(self.primary).ok_or_else(|| {
            StradaError::Internal(format!(
                "no backend registered for primary venue {}",
                self.primary
            ))
        })?;
        backend.account_balance(account).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::venues::traits::MockVenueExecutionBackend;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn static_balances_fall_back() {
        let balances = StaticBalances::new(dec!(100)).with_balance("0xabc", dec!(250));
        assert_eq!(balances.available_balance("0xabc").await.unwrap(), dec!(250));
        assert_eq!(balances.available_balance("0xdef").await.unwrap(), dec!(100));
    }

    #[tokio::test]
    async fn delegates_to_primary_backend() {
        let mut backend = MockVenueExecutionBackend::new();
        backend.expect_venue().return_const(Venue::Hyperliquid);
        backend
            .expect_account_balance()
            .withf(|account| account == "0xabc")
            .returning(|_| Ok(dec!(321)));

        let mut registry = VenueRegistry::new();
        registry.register(Arc::new(backend));

        let source = VenueBalanceSource::new(Arc::new(registry), Venue::Hyperliquid);
        assert_eq!(source.available_balance("0xabc").await.unwrap(), dec!(321));
    }

    #[tokio::test]
    async fn missing_primary_backend_is_an_error() {
        let source = VenueBalanceSource::new(Arc::new(VenueRegistry::new()), Venue::Jupiter);
        assert!(source.available_balance("0xabc").await.is_err());
    }
}
