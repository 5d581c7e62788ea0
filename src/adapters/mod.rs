pub mod balance;
pub mod chain;

pub use balance::{BalanceSource, StaticBalances, VenueBalanceSource};
pub use chain::{AuthorizationReader, RpcAuthorizationReader, StaticAuthorizations};
