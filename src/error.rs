use thiserror::Error;

/// Main error type for the dispatch engine
#[derive(Error, Debug)]
pub enum StradaError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Validation errors (malformed signal/deployment data -- permanent)
    #[error("Validation failed: {0}")]
    Validation(String),

    // On-chain authorization read errors
    #[error("Authorization read failed for {account}: {reason}")]
    AuthorizationRead { account: String, reason: String },

    // Venue execution errors
    #[error("Venue error: {0}")]
    Venue(#[from] VenueError),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for StradaError
pub type Result<T> = std::result::Result<T, StradaError>;

/// Typed failures returned by venue execution backends.
///
/// The retryable/permanent split drives failover: a permanent failure
/// advances the dispatcher to the next candidate venue, a retryable one
/// leaves the signal pending for a future scan cycle.
#[derive(Error, Debug, Clone)]
pub enum VenueError {
    #[error("Token not supported: {token}")]
    UnsupportedToken { token: String },

    #[error("Market unavailable: {0}")]
    MarketUnavailable(String),

    #[error("Order below venue minimum: requested ${requested}, minimum ${minimum}")]
    BelowMinimum {
        requested: rust_decimal::Decimal,
        minimum: rust_decimal::Decimal,
    },

    #[error("Order rejected: {0}")]
    Rejected(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Timeout after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("Network error: {0}")]
    Network(String),
}

impl VenueError {
    /// Retryable failures are retried on a future scan cycle; permanent
    /// failures trigger failover to the next candidate venue.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            VenueError::RateLimited(_) | VenueError::Timeout { .. } | VenueError::Network(_)
        )
    }

    pub fn is_permanent(&self) -> bool {
        !self.is_retryable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn permanent_and_retryable_split() {
        assert!(VenueError::Timeout { elapsed_ms: 5000 }.is_retryable());
        assert!(VenueError::RateLimited("429".into()).is_retryable());
        assert!(VenueError::Network("connection reset".into()).is_retryable());

        assert!(VenueError::MarketUnavailable("closed".into()).is_permanent());
        assert!(VenueError::UnsupportedToken { token: "BTC".into() }.is_permanent());
        assert!(VenueError::BelowMinimum {
            requested: dec!(5),
            minimum: dec!(10)
        }
        .is_permanent());
        assert!(VenueError::Rejected("bad order".into()).is_permanent());
    }
}
