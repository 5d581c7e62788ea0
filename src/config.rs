use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;

use crate::domain::Venue;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub sizing: SizingConfig,
    #[serde(default)]
    pub routing: RoutingDefaults,
    #[serde(default)]
    pub reconciler: ReconcilerConfig,
    #[serde(default)]
    pub venues: VenuesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Seconds between dispatch ticks
    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,
    /// Maximum signals pulled per tick
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,
    /// Timeout for a single venue execution call (milliseconds)
    #[serde(default = "default_execution_timeout")]
    pub execution_timeout_ms: u64,
    /// Slippage tolerance passed to venues, in basis points
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: u32,
}

fn default_scan_interval() -> u64 {
    15
}

fn default_batch_size() -> i64 {
    20
}

fn default_execution_timeout() -> u64 {
    10_000
}

fn default_slippage_bps() -> u32 {
    50
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: default_scan_interval(),
            batch_size: default_batch_size(),
            execution_timeout_ms: default_execution_timeout(),
            slippage_bps: default_slippage_bps(),
        }
    }
}

/// Position sizing parameters.
///
/// Confidence tiers use inclusive lower bounds: `>= high_confidence` is
/// HIGH, `>= medium_confidence` is MEDIUM, everything below is LOW.
#[derive(Debug, Clone, Deserialize)]
pub struct SizingConfig {
    /// Fraction of balance kept in reserve (e.g. 0.20 = 20%)
    pub reserve_pct: Decimal,
    /// Minimum trade size in USD; sized amounts below this become 0
    pub min_trade_usd: Decimal,
    /// Maximum trade size in USD
    pub max_trade_usd: Decimal,
    /// Inclusive lower bound for the HIGH tier (0-100)
    pub high_confidence: u8,
    /// Inclusive lower bound for the MEDIUM tier (0-100)
    pub medium_confidence: u8,
    /// Fraction of available balance for HIGH confidence
    pub high_pct: Decimal,
    /// Fraction of available balance for MEDIUM confidence
    pub medium_pct: Decimal,
    /// Fraction of available balance for LOW confidence
    pub low_pct: Decimal,
}

impl Default for SizingConfig {
    fn default() -> Self {
        use rust_decimal_macros::dec;
        Self {
            reserve_pct: dec!(0.20),
            min_trade_usd: dec!(10),
            max_trade_usd: dec!(1000),
            high_confidence: 80,
            medium_confidence: 50,
            high_pct: dec!(0.08),
            medium_pct: dec!(0.05),
            low_pct: dec!(0.02),
        }
    }
}

/// Hard-coded routing fallback used when no VenueRoutingConfig row matches.
#[derive(Debug, Clone, Deserialize)]
pub struct RoutingDefaults {
    #[serde(default = "default_venue_priority")]
    pub venue_priority: Vec<Venue>,
    #[serde(default = "default_failover")]
    pub failover_enabled: bool,
}

fn default_venue_priority() -> Vec<Venue> {
    vec![Venue::Hyperliquid, Venue::Jupiter]
}

fn default_failover() -> bool {
    true
}

impl Default for RoutingDefaults {
    fn default() -> Self {
        Self {
            venue_priority: default_venue_priority(),
            failover_enabled: default_failover(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReconcilerConfig {
    /// Seconds between reconciliation passes
    #[serde(default = "default_reconcile_interval")]
    pub interval_secs: u64,
    /// On-chain module whose authorization is reconciled
    #[serde(default = "default_module_id")]
    pub module_id: String,
    /// JSON-RPC endpoint for authorization reads
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Timeout for a single authorization read (milliseconds)
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,
}

fn default_reconcile_interval() -> u64 {
    300
}

fn default_module_id() -> String {
    "trade_executor".to_string()
}

fn default_rpc_url() -> String {
    "http://localhost:8545".to_string()
}

fn default_read_timeout() -> u64 {
    5_000
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_reconcile_interval(),
            module_id: default_module_id(),
            rpc_url: default_rpc_url(),
            read_timeout_ms: default_read_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct VenuesConfig {
    /// Route all execution through the paper backend (no real orders)
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub hyperliquid: Option<HttpVenueConfig>,
    #[serde(default)]
    pub jupiter: Option<HttpVenueConfig>,
    /// Tokens the paper venue pretends to have markets for
    #[serde(default = "default_paper_tokens")]
    pub paper_tokens: Vec<String>,
}

fn default_paper_tokens() -> Vec<String> {
    vec!["BTC".to_string(), "ETH".to_string(), "SOL".to_string()]
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpVenueConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
    /// Directory for rolling file logs (stdout only when unset)
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("database.max_connections", 5)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(
                File::from(config_dir.join(
                    std::env::var("STRADA_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (STRADA__DATABASE__URL, etc.)
            .add_source(
                Environment::with_prefix("STRADA")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.sizing.reserve_pct < Decimal::ZERO || self.sizing.reserve_pct >= Decimal::ONE {
            errors.push("sizing.reserve_pct must be in [0, 1)".to_string());
        }

        if self.sizing.min_trade_usd <= Decimal::ZERO {
            errors.push("sizing.min_trade_usd must be positive".to_string());
        }

        if self.sizing.max_trade_usd < self.sizing.min_trade_usd {
            errors.push("sizing.max_trade_usd must be >= min_trade_usd".to_string());
        }

        if self.sizing.medium_confidence > self.sizing.high_confidence {
            errors.push("sizing.medium_confidence must be <= high_confidence".to_string());
        }

        for (name, pct) in [
            ("high_pct", self.sizing.high_pct),
            ("medium_pct", self.sizing.medium_pct),
            ("low_pct", self.sizing.low_pct),
        ] {
            if pct <= Decimal::ZERO || pct > Decimal::ONE {
                errors.push(format!("sizing.{name} must be in (0, 1]"));
            }
        }

        if self.sizing.high_pct < self.sizing.medium_pct
            || self.sizing.medium_pct < self.sizing.low_pct
        {
            errors.push("sizing tier percentages must be monotone: high >= medium >= low".to_string());
        }

        if self.dispatch.batch_size <= 0 {
            errors.push("dispatch.batch_size must be positive".to_string());
        }

        if self.routing.venue_priority.is_empty() {
            errors.push("routing.venue_priority must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
