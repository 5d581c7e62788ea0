pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod services;
pub mod store;
pub mod venues;

pub use config::AppConfig;
pub use error::{Result, StradaError, VenueError};
pub use services::{
    DispatchSummary, DispatchWorker, EligibilityScanner, ExecutionDispatcher, ReconcileSummary,
    StateReconciler, VenueRouter,
};
pub use store::{DispatchStore, PostgresStore};
pub use venues::{build_registry, VenueExecutionBackend, VenueRegistry};
