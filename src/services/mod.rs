pub mod dispatcher;
pub mod reconciler;
pub mod router;
pub mod scanner;
pub mod sizer;
pub mod worker;

pub use dispatcher::{DispatchSummary, ExecutionDispatcher};
pub use reconciler::{ReconcileSummary, StateReconciler};
pub use router::VenueRouter;
pub use scanner::{EligibilityScanner, EligibleSignal};
pub use sizer::{size, size_for_model, ConfidenceTier, Sizing};
pub use worker::DispatchWorker;
