pub mod hyperliquid;
pub mod jupiter;
pub mod paper;
pub mod registry;
pub mod traits;

pub use hyperliquid::HyperliquidVenue;
pub use jupiter::JupiterVenue;
pub use paper::PaperVenue;
pub use registry::{build_registry, VenueRegistry};
pub use traits::{MarketInfo, OrderTicket, VenueExecutionBackend, VenueFill};
