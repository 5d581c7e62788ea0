pub mod deployment;
pub mod position;
pub mod routing;
pub mod signal;
pub mod venue;

pub use deployment::*;
pub use position::*;
pub use routing::*;
pub use signal::*;
pub use venue::*;
