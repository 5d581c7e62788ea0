use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::config::VenuesConfig;
use crate::domain::Venue;
use crate::error::{Result, StradaError};

use super::{HyperliquidVenue, JupiterVenue, PaperVenue, VenueExecutionBackend};

/// Lookup table from venue tag to its execution backend.
///
/// Built once at startup; routing and dispatch go through `get`, never
/// through venue-name branching.
pub struct VenueRegistry {
    backends: HashMap<Venue, Arc<dyn VenueExecutionBackend>>,
}

impl VenueRegistry {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
        }
    }

    pub fn register(&mut self, backend: Arc<dyn VenueExecutionBackend>) {
        self.backends.insert(backend.venue(), backend);
    }

    pub fn get(&self, venue: Venue) -> Option<Arc<dyn VenueExecutionBackend>> {
        self.backends.get(&venue).cloned()
    }

    pub fn contains(&self, venue: Venue) -> bool {
        self.backends.contains_key(&venue)
    }

    pub fn venues(&self) -> Vec<Venue> {
        let mut venues: Vec<Venue> = self.backends.keys().copied().collect();
        venues.sort_by_key(|v| v.as_str());
        venues
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

impl Default for VenueRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the runtime registry from config.
///
/// Dry-run registers the paper backend under every venue tag so routing
/// configs keep working without touching a real venue.
pub fn build_registry(config: &VenuesConfig) -> Result<VenueRegistry> {
    let mut registry = VenueRegistry::new();

    if config.dry_run {
        let paper = PaperVenue::new(config.paper_tokens.clone());
        for venue in Venue::ALL {
            registry.register(Arc::new(paper.clone().with_venue(venue)));
        }
        info!("Venue registry in dry-run mode: all venues backed by paper");
        return Ok(registry);
    }

    if let Some(hl) = &config.hyperliquid {
        registry.register(Arc::new(HyperliquidVenue::new(hl)?));
    }
    if let Some(jup) = &config.jupiter {
        registry.register(Arc::new(JupiterVenue::new(jup)?));
    }
    registry.register(Arc::new(PaperVenue::new(config.paper_tokens.clone())));

    if registry.is_empty() {
        return Err(StradaError::Validation(
            "no venue backends configured".to_string(),
        ));
    }

    info!(venues = ?registry.venues(), "Venue registry built");
    Ok(registry)
}
