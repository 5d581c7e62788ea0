use std::sync::Arc;

use tracing::debug;

use crate::domain::{Deployment, RoutingStrategy, Signal, Venue, VenueRoutingConfig, VenueSelector};
use crate::error::Result;
use crate::venues::VenueRegistry;

/// Builds the ordered venue candidate list for one (signal, deployment).
///
/// Deterministic: identical (config, capabilities, requested venue)
/// always yields the identical ordering. Candidates are filtered by
/// deployment capability and by a live market lookup for the signal's
/// token; venues skipped here never reach the execution loop.
pub struct VenueRouter {
    registry: Arc<VenueRegistry>,
}

impl VenueRouter {
    pub fn new(registry: Arc<VenueRegistry>) -> Self {
        Self { registry }
    }

    pub async fn route(
        &self,
        signal: &Signal,
        deployment: &Deployment,
        config: &VenueRoutingConfig,
    ) -> Result<Vec<Venue>> {
        let candidates = match signal.requested_venue {
            VenueSelector::Venue(venue) => {
                if deployment.supports_venue(venue) && self.registry.contains(venue) {
                    vec![venue]
                } else {
                    vec![]
                }
            }
            VenueSelector::Multi => {
                let mut candidates = Vec::new();
                for &venue in &config.venue_priority {
                    if !deployment.supports_venue(venue) {
                        debug!(venue = %venue, deployment_id = %deployment.id, "Venue not enabled on deployment");
                        continue;
                    }
                    let Some(backend) = self.registry.get(venue) else {
                        continue;
                    };
                    match backend.market(&signal.token_symbol).await? {
                        Some(market) if market.tradable => candidates.push(venue),
                        _ => {
                            debug!(venue = %venue, token = %signal.token_symbol, "No tradable market");
                        }
                    }
                }
                candidates
            }
        };

        // FIRST_AVAILABLE keeps strict priority order; other strategies
        // would reorder here.
        match config.strategy {
            RoutingStrategy::FirstAvailable => {}
        }

        debug!(
            signal_id = %signal.id,
            deployment_id = %deployment.id,
            candidates = ?candidates,
            "Routed signal"
        );

        Ok(candidates)
    }
}
