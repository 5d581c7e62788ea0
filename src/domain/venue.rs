use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{Result, StradaError};

/// Closed set of execution venues.
///
/// Venue-specific behavior lives behind `VenueExecutionBackend`
/// implementations selected through the registry, never behind string
/// comparisons on venue names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Venue {
    Hyperliquid,
    Jupiter,
    Paper,
}

impl Venue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hyperliquid => "hyperliquid",
            Self::Jupiter => "jupiter",
            Self::Paper => "paper",
        }
    }

    pub const ALL: [Venue; 3] = [Venue::Hyperliquid, Venue::Jupiter, Venue::Paper];
}

impl std::fmt::Display for Venue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Venue {
    type Err = &'static str;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "hyperliquid" | "hl" => Ok(Self::Hyperliquid),
            "jupiter" | "jup" => Ok(Self::Jupiter),
            "paper" => Ok(Self::Paper),
            _ => Err("invalid venue; expected hyperliquid|jupiter|paper"),
        }
    }
}

pub fn parse_venue(raw: &str) -> Result<Venue> {
    Venue::from_str(raw).map_err(|e| StradaError::Validation(e.to_string()))
}

/// A signal's venue request: one specific venue, or any venue the
/// routing config allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VenueSelector {
    Venue(Venue),
    Multi,
}

impl VenueSelector {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Venue(v) => v.as_str(),
            Self::Multi => "multi",
        }
    }
}

impl FromStr for VenueSelector {
    type Err = &'static str;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        if raw.trim().eq_ignore_ascii_case("multi") {
            return Ok(Self::Multi);
        }
        Venue::from_str(raw).map(Self::Venue)
    }
}

impl std::fmt::Display for VenueSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
