//! Jupiter spot-swap adapter.
//!
//! Shorts are not expressible as a spot swap, so SHORT tickets are
//! rejected permanently and failover moves on to a perp venue.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::HttpVenueConfig;
use crate::domain::{Side, Venue};
use crate::error::{Result, StradaError, VenueError};

use super::{MarketInfo, OrderTicket, VenueExecutionBackend, VenueFill};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct JupiterVenue {
    http: Client,
    base_url: String,
}

impl JupiterVenue {
    pub fn new(config: &HttpVenueConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent("strada-jupiter-adapter/0.1")
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| {
                StradaError::Internal(format!("failed to build Jupiter HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn map_transport_error(err: reqwest::Error) -> VenueError {
        if err.is_timeout() {
            VenueError::Timeout {
                elapsed_ms: HTTP_TIMEOUT.as_millis() as u64,
            }
        } else {
            VenueError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl VenueExecutionBackend for JupiterVenue {
    fn venue(&self) -> Venue {
        Venue::Jupiter
    }

    async fn market(&self, token_symbol: &str) -> Result<Option<MarketInfo>> {
        let url = format!("{}/tokens/{}", self.base_url, token_symbol);
        let resp = self.http.get(&url).send().await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let value: Value = resp.error_for_status()?.json().await?;

        let min_order_usd = value
            .get("minSwapUsd")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<Decimal>().ok())
            .unwrap_or(Decimal::ONE);
        let tradable = value
            .get("routable")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        Ok(Some(MarketInfo {
            min_order_usd,
            tradable,
        }))
    }

    async fn execute(&self, ticket: &OrderTicket) -> std::result::Result<VenueFill, VenueError> {
        if ticket.side == Side::Short {
            return Err(VenueError::Rejected(
                "jupiter spot swaps cannot open short positions".into(),
            ));
        }

        let body = json!({
            "wallet": ticket.venue_agent,
            "outputToken": ticket.token_symbol,
            "amountUsd": ticket.size_usd.to_string(),
            "slippageBps": ticket.slippage_bps,
        });

        debug!(token = %ticket.token_symbol, size_usd = %ticket.size_usd, "Submitting Jupiter swap");

        let resp = self
            .http
            .post(format!("{}/swap", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(Self::map_transport_error)?;

        let status = resp.status();
        let text = resp.text().await.map_err(Self::map_transport_error)?;

        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(VenueError::RateLimited(format!("jupiter: {}", text)))
            }
            StatusCode::NOT_FOUND => {
                return Err(VenueError::UnsupportedToken {
                    token: ticket.token_symbol.clone(),
                })
            }
            s if s.is_server_error() => return Err(VenueError::Network(format!("{}: {}", s, text))),
            s if !s.is_success() => return Err(VenueError::Rejected(format!("{}: {}", s, text))),
            _ => {}
        }

        let value: Value =
            serde_json::from_str(&text).map_err(|e| VenueError::Rejected(e.to_string()))?;

        let tx_ref = value
            .get("signature")
            .and_then(|v| v.as_str())
            .ok_or_else(|| VenueError::Rejected("missing signature in swap response".into()))?
            .to_string();
        let filled_qty = value
            .get("outAmount")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<Decimal>().ok())
            .ok_or_else(|| VenueError::Rejected("missing outAmount in swap response".into()))?;
        let filled_price = value
            .get("effectivePrice")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<Decimal>().ok())
            .ok_or_else(|| VenueError::Rejected("missing effectivePrice in swap response".into()))?;

        Ok(VenueFill {
            tx_ref,
            filled_qty,
            filled_price,
        })
    }
}
