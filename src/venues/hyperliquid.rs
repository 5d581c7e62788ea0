//! Hyperliquid perpetuals adapter (native Rust, no external SDK dependency).
//!
//! Order construction details stay on the venue side; this client only
//! submits the normalized ticket and maps the response into the shared
//! fill/error types.

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use sha2::Sha256;
use std::time::Duration;
use tracing::debug;

use crate::config::HttpVenueConfig;
use crate::domain::{Side, Venue};
use crate::error::{Result, StradaError, VenueError};

use super::{MarketInfo, OrderTicket, VenueExecutionBackend, VenueFill};

type HmacSha256 = Hmac<Sha256>;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct HyperliquidVenue {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    api_secret: Option<String>,
}

impl HyperliquidVenue {
    pub fn new(config: &HttpVenueConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent("strada-hyperliquid-adapter/0.1")
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| {
                StradaError::Internal(format!("failed to build Hyperliquid HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        })
    }

    fn auth_headers(&self, path: &str, body: &str) -> std::result::Result<HeaderMap, VenueError> {
        let key = self
            .api_key
            .as_ref()
            .ok_or_else(|| VenueError::Rejected("hyperliquid api_key not configured".into()))?;
        let secret = self
            .api_secret
            .as_ref()
            .ok_or_else(|| VenueError::Rejected("hyperliquid api_secret not configured".into()))?;

        let timestamp = Utc::now().timestamp_millis().to_string();
        let payload = format!("{}POST{}{}", timestamp, path, body);

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| VenueError::Rejected(format!("invalid hyperliquid secret: {}", e)))?;
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("hl-access-key"),
            HeaderValue::from_str(key)
                .map_err(|e| VenueError::Rejected(format!("invalid api key header: {}", e)))?,
        );
        headers.insert(
            HeaderName::from_static("hl-access-signature"),
            HeaderValue::from_str(&signature)
                .map_err(|e| VenueError::Rejected(format!("invalid signature header: {}", e)))?,
        );
        headers.insert(
            HeaderName::from_static("hl-access-timestamp"),
            HeaderValue::from_str(&timestamp)
                .map_err(|e| VenueError::Rejected(format!("invalid timestamp header: {}", e)))?,
        );
        Ok(headers)
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
impl VenueExecutionBackend for HyperliquidVenue {
    fn venue(&self) -> Venue {
        Venue::Hyperliquid
    }

    async fn market(&self, token_symbol: &str) -> Result<Option<MarketInfo>> {
        let url = format!("{}/info/markets/{}", self.base_url, token_symbol);
        let resp = self.http.get(&url).send().await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = resp.error_for_status()?;
        let value: Value = resp.json().await?;

        let min_order_usd = value
            .get("minOrderUsd")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<Decimal>().ok())
            .unwrap_or(Decimal::TEN);
        let tradable = value
            .get("tradable")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        Ok(Some(MarketInfo {
            min_order_usd,
            tradable,
        }))
    }

    async fn execute(&self, ticket: &OrderTicket) -> std::result::Result<VenueFill, VenueError> {
        let path = "/orders";
        let body = json!({
            "agent": ticket.venue_agent,
            "coin": ticket.token_symbol,
            "isBuy": ticket.side == Side::Long,
            "sizeUsd": ticket.size_usd.to_string(),
            "leverage": ticket.leverage,
            "slippageBps": ticket.slippage_bps,
        });
        let body_text = body.to_string();

        let headers = self.auth_headers(path, &body_text)?;
        let url = format!("{}{}", self.base_url, path);

        debug!(token = %ticket.token_symbol, size_usd = %ticket.size_usd, "Submitting Hyperliquid order");

        let resp = self
            .http
            .post(&url)
            .headers(headers)
            .header(CONTENT_TYPE, "application/json")
            .body(body_text)
            .send()
            .await
            .map_err(Self::map_transport_error)?;

        let status = resp.status();
        let text = resp.text().await.map_err(Self::map_transport_error)?;

        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(VenueError::RateLimited(format!("hyperliquid: {}", text)))
            }
            StatusCode::NOT_FOUND => {
                return Err(VenueError::UnsupportedToken {
                    token: ticket.token_symbol.clone(),
                })
            }
            StatusCode::CONFLICT | StatusCode::GONE => {
                return Err(VenueError::MarketUnavailable(text))
            }
            s if s.is_server_error() => return Err(VenueError::Network(format!("{}: {}", s, text))),
            s if !s.is_success() => return Err(VenueError::Rejected(format!("{}: {}", s, text))),
            _ => {}
        }

        let value: Value =
            serde_json::from_str(&text).map_err(|e| VenueError::Rejected(e.to_string()))?;

        let tx_ref = value
            .get("txHash")
            .and_then(|v| v.as_str())
            .ok_or_else(|| VenueError::Rejected("missing txHash in fill response".into()))?
            .to_string();
        let filled_qty = value
            .get("filledQty")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<Decimal>().ok())
            .ok_or_else(|| VenueError::Rejected("missing filledQty in fill response".into()))?;
        let filled_price = value
            .get("filledPrice")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<Decimal>().ok())
            .ok_or_else(|| VenueError::Rejected("missing filledPrice in fill response".into()))?;

        Ok(VenueFill {
            tx_ref,
            filled_qty,
            filled_price,
        })
    }

    async fn account_balance(&self, account: &str) -> Result<Decimal> {
        let url = format!("{}/account/{}/balance", self.base_url, account);
        let value: Value = self.http.get(&url).send().await?.error_for_status()?.json().await?;

        value
            .get("withdrawable")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<Decimal>().ok())
            .ok_or_else(|| {
                StradaError::Internal("missing withdrawable in balance response".to_string())
            })
    }
}
