use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{Result, StradaError};

/// Read-only view of on-chain module authorization.
///
/// No side effects: the reconciler reads through this and writes only to
/// the off-chain cache.
#[async_trait]
pub trait AuthorizationReader: Send + Sync {
    async fn is_authorized(&self, custody_account: &str, module_id: &str) -> Result<bool>;
}

/// JSON-RPC implementation calling the chain's view endpoint
pub struct RpcAuthorizationReader {
    http: Client,
    rpc_url: String,
}

impl RpcAuthorizationReader {
    pub fn new(rpc_url: &str, timeout_ms: u64) -> Result<Self> {
        let http = Client::builder()
            .user_agent("strada-chain-reader/0.1")
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| StradaError::Internal(format!("failed to build RPC client: {}", e)))?;

        Ok(Self {
            http,
            rpc_url: rpc_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl AuthorizationReader for RpcAuthorizationReader {
    async fn is_authorized(&self, custody_account: &str, module_id: &str) -> Result<bool> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "module_isAuthorized",
            "params": [custody_account, module_id],
        });

        let resp: Value = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| StradaError::AuthorizationRead {
                account: custody_account.to_string(),
                reason: e.to_string(),
            })?
            .json()
            .await
            .map_err(|e| StradaError::AuthorizationRead {
                account: custody_account.to_string(),
                reason: e.to_string(),
            })?;

        if let Some(err) = resp.get("error") {
            return Err(StradaError::AuthorizationRead {
                account: custody_account.to_string(),
                reason: err.to_string(),
            });
        }

        resp.get("result")
            .and_then(|v| v.as_bool())
            .ok_or_else(|| StradaError::AuthorizationRead {
                account: custody_account.to_string(),
                reason: "non-boolean result".to_string(),
            })
    }
}

/// Scripted reader for tests and dry runs
#[derive(Default)]
pub struct StaticAuthorizations {
    authorized: Mutex<HashMap<String, bool>>,
    fallback: bool,
}

impl StaticAuthorizations {
    pub fn new(fallback: bool) -> Self {
        Self {
            authorized: Mutex::new(HashMap::new()),
            fallback,
        }
    }

    pub fn set(&self, custody_account: &str, authorized: bool) {
        self.authorized
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(custody_account.to_string(), authorized);
    }
}

#[async_trait]
impl AuthorizationReader for StaticAuthorizations {
    async fn is_authorized(&self, custody_account: &str, _module_id: &str) -> Result<bool> {
        Ok(self
            .authorized
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(custody_account)
            .copied()
            .unwrap_or(self.fallback))
    }
}
