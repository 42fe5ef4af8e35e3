//! JSON-RPC contract capability
//!
//! The chain endpoint exposes each generated contract method as a JSON-RPC
//! method. Queries pass their arguments straight through; submissions wrap
//! arguments in an envelope carrying the optional attached value and answer
//! with a transaction hash.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::{ContractCapability, TxHash, TxReceipt};
use crate::error::{ClientError, Result};
use crate::types::Amount;

pub struct JsonRpcContract {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcContract {
    pub fn new(url: &str, timeout_secs: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ClientError::InvalidConfig(e.to_string()))?;
        Ok(Self {
            http,
            url: url.to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        debug!(method, id, "Contract RPC call");

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::Rpc(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ClientError::Rpc(format!("HTTP {}", response.status())));
        }

        let envelope: Value = response
            .json()
            .await
            .map_err(|e| ClientError::Rpc(format!("malformed response: {e}")))?;

        if let Some(error) = envelope.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown RPC error");
            return Err(ClientError::Rpc(message.to_string()));
        }

        envelope
            .get("result")
            .cloned()
            .ok_or_else(|| ClientError::Rpc("response missing result".to_string()))
    }
}

#[async_trait]
impl ContractCapability for JsonRpcContract {
    async fn query(&self, method: &str, params: Value) -> Result<Value> {
        self.call(method, params).await
    }

    async fn submit(&self, method: &str, params: Value, value: Option<Amount>) -> Result<TxHash> {
        let envelope = json!({
            "args": params,
            "value": value.map(|v| v.0.to_string()),
        });
        let result = self.call(method, envelope).await?;
        let hash = result
            .as_str()
            .ok_or_else(|| ClientError::Rpc("submit response is not a tx hash".to_string()))?;
        Ok(TxHash(hash.to_string()))
    }

    async fn receipt(&self, tx: &TxHash) -> Result<Option<TxReceipt>> {
        let result = self.call("getTransactionReceipt", json!([tx.0])).await?;
        if result.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(result)?))
    }
}
