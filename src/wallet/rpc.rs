//! JSON-RPC wallet provider
//!
//! Talks to a wallet bridge over JSON-RPC (`eth_requestAccounts`,
//! `eth_accounts`, `eth_chainId`) and runs a background poll task that diffs
//! the answers and broadcasts change notifications. The bridge holds the
//! keys; this client never sees private material.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{WalletEvent, WalletProvider};
use crate::error::{ClientError, Result};
use crate::types::Address;

pub struct RpcWallet {
    http: reqwest::Client,
    url: String,
    poll_interval: Duration,
    events: broadcast::Sender<WalletEvent>,
}

impl RpcWallet {
    pub fn new(url: &str, poll_interval_ms: u64) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            http: reqwest::Client::new(),
            url: url.to_string(),
            poll_interval: Duration::from_millis(poll_interval_ms),
            events,
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|_| ClientError::ConnectionRefused)?;

        if !response.status().is_success() {
            return Err(ClientError::ConnectionRefused);
        }

        let envelope: Value = response
            .json()
            .await
            .map_err(|e| ClientError::Rpc(format!("malformed wallet response: {e}")))?;

        if envelope.get("error").is_some() {
            // Provider-side denial (user rejected, locked wallet, ...)
            return Err(ClientError::ConnectionRefused);
        }

        envelope
            .get("result")
            .cloned()
            .ok_or_else(|| ClientError::Rpc("wallet response missing result".to_string()))
    }

    async fn fetch_accounts(&self, method: &str) -> Result<Vec<Address>> {
        let result = self.call(method, json!([])).await?;
        let raw: Vec<String> = serde_json::from_value(result)?;
        raw.iter().map(|s| Address::parse(s)).collect()
    }

    async fn fetch_chain_id(&self) -> Result<u64> {
        let result = self.call("eth_chainId", json!([])).await?;
        let hex = result
            .as_str()
            .ok_or_else(|| ClientError::Rpc("chain id is not a string".to_string()))?;
        u64::from_str_radix(hex.trim_start_matches("0x"), 16)
            .map_err(|_| ClientError::Rpc(format!("invalid chain id: {hex}")))
    }

    /// Spawn the change watcher. Polls `eth_accounts`/`eth_chainId`, diffs
    /// against the last observation, and broadcasts on change. Poll failures
    /// are logged and skipped; the next tick retries.
    pub fn start_watcher(&self) -> JoinHandle<()> {
        let http = self.http.clone();
        let url = self.url.clone();
        let events = self.events.clone();
        let poll_interval = self.poll_interval;

        tokio::spawn(async move {
            let wallet = RpcWallet {
                http,
                url,
                poll_interval,
                events: events.clone(),
            };
            let mut last_accounts: Option<Vec<Address>> = None;
            let mut last_chain: Option<u64> = None;
            let mut timer = tokio::time::interval(poll_interval);

            loop {
                timer.tick().await;

                match wallet.fetch_accounts("eth_accounts").await {
                    Ok(accounts) => {
                        if last_accounts.as_ref().is_some_and(|prev| *prev != accounts) {
                            debug!(count = accounts.len(), "Wallet accounts changed");
                            let _ = events.send(WalletEvent::AccountsChanged(accounts.clone()));
                        }
                        last_accounts = Some(accounts);
                    }
                    Err(e) => warn!(error = %e, "Wallet account poll failed"),
                }

                match wallet.fetch_chain_id().await {
                    Ok(chain_id) => {
                        if last_chain.is_some_and(|prev| prev != chain_id) {
                            debug!(chain_id, "Wallet network changed");
                            let _ = events.send(WalletEvent::ChainChanged(chain_id));
                        }
                        last_chain = Some(chain_id);
                    }
                    Err(e) => warn!(error = %e, "Wallet chain poll failed"),
                }
            }
        })
    }
}

#[async_trait]
impl WalletProvider for RpcWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>> {
        self.fetch_accounts("eth_requestAccounts").await
    }

    async fn chain_id(&self) -> Result<u64> {
        self.fetch_chain_id().await
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}
