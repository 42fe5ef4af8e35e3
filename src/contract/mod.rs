//! Contract gateway
//!
//! Typed wrappers over the external contract capability. Reads go through
//! `query`; every state-mutating action goes through `submit` followed by a
//! separate, cancelable `await_confirmation`; success is never assumed
//! before a confirmation arrives. The confirmation wait polls for a receipt
//! and is bounded by a configurable timeout.

pub mod rpc;

pub use rpc::JsonRpcContract;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::types::{Address, Amount, ContentHash, Event, EventId, Post, PostId, TokenId};

/// Handle for a submitted, not-yet-confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(pub String);

impl std::fmt::Display for TxHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Receipt as reported by the chain endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxReceipt {
    pub status: bool,
    #[serde(rename = "blockNumber")]
    pub block_number: u64,
    #[serde(default, rename = "revertReason")]
    pub revert_reason: Option<String>,
}

/// A durably accepted state change.
#[derive(Debug, Clone)]
pub struct Confirmation {
    pub block_ref: u64,
}

/// External contract capability: opaque queries and submissions.
#[async_trait]
pub trait ContractCapability: Send + Sync {
    /// Read call. No state change, no value attached.
    async fn query(&self, method: &str, params: Value) -> Result<Value>;

    /// Submit a state-changing transaction, optionally attaching native
    /// currency. Fire-and-forget: returns as soon as the tx is accepted
    /// into the mempool.
    async fn submit(&self, method: &str, params: Value, value: Option<Amount>) -> Result<TxHash>;

    /// Receipt lookup; `None` until the transaction lands in a block.
    async fn receipt(&self, tx: &TxHash) -> Result<Option<TxReceipt>>;
}

/// Typed gateway over the capability.
pub struct ContractGateway {
    capability: Arc<dyn ContractCapability>,
    tx_timeout: Duration,
    receipt_poll: Duration,
}

impl ContractGateway {
    pub fn new(
        capability: Arc<dyn ContractCapability>,
        tx_timeout_secs: u64,
        receipt_poll_ms: u64,
    ) -> Self {
        Self {
            capability,
            tx_timeout: Duration::from_secs(tx_timeout_secs),
            receipt_poll: Duration::from_millis(receipt_poll_ms),
        }
    }

    // ---- queries ----

    pub async fn get_all_posts(&self) -> Result<Vec<Post>> {
        let result = self.capability.query("getAllPosts", json!([])).await?;
        Ok(serde_json::from_value(result)?)
    }

    pub async fn balance_of(&self, owner: &Address) -> Result<u64> {
        let result = self.capability.query("balanceOf", json!([owner])).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Active profile token id for an address; zero means none set.
    pub async fn profiles(&self, owner: &Address) -> Result<TokenId> {
        let result = self.capability.query("profiles", json!([owner])).await?;
        Ok(serde_json::from_value(result)?)
    }

    pub async fn token_uri(&self, token: TokenId) -> Result<String> {
        let result = self.capability.query("tokenURI", json!([token])).await?;
        Ok(serde_json::from_value(result)?)
    }

    pub async fn get_my_nfts(&self, owner: &Address) -> Result<Vec<TokenId>> {
        let result = self.capability.query("getMyNfts", json!([owner])).await?;
        Ok(serde_json::from_value(result)?)
    }

    pub async fn event_count(&self) -> Result<u64> {
        let result = self.capability.query("eventCount", json!([])).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Event records are 1-indexed on chain.
    pub async fn event(&self, id: EventId) -> Result<Event> {
        let result = self.capability.query("events", json!([id])).await?;
        Ok(serde_json::from_value(result)?)
    }

    // ---- submissions ----

    pub async fn mint(&self, token_uri: &str) -> Result<TxHash> {
        self.capability.submit("mint", json!([token_uri]), None).await
    }

    pub async fn set_profile(&self, token: TokenId) -> Result<TxHash> {
        self.capability.submit("setProfile", json!([token]), None).await
    }

    pub async fn upload_post(&self, hash: &ContentHash) -> Result<TxHash> {
        self.capability.submit("uploadPost", json!([hash]), None).await
    }

    pub async fn tip_post_owner(&self, post: PostId, tip: Amount) -> Result<TxHash> {
        self.capability
            .submit("tipPostOwner", json!([post]), Some(tip))
            .await
    }

    pub async fn create_event(
        &self,
        name: &str,
        category: &str,
        max_participants: u32,
    ) -> Result<TxHash> {
        self.capability
            .submit("createEvent", json!([name, category, max_participants]), None)
            .await
    }

    pub async fn join_event(&self, event: EventId, fee: Amount) -> Result<TxHash> {
        self.capability
            .submit("joinEvent", json!([event]), Some(fee))
            .await
    }

    pub async fn upload_image(&self, event: EventId, url: &str, caption: &str) -> Result<TxHash> {
        self.capability
            .submit("uploadImage", json!([event, url, caption]), None)
            .await
    }

    // ---- confirmation ----

    /// Wait for the transaction to land. Polls for a receipt until the
    /// configured bound elapses; dropping the returned future abandons the
    /// poll, not the transaction.
    pub async fn await_confirmation(&self, tx: &TxHash) -> Result<Confirmation> {
        let poll = async {
            loop {
                if let Some(receipt) = self.capability.receipt(tx).await? {
                    if receipt.status {
                        debug!(tx = %tx, block = receipt.block_number, "Transaction confirmed");
                        return Ok(Confirmation {
                            block_ref: receipt.block_number,
                        });
                    }
                    return Err(ClientError::TxReverted {
                        reason: receipt
                            .revert_reason
                            .unwrap_or_else(|| "execution reverted".to_string()),
                    });
                }
                tokio::time::sleep(self.receipt_poll).await;
            }
        };

        match tokio::time::timeout(self.tx_timeout, poll).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ClientError::TxTimeout {
                secs: self.tx_timeout.as_secs(),
            }),
        }
    }
}
