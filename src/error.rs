//! Client error taxonomy
//!
//! Every failure from the three external collaborators is normalized into one
//! of these variants at the layer that observed it. The controller converts
//! them into entity-state transitions; they never escape to the rendering
//! layer as unhandled faults.

use crate::types::ContentHash;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    /// Wallet provider unavailable or the user denied the connection.
    #[error("Wallet connection refused")]
    ConnectionRefused,

    /// Chain endpoint failure (transport, malformed response, or RPC error).
    #[error("RPC error: {0}")]
    Rpc(String),

    /// A submitted transaction was confirmed as reverted.
    #[error("Transaction reverted: {reason}")]
    TxReverted { reason: String },

    /// No confirmation arrived within the configured bound.
    #[error("Transaction not confirmed within {secs}s")]
    TxTimeout { secs: u64 },

    /// The content store could not be reached or answered with a server error.
    #[error("Content store unavailable: {0}")]
    StoreUnavailable(String),

    /// The content store has no bytes under this hash.
    #[error("Content not found: {0}")]
    NotFound(ContentHash),

    /// A write command was issued while another write for the same entity is
    /// still in flight. Never queued; the caller must wait.
    #[error("Conflicting operation in flight for {entity}")]
    ConflictingOperation { entity: String },

    /// The connected address owns no profile NFT; posting requires one.
    #[error("Must own a profile NFT to post")]
    ProfileRequired,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid content hash: {0}")]
    InvalidHash(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serde(String),
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
