//! Content store adapter
//!
//! Put/get against an external pinning capability, keyed by content hash.
//! No retry policy lives here; retries are the controller's responsibility.

pub mod pinning;

pub use pinning::PinningClient;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::types::ContentHash;

/// External pinning capability.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Pin a blob; the store answers with its content hash.
    async fn put(&self, bytes: Vec<u8>) -> Result<ContentHash>;

    /// Pin a named file (kept separately so the store can preserve file
    /// semantics for downstream gateways).
    async fn put_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<ContentHash>;

    /// Retrieve previously pinned bytes.
    async fn get(&self, hash: &ContentHash) -> Result<Vec<u8>>;

    /// Public gateway URL under which `hash` resolves, suitable for storing
    /// on chain.
    fn public_url(&self, hash: &ContentHash) -> String;
}

/// Typed JSON helpers over any store.
#[async_trait]
pub trait ContentStoreExt: ContentStore {
    async fn put_json<T: Serialize + Sync>(&self, value: &T) -> Result<ContentHash> {
        let bytes = serde_json::to_vec(value)?;
        self.put(bytes).await
    }

    async fn get_json<T: DeserializeOwned>(&self, hash: &ContentHash) -> Result<T> {
        let bytes = self.get(hash).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl<S: ContentStore + ?Sized> ContentStoreExt for S {}
