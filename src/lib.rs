//! agora-client - Headless client runtime for the Agora on-chain social protocol
//!
//! Agora users mint a profile NFT, publish short posts whose content is pinned
//! to a content store with an on-chain pointer, tip other posts, and join
//! events that attach images to a shared id. All token accounting lives in an
//! external contract; this crate is the client side of the conversation:
//!
//! - **Wallet session**: connect/disconnect against an external wallet
//!   provider, with account and network change notifications
//! - **Contract gateway**: typed queries and transactions against the contract
//!   capability, with a single confirmation flow for every state change
//! - **Content store adapter**: put/get against a pinning proxy, addressed by
//!   content hash
//! - **View controller**: the in-memory projection of what the user should see
//!   right now, reconciled against asynchronous completions under ordering and
//!   staleness rules

pub mod config;
pub mod contract;
pub mod controller;
pub mod error;
pub mod store;
pub mod types;
pub mod wallet;

pub use config::Config;
pub use controller::{Projection, ViewController};
pub use error::{ClientError, Result};
