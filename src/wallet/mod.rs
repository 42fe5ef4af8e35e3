//! Wallet session
//!
//! Wraps connect/disconnect against an external wallet provider and surfaces
//! account/network change notifications. Any such notification is a full
//! invalidation signal for the view controller: address and permissions may
//! have changed under us.

pub mod rpc;

pub use rpc::RpcWallet;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::info;

use crate::error::{ClientError, Result};
use crate::types::{Address, Session};

/// Notification from the external provider.
#[derive(Debug, Clone)]
pub enum WalletEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(u64),
}

/// External wallet capability.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Ask the provider for the user's accounts. An empty answer or a
    /// provider-side denial maps to `ConnectionRefused`.
    async fn request_accounts(&self) -> Result<Vec<Address>>;

    /// Current network chain id.
    async fn chain_id(&self) -> Result<u64>;

    /// Subscribe to account/network change notifications.
    fn subscribe(&self) -> broadcast::Receiver<WalletEvent>;
}

/// Owns the session state derived from the provider.
pub struct WalletSession {
    provider: Arc<dyn WalletProvider>,
    session: Session,
}

impl WalletSession {
    pub fn new(provider: Arc<dyn WalletProvider>) -> Self {
        Self {
            provider,
            session: Session::default(),
        }
    }

    /// Connect: request accounts and the chain id, establish the session.
    pub async fn connect(&mut self) -> Result<Session> {
        let accounts = self.provider.request_accounts().await?;
        let address = accounts.into_iter().next().ok_or(ClientError::ConnectionRefused)?;
        let chain_id = self.provider.chain_id().await?;

        info!(address = %address, chain_id, "Wallet connected");
        self.session = Session {
            wallet_address: Some(address),
            chain_id,
            connected: true,
        };
        Ok(self.session.clone())
    }

    pub fn disconnect(&mut self) {
        info!("Wallet disconnected");
        self.session = Session::default();
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.provider.subscribe()
    }

    /// Fold a provider notification into the session. An empty account list
    /// tears the session down, matching a provider-side disconnect.
    pub fn apply_event(&mut self, event: &WalletEvent) {
        match event {
            WalletEvent::AccountsChanged(accounts) => match accounts.first() {
                Some(address) => {
                    self.session.wallet_address = Some(address.clone());
                    self.session.connected = true;
                }
                None => self.disconnect(),
            },
            WalletEvent::ChainChanged(chain_id) => {
                self.session.chain_id = *chain_id;
            }
        }
    }
}
