//! View state controller
//!
//! The coordinating core: holds the projection, issues commands to the
//! wallet session, contract gateway, and content store, and reconciles
//! their asynchronous completions back into the projection.
//!
//! Rules enforced here:
//! - per-entity sequence gating: a completion older than the last applied
//!   one is discarded, so superseded load cycles die quietly
//! - one in-flight write per entity; a second write is rejected with
//!   `ConflictingOperation`, never queued
//! - confirmed writes refetch from the chain rather than trusting the
//!   request payload
//! - a wallet account/network change marks everything stale and holds off
//!   writes until the full refetch lands
//! - failures become entity-state transitions at this boundary; they do not
//!   propagate to the rendering layer as faults

mod feed;
mod projection;

pub use projection::{EntityKey, EntityState, PendingCommand, Projection};

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::contract::{Confirmation, ContractGateway};
use crate::error::{ClientError, Result};
use crate::store::{ContentStore, ContentStoreExt};
use crate::types::{
    Amount, ContentHash, Event, EventId, PostId, PostMetadata, Profile, ProfileMetadata, Session,
    TokenId,
};
use crate::wallet::{WalletEvent, WalletSession};

use projection::SeqRegistry;

struct ControllerState {
    projection: Projection,
    seqs: SeqRegistry,
    /// A wallet-change refetch is outstanding; writes are held off.
    invalidating: bool,
}

pub struct ViewController {
    wallet: Mutex<WalletSession>,
    gateway: Arc<ContractGateway>,
    store: Arc<dyn ContentStore>,
    state: Mutex<ControllerState>,
    tip_amount: Amount,
    join_fee: Amount,
}

impl ViewController {
    pub fn new(
        wallet: WalletSession,
        gateway: Arc<ContractGateway>,
        store: Arc<dyn ContentStore>,
        tip_amount: Amount,
        join_fee: Amount,
    ) -> Self {
        Self {
            wallet: Mutex::new(wallet),
            gateway,
            store,
            state: Mutex::new(ControllerState {
                projection: Projection::default(),
                seqs: SeqRegistry::default(),
                invalidating: false,
            }),
            tip_amount,
            join_fee,
        }
    }

    /// Snapshot of the current projection.
    pub async fn projection(&self) -> Projection {
        self.state.lock().await.projection.clone()
    }

    /// Connect the wallet and run the initial full load.
    pub async fn connect(&self) -> Result<Session> {
        let session = {
            let mut wallet = self.wallet.lock().await;
            let session = wallet.connect().await?;
            self.state.lock().await.projection.session = session.clone();
            session
        };
        self.refresh_all().await;
        Ok(session)
    }

    pub async fn disconnect(&self) {
        let mut wallet = self.wallet.lock().await;
        wallet.disconnect();
        let mut st = self.state.lock().await;
        st.projection = Projection::default();
    }

    /// Spawn a task that folds wallet change notifications into the view.
    pub fn spawn_wallet_watcher(self: &Arc<Self>) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            let mut events = {
                let wallet = controller.wallet.lock().await;
                wallet.subscribe()
            };
            while let Ok(event) = events.recv().await {
                controller.handle_wallet_event(event).await;
            }
        })
    }

    /// External change notification: address and permissions may have
    /// changed, so every entity goes stale and gets refetched before any
    /// further write is accepted.
    pub async fn handle_wallet_event(&self, event: WalletEvent) {
        info!(?event, "Wallet change notification, invalidating view");
        {
            let mut wallet = self.wallet.lock().await;
            wallet.apply_event(&event);
            let mut st = self.state.lock().await;
            st.projection.session = wallet.session().clone();
            st.projection.mark_all_stale();
            st.invalidating = true;
        }
        self.refresh_all().await;
        self.state.lock().await.invalidating = false;
    }

    pub async fn refresh_all(&self) {
        tokio::join!(self.refresh_profile(), self.refresh_feed(), self.refresh_events());
    }

    // ---- read paths ----

    /// Load the feed and swap it into the projection, unless a newer cycle
    /// has already landed or a write on the feed is still pending.
    pub async fn refresh_feed(&self) {
        let seq = self.state.lock().await.seqs.begin(EntityKey::Feed);
        let loaded = feed::load_feed(&self.gateway, self.store.as_ref()).await;

        let mut st = self.state.lock().await;
        if !st.seqs.try_apply(EntityKey::Feed, seq) {
            debug!(seq, "Discarding superseded feed load");
            return;
        }
        if st.projection.state(&EntityKey::Feed) == EntityState::Pending {
            debug!(seq, "Feed write pending, suppressing read completion");
            return;
        }
        match loaded {
            Ok(posts) => {
                st.projection.set_posts(posts);
                st.projection.set_state(EntityKey::Feed, EntityState::Clean);
            }
            Err(e) => {
                warn!(error = %e, "Feed load failed");
                st.projection
                    .set_state(EntityKey::Feed, EntityState::Error { message: e.to_string() });
            }
        }
    }

    pub async fn refresh_events(&self) {
        let seq = self.state.lock().await.seqs.begin(EntityKey::Events);
        let loaded = self.load_events().await;

        let mut st = self.state.lock().await;
        if !st.seqs.try_apply(EntityKey::Events, seq) {
            debug!(seq, "Discarding superseded events load");
            return;
        }
        if st.projection.state(&EntityKey::Events) == EntityState::Pending {
            debug!(seq, "Events write pending, suppressing read completion");
            return;
        }
        match loaded {
            Ok((events, failures)) => {
                st.projection.set_events(events);
                st.projection.set_state(EntityKey::Events, EntityState::Clean);
                // A missing event does not invalidate its siblings
                for (id, message) in failures {
                    st.projection
                        .set_state(EntityKey::Event(id), EntityState::Error { message });
                }
            }
            Err(e) => {
                warn!(error = %e, "Events load failed");
                st.projection
                    .set_state(EntityKey::Events, EntityState::Error { message: e.to_string() });
            }
        }
    }

    /// Events are stored 1..=eventCount on chain; fetch them concurrently.
    async fn load_events(&self) -> Result<(Vec<Event>, Vec<(EventId, String)>)> {
        let count = self.gateway.event_count().await?;
        let fetches = (1..=count).map(|i| {
            let gateway = Arc::clone(&self.gateway);
            async move {
                let id = EventId(i);
                (id, gateway.event(id).await)
            }
        });

        let mut events = Vec::new();
        let mut failures = Vec::new();
        for (id, result) in join_all(fetches).await {
            match result {
                Ok(event) => events.push(event),
                Err(e) => failures.push((id, e.to_string())),
            }
        }
        Ok((events, failures))
    }

    pub async fn refresh_profile(&self) {
        let seq = self.state.lock().await.seqs.begin(EntityKey::Profile);
        let address = self.state.lock().await.projection.session.wallet_address.clone();
        let loaded = match address {
            Some(address) => self.load_profile(&address).await.map(Some),
            None => Ok(None),
        };

        let mut st = self.state.lock().await;
        if !st.seqs.try_apply(EntityKey::Profile, seq) {
            debug!(seq, "Discarding superseded profile load");
            return;
        }
        if st.projection.state(&EntityKey::Profile) == EntityState::Pending {
            debug!(seq, "Profile write pending, suppressing read completion");
            return;
        }
        match loaded {
            Ok(Some((has_profile, my_nfts, active_profile))) => {
                st.projection.has_profile = has_profile;
                st.projection.my_nfts = my_nfts;
                st.projection.active_profile = active_profile;
                st.projection.set_state(EntityKey::Profile, EntityState::Clean);
            }
            Ok(None) => {
                st.projection.has_profile = false;
                st.projection.my_nfts.clear();
                st.projection.active_profile = None;
                st.projection.set_state(EntityKey::Profile, EntityState::Clean);
            }
            Err(e) => {
                warn!(error = %e, "Profile load failed");
                st.projection
                    .set_state(EntityKey::Profile, EntityState::Error { message: e.to_string() });
            }
        }
    }

    async fn load_profile(
        &self,
        address: &crate::types::Address,
    ) -> Result<(bool, Vec<Profile>, Option<Profile>)> {
        let (balance, nft_ids, active_token) = tokio::join!(
            self.gateway.balance_of(address),
            self.gateway.get_my_nfts(address),
            self.gateway.profiles(address)
        );
        let balance = balance?;
        let nft_ids = nft_ids?;
        let active_token = active_token?;

        let fetches = nft_ids.into_iter().map(|token| async move {
            (token, self.fetch_profile(token).await)
        });
        let mut my_nfts = Vec::new();
        for (token, result) in join_all(fetches).await {
            match result {
                Ok(profile) => my_nfts.push(profile),
                Err(e) => warn!(token = %token, error = %e, "Profile NFT metadata fetch failed"),
            }
        }

        let active_profile = my_nfts.iter().find(|p| p.token_id == active_token).cloned();
        Ok((balance > 0, my_nfts, active_profile))
    }

    async fn fetch_profile(&self, token: TokenId) -> Result<Profile> {
        let uri = self.gateway.token_uri(token).await?;
        let metadata: ProfileMetadata = self.store.get_json(&ContentHash::parse(&uri)?).await?;
        Ok(Profile {
            token_id: token,
            username: metadata.username,
            avatar: metadata.avatar,
        })
    }

    /// Re-run the read for an entity left in `Error`.
    pub async fn retry(&self, key: EntityKey) {
        match key {
            EntityKey::Feed | EntityKey::Post(_) => self.refresh_feed().await,
            EntityKey::Events | EntityKey::Event(_) => self.refresh_events().await,
            EntityKey::Profile => self.refresh_profile().await,
        }
    }

    // ---- write paths ----

    /// Publish a post: pin the content, anchor the hash on chain, wait for
    /// confirmation, refetch the feed.
    pub async fn upload_post(&self, text: &str) -> Result<()> {
        if !self.state.lock().await.projection.has_profile {
            return Err(ClientError::ProfileRequired);
        }
        let command = self.begin_write(EntityKey::Feed, "uploadPost").await?;
        let outcome = async {
            let hash = self
                .store
                .put_json(&PostMetadata { post: text.to_string() })
                .await?;
            let tx = self.gateway.upload_post(&hash).await?;
            self.gateway.await_confirmation(&tx).await
        }
        .await;
        self.finish_write(EntityKey::Feed, command, outcome).await
    }

    /// Tip a post with the configured amount attached.
    pub async fn tip_post(&self, post: PostId) -> Result<()> {
        let command = self.begin_write(EntityKey::Post(post), "tipPostOwner").await?;
        let outcome = async {
            let tx = self.gateway.tip_post_owner(post, self.tip_amount).await?;
            self.gateway.await_confirmation(&tx).await
        }
        .await;
        self.finish_write(EntityKey::Post(post), command, outcome).await
    }

    /// Mint a profile NFT: pin the avatar, pin the metadata document, mint
    /// with the metadata URL as token URI.
    pub async fn mint_profile(
        &self,
        username: &str,
        avatar_file_name: &str,
        avatar: Vec<u8>,
    ) -> Result<()> {
        let command = self.begin_write(EntityKey::Profile, "mint").await?;
        let outcome = async {
            let avatar_hash = self.store.put_file(avatar_file_name, avatar).await?;
            let metadata = ProfileMetadata {
                username: username.to_string(),
                avatar: self.store.public_url(&avatar_hash),
            };
            let metadata_hash = self.store.put_json(&metadata).await?;
            let tx = self.gateway.mint(&self.store.public_url(&metadata_hash)).await?;
            self.gateway.await_confirmation(&tx).await
        }
        .await;
        self.finish_write(EntityKey::Profile, command, outcome).await
    }

    /// Switch the active profile to another owned NFT.
    pub async fn switch_profile(&self, token: TokenId) -> Result<()> {
        let command = self.begin_write(EntityKey::Profile, "setProfile").await?;
        let outcome = async {
            let tx = self.gateway.set_profile(token).await?;
            self.gateway.await_confirmation(&tx).await
        }
        .await;
        self.finish_write(EntityKey::Profile, command, outcome).await
    }

    pub async fn create_event(
        &self,
        name: &str,
        category: &str,
        max_participants: u32,
    ) -> Result<()> {
        let command = self.begin_write(EntityKey::Events, "createEvent").await?;
        let outcome = async {
            let tx = self.gateway.create_event(name, category, max_participants).await?;
            self.gateway.await_confirmation(&tx).await
        }
        .await;
        self.finish_write(EntityKey::Events, command, outcome).await
    }

    /// Join an event with the configured fee attached.
    pub async fn join_event(&self, event: EventId) -> Result<()> {
        let command = self.begin_write(EntityKey::Event(event), "joinEvent").await?;
        let outcome = async {
            let tx = self.gateway.join_event(event, self.join_fee).await?;
            self.gateway.await_confirmation(&tx).await
        }
        .await;
        self.finish_write(EntityKey::Event(event), command, outcome).await
    }

    /// Attach an image to an event: pin the file, anchor its URL and caption.
    pub async fn upload_event_image(
        &self,
        event: EventId,
        file_name: &str,
        image: Vec<u8>,
        caption: &str,
    ) -> Result<()> {
        let command = self.begin_write(EntityKey::Event(event), "uploadImage").await?;
        let outcome = async {
            let hash = self.store.put_file(file_name, image).await?;
            let url = self.store.public_url(&hash);
            let tx = self.gateway.upload_image(event, &url, caption).await?;
            self.gateway.await_confirmation(&tx).await
        }
        .await;
        self.finish_write(EntityKey::Event(event), command, outcome).await
    }

    /// Admit a write command for an entity: at most one in flight, and none
    /// at all while a wallet-change refetch is outstanding.
    async fn begin_write(&self, key: EntityKey, method: &str) -> Result<Uuid> {
        let mut st = self.state.lock().await;
        if st.invalidating {
            return Err(ClientError::ConflictingOperation {
                entity: "view refetch after wallet change".to_string(),
            });
        }
        if st.projection.state(&key) == EntityState::Pending {
            return Err(ClientError::ConflictingOperation {
                entity: key.to_string(),
            });
        }
        let id = Uuid::new_v4();
        debug!(command = %id, entity = %key, method, "Write command admitted");
        st.projection.pending.push(PendingCommand {
            id,
            entity: key.clone(),
            method: method.to_string(),
        });
        st.projection.set_state(key, EntityState::Pending);
        Ok(id)
    }

    /// Resolve a write: on confirmation, refetch from the chain (on-chain
    /// state is authoritative, the request payload is not); on failure, keep
    /// last-known-good data behind an error badge.
    async fn finish_write(
        &self,
        key: EntityKey,
        command: Uuid,
        outcome: Result<Confirmation>,
    ) -> Result<()> {
        {
            let mut st = self.state.lock().await;
            st.projection.pending.retain(|c| c.id != command);
            match &outcome {
                Ok(confirmation) => {
                    debug!(command = %command, entity = %key, block = confirmation.block_ref, "Write confirmed");
                    st.projection.set_state(key.clone(), EntityState::Clean);
                }
                Err(e) => {
                    warn!(command = %command, entity = %key, error = %e, "Write failed");
                    st.projection
                        .set_state(key.clone(), EntityState::Error { message: e.to_string() });
                }
            }
        }
        match outcome {
            Ok(_) => {
                self.retry(key).await;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
