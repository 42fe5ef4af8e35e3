//! View controller integration tests
//!
//! Drives the controller through in-memory fake capabilities:
//! - a scripted contract world that applies submissions and answers queries
//! - a CID-addressed memory store
//! - a channel-backed wallet provider
//!
//! Covers load-cycle ordering, write conflict rejection, post round-trips,
//! sort stability, profile gating, event joins, and wallet-change
//! invalidation.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::broadcast;

use agora_client::contract::{ContractCapability, ContractGateway, TxHash, TxReceipt};
use agora_client::controller::{EntityKey, EntityState, ViewController};
use agora_client::error::{ClientError, Result};
use agora_client::store::ContentStore;
use agora_client::types::{
    Address, Amount, ContentHash, Event, EventId, EventImage, Post, PostId, ProfileMetadata,
    TokenId,
};
use agora_client::wallet::{WalletEvent, WalletProvider, WalletSession};

// =============================================================================
// Fake capabilities
// =============================================================================

struct FakeWallet {
    accounts: Mutex<Vec<Address>>,
    chain: AtomicU64,
    events: broadcast::Sender<WalletEvent>,
}

impl FakeWallet {
    fn new(accounts: Vec<Address>, chain: u64) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            accounts: Mutex::new(accounts),
            chain: AtomicU64::new(chain),
            events,
        }
    }
}

#[async_trait]
impl WalletProvider for FakeWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>> {
        Ok(self.accounts.lock().unwrap().clone())
    }

    async fn chain_id(&self) -> Result<u64> {
        Ok(self.chain.load(Ordering::SeqCst))
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}

#[derive(Default)]
struct World {
    posts: Vec<Post>,
    owned: HashMap<Address, Vec<TokenId>>,
    active_profile: HashMap<Address, TokenId>,
    token_uris: HashMap<TokenId, String>,
    events: Vec<Event>,
    next_token: u64,
    next_post: u64,
}

struct FakeContract {
    world: Mutex<World>,
    sender: Address,
    hold_receipts: AtomicBool,
    revert_next: AtomicBool,
    query_delay: Mutex<Duration>,
    last_value: Mutex<Option<Amount>>,
    next_tx: AtomicU64,
}

impl FakeContract {
    fn new(sender: Address) -> Self {
        Self {
            world: Mutex::new(World::default()),
            sender,
            hold_receipts: AtomicBool::new(false),
            revert_next: AtomicBool::new(false),
            query_delay: Mutex::new(Duration::ZERO),
            last_value: Mutex::new(None),
            next_tx: AtomicU64::new(1),
        }
    }

    fn set_query_delay(&self, delay: Duration) {
        *self.query_delay.lock().unwrap() = delay;
    }

    fn last_value(&self) -> Option<Amount> {
        *self.last_value.lock().unwrap()
    }

    fn seed_post(&self, id: u64, author: &Address, hash: ContentHash, tip_ether: &str) {
        let mut world = self.world.lock().unwrap();
        world.posts.push(Post {
            id: PostId(id),
            author: author.clone(),
            hash,
            tip_total: Amount::parse_ether(tip_ether).unwrap(),
        });
        world.next_post = world.next_post.max(id);
    }

    fn seed_event(&self, id: u64, name: &str, category: &str, max_participants: u32) {
        let mut world = self.world.lock().unwrap();
        world.events.push(Event {
            id: EventId(id),
            name: name.to_string(),
            category: category.to_string(),
            max_participants,
            participants: Default::default(),
            images: Vec::new(),
        });
    }

    fn seed_profile(&self, owner: &Address, token_uri: &str) -> TokenId {
        let mut world = self.world.lock().unwrap();
        world.next_token += 1;
        let token = TokenId(world.next_token);
        world.owned.entry(owner.clone()).or_default().push(token);
        world.token_uris.insert(token, token_uri.to_string());
        world.active_profile.insert(owner.clone(), token);
        token
    }

    fn replace_posts(&self, posts: Vec<Post>) {
        self.world.lock().unwrap().posts = posts;
    }

    fn event_participants(&self, id: u64) -> usize {
        let world = self.world.lock().unwrap();
        world
            .events
            .iter()
            .find(|e| e.id == EventId(id))
            .map(|e| e.participants.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl ContractCapability for FakeContract {
    async fn query(&self, method: &str, params: Value) -> Result<Value> {
        let delay = *self.query_delay.lock().unwrap();
        if delay > Duration::ZERO {
            tokio::time::sleep(delay).await;
        }

        let world = self.world.lock().unwrap();
        let answer = match method {
            "getAllPosts" => json!(world.posts),
            "balanceOf" => {
                let owner = param_address(&params, 0)?;
                json!(world.owned.get(&owner).map_or(0, Vec::len))
            }
            "profiles" => {
                let owner = param_address(&params, 0)?;
                json!(world.active_profile.get(&owner).copied().unwrap_or(TokenId(0)))
            }
            "tokenURI" => {
                let token = TokenId(param_u64(&params, 0)?);
                json!(world.token_uris.get(&token).cloned().unwrap_or_default())
            }
            "getMyNfts" => {
                let owner = param_address(&params, 0)?;
                json!(world.owned.get(&owner).cloned().unwrap_or_default())
            }
            "eventCount" => json!(world.events.len() as u64),
            "events" => {
                let id = EventId(param_u64(&params, 0)?);
                let event = world
                    .events
                    .iter()
                    .find(|e| e.id == id)
                    .ok_or_else(|| ClientError::Rpc(format!("no event {id}")))?;
                json!(event)
            }
            other => return Err(ClientError::Rpc(format!("unknown query {other}"))),
        };
        Ok(answer)
    }

    async fn submit(&self, method: &str, params: Value, value: Option<Amount>) -> Result<TxHash> {
        *self.last_value.lock().unwrap() = value;

        // A reverted submission still enters the mempool; the failure only
        // shows up in its receipt.
        if self.revert_next.swap(false, Ordering::SeqCst) {
            let n = self.next_tx.fetch_add(1, Ordering::SeqCst);
            return Ok(TxHash(format!("0xreverted{n}")));
        }

        {
            let mut world = self.world.lock().unwrap();
            match method {
                "uploadPost" => {
                    let hash = ContentHash::parse(param_str(&params, 0)?)?;
                    world.next_post += 1;
                    let id = PostId(world.next_post);
                    world.posts.push(Post {
                        id,
                        author: self.sender.clone(),
                        hash,
                        tip_total: Amount::ZERO,
                    });
                }
                "tipPostOwner" => {
                    let id = PostId(param_u64(&params, 0)?);
                    let tip = value.unwrap_or(Amount::ZERO);
                    if let Some(post) = world.posts.iter_mut().find(|p| p.id == id) {
                        post.tip_total = Amount::wei(post.tip_total.0 + tip.0);
                    }
                }
                "mint" => {
                    let uri = param_str(&params, 0)?.to_string();
                    world.next_token += 1;
                    let token = TokenId(world.next_token);
                    world.owned.entry(self.sender.clone()).or_default().push(token);
                    world.token_uris.insert(token, uri);
                    world.active_profile.insert(self.sender.clone(), token);
                }
                "setProfile" => {
                    let token = TokenId(param_u64(&params, 0)?);
                    world.active_profile.insert(self.sender.clone(), token);
                }
                "createEvent" => {
                    let id = EventId(world.events.len() as u64 + 1);
                    world.events.push(Event {
                        id,
                        name: param_str(&params, 0)?.to_string(),
                        category: param_str(&params, 1)?.to_string(),
                        max_participants: param_u64(&params, 2)? as u32,
                        participants: Default::default(),
                        images: Vec::new(),
                    });
                }
                "joinEvent" => {
                    let id = EventId(param_u64(&params, 0)?);
                    let sender = self.sender.clone();
                    if let Some(event) = world.events.iter_mut().find(|e| e.id == id) {
                        event.participants.insert(sender);
                    }
                }
                "uploadImage" => {
                    let id = EventId(param_u64(&params, 0)?);
                    let url = param_str(&params, 1)?.to_string();
                    let caption = param_str(&params, 2)?.to_string();
                    if let Some(event) = world.events.iter_mut().find(|e| e.id == id) {
                        event.images.push(EventImage { url, caption });
                    }
                }
                other => return Err(ClientError::Rpc(format!("unknown submission {other}"))),
            }
        }

        let n = self.next_tx.fetch_add(1, Ordering::SeqCst);
        Ok(TxHash(format!("0xtx{n}")))
    }

    async fn receipt(&self, tx: &TxHash) -> Result<Option<TxReceipt>> {
        if self.hold_receipts.load(Ordering::SeqCst) {
            return Ok(None);
        }
        if tx.0.starts_with("0xreverted") {
            return Ok(Some(TxReceipt {
                status: false,
                block_number: 7,
                revert_reason: Some("execution reverted".to_string()),
            }));
        }
        Ok(Some(TxReceipt {
            status: true,
            block_number: 7,
            revert_reason: None,
        }))
    }
}

fn param_str(params: &Value, index: usize) -> Result<&str> {
    params
        .get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| ClientError::Rpc(format!("missing string param {index}")))
}

fn param_u64(params: &Value, index: usize) -> Result<u64> {
    params
        .get(index)
        .and_then(Value::as_u64)
        .ok_or_else(|| ClientError::Rpc(format!("missing numeric param {index}")))
}

fn param_address(params: &Value, index: usize) -> Result<Address> {
    Address::parse(param_str(params, index)?)
}

#[derive(Default)]
struct FakeStore {
    blobs: Mutex<HashMap<ContentHash, Vec<u8>>>,
    get_delay: Mutex<Duration>,
}

impl FakeStore {
    fn set_get_delay(&self, delay: Duration) {
        *self.get_delay.lock().unwrap() = delay;
    }
}

#[async_trait]
impl ContentStore for FakeStore {
    async fn put(&self, bytes: Vec<u8>) -> Result<ContentHash> {
        let hash = ContentHash::from_bytes(&bytes);
        self.blobs.lock().unwrap().insert(hash.clone(), bytes);
        Ok(hash)
    }

    async fn put_file(&self, _file_name: &str, bytes: Vec<u8>) -> Result<ContentHash> {
        self.put(bytes).await
    }

    async fn get(&self, hash: &ContentHash) -> Result<Vec<u8>> {
        let delay = *self.get_delay.lock().unwrap();
        if delay > Duration::ZERO {
            tokio::time::sleep(delay).await;
        }
        self.blobs
            .lock()
            .unwrap()
            .get(hash)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(hash.clone()))
    }

    fn public_url(&self, hash: &ContentHash) -> String {
        format!("https://store.test/ipfs/{hash}")
    }
}

// =============================================================================
// Harness
// =============================================================================

struct Harness {
    controller: Arc<ViewController>,
    contract: Arc<FakeContract>,
    store: Arc<FakeStore>,
}

fn addr(n: u8) -> Address {
    Address::parse(&format!("0x{:040x}", n)).unwrap()
}

fn harness() -> Harness {
    let wallet = Arc::new(FakeWallet::new(vec![addr(1)], 31337));
    let store = Arc::new(FakeStore::default());
    let contract = Arc::new(FakeContract::new(addr(1)));
    let gateway = Arc::new(ContractGateway::new(contract.clone(), 90, 10));
    let controller = Arc::new(ViewController::new(
        WalletSession::new(wallet),
        gateway,
        store.clone(),
        Amount::parse_ether("0.1").unwrap(),
        Amount::parse_ether("5.0").unwrap(),
    ));
    Harness {
        controller,
        contract,
        store,
    }
}

/// Pin profile metadata and register the NFT in the contract world.
async fn seed_profile(h: &Harness, owner: &Address, username: &str) -> TokenId {
    let metadata = ProfileMetadata {
        username: username.to_string(),
        avatar: "https://store.test/avatar.png".to_string(),
    };
    let hash = h.store.put(serde_json::to_vec(&metadata).unwrap()).await.unwrap();
    let uri = h.store.public_url(&hash);
    h.contract.seed_profile(owner, &uri)
}

/// Pin post content and register the post in the contract world.
async fn seed_post(h: &Harness, id: u64, author: &Address, text: &str, tip_ether: &str) {
    let bytes = serde_json::to_vec(&json!({ "post": text })).unwrap();
    let hash = h.store.put(bytes).await.unwrap();
    h.contract.seed_post(id, author, hash, tip_ether);
}

// =============================================================================
// Load cycles and ordering
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_superseded_load_cycle_is_discarded() {
    let h = harness();
    seed_profile(&h, &addr(1), "alice").await;
    seed_post(&h, 1, &addr(1), "old content", "1").await;
    h.controller.connect().await.unwrap();

    // Cycle A: starts first, suspends on a slow content fetch
    h.store.set_get_delay(Duration::from_millis(200));
    let slow = {
        let controller = h.controller.clone();
        tokio::spawn(async move { controller.refresh_feed().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    // The world moves on while A is in flight
    h.store.set_get_delay(Duration::ZERO);
    let new_hash = h
        .store
        .put(serde_json::to_vec(&json!({ "post": "new content" })).unwrap())
        .await
        .unwrap();
    h.contract.replace_posts(vec![Post {
        id: PostId(2),
        author: addr(1),
        hash: new_hash,
        tip_total: Amount::ZERO,
    }]);

    // Cycle B: issued later, completes first
    h.controller.refresh_feed().await;
    let projection = h.controller.projection().await;
    assert_eq!(projection.posts.len(), 1);
    assert_eq!(projection.posts[0].content.as_deref(), Some("new content"));

    // Cycle A now completes; its stale snapshot must not land
    slow.await.unwrap();
    let projection = h.controller.projection().await;
    assert_eq!(projection.posts.len(), 1);
    assert_eq!(projection.posts[0].id, PostId(2));
    assert_eq!(projection.posts[0].content.as_deref(), Some("new content"));
}

#[tokio::test(start_paused = true)]
async fn test_sort_stability_with_tip_ties() {
    let h = harness();
    seed_profile(&h, &addr(1), "alice").await;
    seed_post(&h, 2, &addr(1), "two", "5").await;
    seed_post(&h, 1, &addr(1), "one", "5").await;
    seed_post(&h, 3, &addr(1), "three", "2").await;
    h.controller.connect().await.unwrap();

    let first: Vec<u64> = h.controller.projection().await.posts.iter().map(|p| p.id.0).collect();
    assert_eq!(first, vec![1, 2, 3]);

    // Reloading must not reshuffle the ties
    h.controller.refresh_feed().await;
    let second: Vec<u64> = h.controller.projection().await.posts.iter().map(|p| p.id.0).collect();
    assert_eq!(first, second);
}

// =============================================================================
// Write commands
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_post_round_trip() {
    let h = harness();
    seed_profile(&h, &addr(1), "alice").await;
    h.controller.connect().await.unwrap();

    h.controller.upload_post("hello agora").await.unwrap();

    let projection = h.controller.projection().await;
    assert_eq!(projection.posts.len(), 1);
    assert_eq!(projection.posts[0].content.as_deref(), Some("hello agora"));
    assert_eq!(
        projection.posts[0].author.as_ref().map(|a| a.username.as_str()),
        Some("alice")
    );
    assert_eq!(projection.state(&EntityKey::Feed), EntityState::Clean);
}

#[tokio::test(start_paused = true)]
async fn test_post_without_profile_is_rejected() {
    let h = harness();
    h.controller.connect().await.unwrap();

    let projection = h.controller.projection().await;
    assert!(!projection.has_profile);

    let err = h.controller.upload_post("anyone there?").await.unwrap_err();
    assert!(matches!(err, ClientError::ProfileRequired));
    assert!(h.controller.projection().await.posts.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_write_while_pending_is_rejected() {
    let h = harness();
    seed_profile(&h, &addr(1), "alice").await;
    seed_post(&h, 1, &addr(1), "tippable", "0").await;
    h.controller.connect().await.unwrap();

    // First tip submits but its confirmation is held back
    h.contract.hold_receipts.store(true, Ordering::SeqCst);
    let in_flight = {
        let controller = h.controller.clone();
        tokio::spawn(async move { controller.tip_post(PostId(1)).await })
    };
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(
        h.controller.projection().await.state(&EntityKey::Post(PostId(1))),
        EntityState::Pending
    );

    // Second tip on the same post: rejected, not queued, state unchanged
    let err = h.controller.tip_post(PostId(1)).await.unwrap_err();
    assert!(matches!(err, ClientError::ConflictingOperation { .. }));
    assert_eq!(
        h.controller.projection().await.state(&EntityKey::Post(PostId(1))),
        EntityState::Pending
    );

    // Release the confirmation; exactly one tip lands
    h.contract.hold_receipts.store(false, Ordering::SeqCst);
    in_flight.await.unwrap().unwrap();

    let projection = h.controller.projection().await;
    assert_eq!(
        projection.posts[0].tip_total,
        Amount::parse_ether("0.1").unwrap()
    );
    assert_eq!(
        projection.state(&EntityKey::Post(PostId(1))),
        EntityState::Clean
    );
}

#[tokio::test(start_paused = true)]
async fn test_reverted_write_keeps_last_known_good() {
    let h = harness();
    seed_profile(&h, &addr(1), "alice").await;
    seed_post(&h, 1, &addr(1), "steady", "1").await;
    h.controller.connect().await.unwrap();

    h.contract.revert_next.store(true, Ordering::SeqCst);
    let err = h.controller.tip_post(PostId(1)).await.unwrap_err();
    assert!(matches!(err, ClientError::TxReverted { .. }));

    let projection = h.controller.projection().await;
    // Error badge on the entity, data retained untouched
    assert!(matches!(
        projection.state(&EntityKey::Post(PostId(1))),
        EntityState::Error { .. }
    ));
    assert_eq!(projection.posts[0].tip_total, Amount::parse_ether("1").unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_mint_and_switch_profile() {
    let h = harness();
    h.controller.connect().await.unwrap();
    assert!(!h.controller.projection().await.has_profile);

    h.controller
        .mint_profile("alice", "alice.png", b"png bytes".to_vec())
        .await
        .unwrap();

    let projection = h.controller.projection().await;
    assert!(projection.has_profile);
    assert_eq!(
        projection.active_profile.as_ref().map(|p| p.username.as_str()),
        Some("alice")
    );

    h.controller
        .mint_profile("alice-alt", "alt.png", b"other bytes".to_vec())
        .await
        .unwrap();
    let second = h
        .controller
        .projection()
        .await
        .my_nfts
        .iter()
        .map(|p| p.token_id)
        .max()
        .unwrap();

    h.controller.switch_profile(second).await.unwrap();
    let projection = h.controller.projection().await;
    assert_eq!(
        projection.active_profile.as_ref().map(|p| p.username.as_str()),
        Some("alice-alt")
    );
    assert_eq!(projection.my_nfts.len(), 2);
}

// =============================================================================
// Events
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_join_event_attaches_fee_and_refetches() {
    let h = harness();
    seed_profile(&h, &addr(1), "alice").await;
    h.contract.seed_event(1, "meme night", "Meme", 2);
    h.contract.seed_event(2, "art drop", "Art", 5);
    h.contract.seed_event(3, "open mic", "Random", 8);
    h.controller.connect().await.unwrap();

    let projection = h.controller.projection().await;
    assert_eq!(projection.events.len(), 3);
    assert!(projection.events.iter().all(|e| e.participants.is_empty()));

    h.controller.join_event(EventId(2)).await.unwrap();

    // The configured fee rode along with the submission
    assert_eq!(h.contract.last_value(), Some(Amount::parse_ether("5.0").unwrap()));
    assert_eq!(h.contract.event_participants(2), 1);

    // And the refetched projection reflects exactly one new participant
    let projection = h.controller.projection().await;
    let joined = projection.events.iter().find(|e| e.id == EventId(2)).unwrap();
    assert_eq!(joined.participants.len(), 1);
    assert!(joined.participants.contains(&addr(1)));
    let others: Vec<usize> = projection
        .events
        .iter()
        .filter(|e| e.id != EventId(2))
        .map(|e| e.participants.len())
        .collect();
    assert_eq!(others, vec![0, 0]);
}

#[tokio::test(start_paused = true)]
async fn test_create_event_and_upload_image() {
    let h = harness();
    seed_profile(&h, &addr(1), "alice").await;
    h.controller.connect().await.unwrap();

    h.controller.create_event("lit corner", "Literature", 5).await.unwrap();
    let projection = h.controller.projection().await;
    assert_eq!(projection.events.len(), 1);
    assert_eq!(projection.events[0].name, "lit corner");

    h.controller
        .upload_event_image(EventId(1), "entry.png", b"image bytes".to_vec(), "my entry")
        .await
        .unwrap();
    let projection = h.controller.projection().await;
    let images = &projection.events[0].images;
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].caption, "my entry");
    assert!(images[0].url.contains("/ipfs/"));
}

// =============================================================================
// Wallet change invalidation
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_wallet_change_marks_stale_and_blocks_writes() {
    let h = harness();
    seed_profile(&h, &addr(1), "alice").await;
    seed_post(&h, 1, &addr(1), "before", "0").await;
    h.controller.connect().await.unwrap();

    // Slow the refetch down so the invalidation window stays open
    h.contract.set_query_delay(Duration::from_millis(200));
    let invalidation = {
        let controller = h.controller.clone();
        tokio::spawn(async move {
            controller
                .handle_wallet_event(WalletEvent::AccountsChanged(vec![addr(2)]))
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(5)).await;

    // Mid-invalidation: everything is stale and writes are refused
    let projection = h.controller.projection().await;
    assert_eq!(projection.state(&EntityKey::Feed), EntityState::Stale);
    assert_eq!(projection.state(&EntityKey::Events), EntityState::Stale);
    assert_eq!(projection.state(&EntityKey::Profile), EntityState::Stale);
    let err = h.controller.tip_post(PostId(1)).await.unwrap_err();
    assert!(matches!(err, ClientError::ConflictingOperation { .. }));

    invalidation.await.unwrap();

    // Refetch complete: new identity, clean view, writes accepted again
    let projection = h.controller.projection().await;
    assert_eq!(projection.session.wallet_address, Some(addr(2)));
    assert_eq!(projection.state(&EntityKey::Feed), EntityState::Clean);
    assert!(!projection.has_profile); // addr(2) owns nothing
    h.contract.set_query_delay(Duration::ZERO);
    h.controller.tip_post(PostId(1)).await.unwrap();
}

// =============================================================================
// Partial store failures
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_missing_content_badges_post_without_blanking_feed() {
    let h = harness();
    seed_profile(&h, &addr(1), "alice").await;
    seed_post(&h, 1, &addr(1), "fetchable", "1").await;
    // A post whose content was never pinned
    h.contract.seed_post(
        2,
        &addr(1),
        ContentHash::from_bytes(b"never pinned"),
        "3",
    );
    h.controller.connect().await.unwrap();

    let projection = h.controller.projection().await;
    assert_eq!(projection.posts.len(), 2);
    assert_eq!(projection.state(&EntityKey::Feed), EntityState::Clean);

    let broken = projection.posts.iter().find(|p| p.id == PostId(2)).unwrap();
    assert!(broken.content.is_none());
    assert!(broken.fetch_error.is_some());

    let intact = projection.posts.iter().find(|p| p.id == PostId(1)).unwrap();
    assert_eq!(intact.content.as_deref(), Some("fetchable"));
    assert!(intact.fetch_error.is_none());
}

// =============================================================================
// Projection invariants
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_feed_never_contains_duplicate_ids() {
    let h = harness();
    seed_profile(&h, &addr(1), "alice").await;
    seed_post(&h, 1, &addr(1), "first", "1").await;
    h.controller.connect().await.unwrap();

    for _ in 0..3 {
        h.controller.refresh_feed().await;
    }
    let projection = h.controller.projection().await;
    let mut seen = HashSet::new();
    for post in &projection.posts {
        assert!(seen.insert(post.id), "duplicate post id {}", post.id);
    }
}
