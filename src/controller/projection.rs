//! Projection and per-entity bookkeeping
//!
//! The projection is the authoritative in-memory view of what the user
//! should see right now. It is mutated exclusively by the controller, which
//! runs on a single logical thread; every entry carries a tracked state and
//! every in-flight request carries a sequence number so that completions
//! resolve last-writer-wins by issue order, not completion order.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use uuid::Uuid;

use crate::types::{Event, EventId, FeedPost, PostId, Profile, Session};

/// Tracked entity identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKey {
    Feed,
    Events,
    Profile,
    Post(PostId),
    Event(EventId),
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Feed => write!(f, "feed"),
            Self::Events => write!(f, "events"),
            Self::Profile => write!(f, "profile"),
            Self::Post(id) => write!(f, "post {id}"),
            Self::Event(id) => write!(f, "event {id}"),
        }
    }
}

/// Per-entity synchronization state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EntityState {
    /// Matches the last confirmed source of truth.
    #[default]
    Clean,
    /// A write command is in flight; conflicting reads and writes are held off.
    Pending,
    /// Invalidated by an external change notification; needs refetch.
    Stale,
    /// Last operation failed; last-known-good data is retained and badged.
    Error { message: String },
}

/// A write command awaiting confirmation.
#[derive(Debug, Clone)]
pub struct PendingCommand {
    pub id: Uuid,
    pub entity: EntityKey,
    pub method: String,
}

/// The derived view. Posts are kept sorted by tip total descending with ties
/// broken by ascending id; no entity id ever appears twice.
#[derive(Debug, Clone, Default)]
pub struct Projection {
    pub session: Session,
    pub has_profile: bool,
    pub active_profile: Option<Profile>,
    pub my_nfts: Vec<Profile>,
    pub posts: Vec<FeedPost>,
    pub events: Vec<Event>,
    states: HashMap<EntityKey, EntityState>,
    pub pending: Vec<PendingCommand>,
}

impl Projection {
    pub fn state(&self, key: &EntityKey) -> EntityState {
        self.states.get(key).cloned().unwrap_or_default()
    }

    pub fn set_state(&mut self, key: EntityKey, state: EntityState) {
        self.states.insert(key, state);
    }

    /// External change notification: every tracked entity needs a refetch.
    pub fn mark_all_stale(&mut self) {
        for state in self.states.values_mut() {
            *state = EntityState::Stale;
        }
        for key in [EntityKey::Feed, EntityKey::Events, EntityKey::Profile] {
            self.states.insert(key, EntityState::Stale);
        }
    }

    /// Replace the feed with a complete snapshot: dedupe by id (first entry
    /// wins), then sort by tip total descending, id ascending.
    pub fn set_posts(&mut self, posts: Vec<FeedPost>) {
        let mut by_id: BTreeMap<PostId, FeedPost> = BTreeMap::new();
        for post in posts {
            by_id.entry(post.id).or_insert(post);
        }
        let mut posts: Vec<FeedPost> = by_id.into_values().collect();
        posts.sort_by(|a, b| b.tip_total.cmp(&a.tip_total).then(a.id.cmp(&b.id)));
        self.posts = posts;
    }

    /// Replace the event list, deduped by id and ordered ascending.
    pub fn set_events(&mut self, events: Vec<Event>) {
        let mut by_id: BTreeMap<EventId, Event> = BTreeMap::new();
        for event in events {
            by_id.entry(event.id).or_insert(event);
        }
        self.events = by_id.into_values().collect();
    }
}

/// Sequence gate for one entity: `begin` tags a new request, `try_apply`
/// accepts a completion only if nothing newer has already been applied.
#[derive(Debug, Default)]
struct SeqGate {
    issued: u64,
    applied: u64,
}

impl SeqGate {
    fn begin(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    fn try_apply(&mut self, seq: u64) -> bool {
        if seq > self.applied {
            self.applied = seq;
            true
        } else {
            false
        }
    }
}

/// Per-entity sequence gates.
#[derive(Debug, Default)]
pub struct SeqRegistry {
    gates: HashMap<EntityKey, SeqGate>,
}

impl SeqRegistry {
    pub fn begin(&mut self, key: EntityKey) -> u64 {
        self.gates.entry(key).or_default().begin()
    }

    pub fn try_apply(&mut self, key: EntityKey, seq: u64) -> bool {
        self.gates.entry(key).or_default().try_apply(seq)
    }
}
