//! Domain model
//!
//! Identifiers, amounts, and the entity shapes shared between the gateway,
//! the store adapter, and the view controller. Pinned-metadata structs are
//! wire-compatible with the JSON documents the contract points at.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use cid::Cid;
use multihash_codetable::{Code, MultihashDigest};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ClientError, Result};

/// Raw codec for CIDv1 (plain bytes, no IPLD structure)
const RAW_CODEC: u64 = 0x55;

const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

/// Lowercase 0x-prefixed account address.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn parse(s: &str) -> Result<Self> {
        let hex_part = s
            .strip_prefix("0x")
            .ok_or_else(|| ClientError::InvalidAddress(s.to_string()))?;
        if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ClientError::InvalidAddress(s.to_string()));
        }
        Ok(Self(format!("0x{}", hex_part.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for display: 0x1234...abcd
    pub fn short(&self) -> String {
        format!("{}...{}", &self.0[..6], &self.0[38..])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(v: u64) -> Self {
                Self(v)
            }
        }
    };
}

id_newtype!(TokenId);
id_newtype!(PostId);
id_newtype!(EventId);

/// Native-currency amount in wei. Serialized as a decimal string since JSON
/// numbers cannot carry a u128.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(pub u128);

impl Amount {
    pub const ZERO: Self = Self(0);

    pub fn wei(v: u128) -> Self {
        Self(v)
    }

    /// Parse a decimal ether string such as "0.1" or "5" into wei.
    pub fn parse_ether(s: &str) -> Result<Self> {
        let bad = || ClientError::InvalidAmount(s.to_string());
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if (whole.is_empty() && frac.is_empty()) || frac.len() > 18 {
            return Err(bad());
        }
        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| bad())?
        };
        let frac: u128 = if frac.is_empty() {
            0
        } else {
            format!("{:0<18}", frac).parse().map_err(|_| bad())?
        };
        whole
            .checked_mul(WEI_PER_ETHER)
            .and_then(|w| w.checked_add(frac))
            .map(Self)
            .ok_or_else(bad)
    }

    /// Render as a decimal ether string with trailing zeros trimmed.
    pub fn format_ether(&self) -> String {
        let whole = self.0 / WEI_PER_ETHER;
        let frac = self.0 % WEI_PER_ETHER;
        if frac == 0 {
            return whole.to_string();
        }
        let frac = format!("{frac:018}");
        format!("{whole}.{}", frac.trim_end_matches('0'))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_ether())
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<u128>()
            .map(Self)
            .map_err(|_| serde::de::Error::custom(format!("invalid wei amount: {s}")))
    }
}

/// CIDv1 content address. Accepts raw CID strings and gateway URIs of the
/// form `…/ipfs/<cid>`, since on-chain pointers store both.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn parse(s: &str) -> Result<Self> {
        let candidate = match s.rsplit_once("/ipfs/") {
            Some((_, cid)) => cid,
            None => s,
        };
        let candidate = candidate.trim_end_matches('/');
        Cid::try_from(candidate).map_err(|_| ClientError::InvalidHash(s.to_string()))?;
        Ok(Self(candidate.to_string()))
    }

    /// Compute the CIDv1 (raw codec, SHA2-256) for a blob.
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Code::Sha2_256.digest(data);
        Self(Cid::new_v1(RAW_CODEC, hash).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ContentHash {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Wallet session. Owned exclusively by the wallet module; reset on
/// disconnect or network change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    pub wallet_address: Option<Address>,
    pub chain_id: u64,
    pub connected: bool,
}

/// An owned profile NFT, hydrated from its pinned metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub token_id: TokenId,
    pub username: String,
    pub avatar: String,
}

/// Pinned JSON document a profile token URI points at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileMetadata {
    pub username: String,
    pub avatar: String,
}

/// On-chain post record as returned by the contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author: Address,
    pub hash: ContentHash,
    #[serde(rename = "tipAmount")]
    pub tip_total: Amount,
}

/// Pinned JSON document an on-chain post points at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostMetadata {
    pub post: String,
}

/// Author identity shown next to a feed post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorCard {
    pub address: Address,
    pub username: String,
    pub avatar: String,
}

/// A post hydrated for display. Content and author are absent if their
/// fetch failed during the load cycle; `fetch_error` carries the badge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedPost {
    pub id: PostId,
    pub tip_total: Amount,
    pub content: Option<String>,
    pub author: Option<AuthorCard>,
    pub fetch_error: Option<String>,
}

/// On-chain event record. Participant capacity is enforced by the contract,
/// not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub category: String,
    #[serde(rename = "maxParticipants")]
    pub max_participants: u32,
    #[serde(default)]
    pub participants: BTreeSet<Address>,
    #[serde(default)]
    pub images: Vec<EventImage>,
}

/// Image attached to an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventImage {
    pub url: String,
    pub caption: String,
}
