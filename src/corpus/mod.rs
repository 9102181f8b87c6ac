//! Corpus data model: records, shards and corpus metadata.
//!
//! The corpus is consumed, not owned: shards are fixed-size partitions
//! published as JSON (`shard_{index}.json`) next to a `meta.json` carrying the
//! shard count and the cache-invalidation version.

pub mod fetcher;

pub use fetcher::{fetch_many, FetchedShard, HttpShardFetcher, ShardFetcher, StaticShardFetcher};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Shard index within the corpus.
pub type ShardIndex = u32;

/// Record identifier, unique across the whole corpus (not just its shard).
/// The published corpus uses either strings or integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(u64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(n) => write!(f, "{n}"),
            RecordId::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId::Text(s.to_string())
    }
}

impl From<u64> for RecordId {
    fn from(n: u64) -> Self {
        RecordId::Int(n)
    }
}

/// One transcript record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub text: String,
}

/// A fetched shard: its index plus the records it carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shard {
    pub index: ShardIndex,
    pub records: Vec<Record>,
}

/// Corpus metadata published alongside the shards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusMeta {
    /// Number of shards in the corpus snapshot
    pub total_shards: u32,
    /// Opaque version string; any change invalidates the entire shard cache
    pub data_version: String,
}
