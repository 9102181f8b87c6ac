//! Network shard retrieval.
//!
//! Shard-level fetch failure is non-fatal by design: a failed or non-OK fetch
//! yields an empty record list (flagged so the coordinator can count it),
//! never an error. Undercounting from missing shards is surfaced only as an
//! aggregate `failed_shards` number in the final result.

use crate::corpus::{CorpusMeta, Record, ShardIndex};
use crate::error::EngineError;
use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use tracing::warn;

/// Outcome of fetching one shard.
#[derive(Debug, Clone)]
pub struct FetchedShard {
    pub index: ShardIndex,
    pub records: Vec<Record>,
    /// True when the fetch failed and `records` is an empty stand-in
    pub failed: bool,
}

/// Source of shard payloads. The HTTP implementation is the production one;
/// tests substitute an in-memory implementation.
#[async_trait]
pub trait ShardFetcher: Send + Sync {
    async fn fetch(&self, index: ShardIndex) -> FetchedShard;
}

/// Fetch `indices` with at most `concurrency` requests in flight, yielding
/// shards as they arrive (arrival order is not index order).
pub fn fetch_many<'a>(
    fetcher: &'a dyn ShardFetcher,
    indices: &[ShardIndex],
    concurrency: usize,
) -> impl Stream<Item = FetchedShard> + 'a {
    futures::stream::iter(indices.to_vec())
        .map(move |index| fetcher.fetch(index))
        .buffer_unordered(concurrency.max(1))
}

/// Fetches shards over HTTP from a base URL hosting `meta.json` and
/// `shard_{index}.json` files.
pub struct HttpShardFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpShardFetcher {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Retrieve corpus metadata. Unlike shard fetches this is fatal on
    /// failure: without it no scan can be planned.
    pub async fn fetch_meta(&self) -> Result<CorpusMeta, EngineError> {
        let url = format!("{}/meta.json", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| EngineError::CorpusMeta(e.to_string()))?;
        if !response.status().is_success() {
            return Err(EngineError::CorpusMeta(format!(
                "{url}: HTTP {}",
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| EngineError::CorpusMeta(e.to_string()))
    }

    async fn fetch_records(&self, index: ShardIndex) -> Result<Vec<Record>, String> {
        let url = format!("{}/shard_{}.json", self.base_url, index);
        let response = self.client.get(&url).send().await.map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status()));
        }
        response.json().await.map_err(|e| e.to_string())
    }
}

#[async_trait]
impl ShardFetcher for HttpShardFetcher {
    async fn fetch(&self, index: ShardIndex) -> FetchedShard {
        match self.fetch_records(index).await {
            Ok(records) => FetchedShard {
                index,
                records,
                failed: false,
            },
            Err(reason) => {
                warn!(shard = index, %reason, "shard fetch failed, treating as empty");
                FetchedShard {
                    index,
                    records: Vec::new(),
                    failed: true,
                }
            }
        }
    }
}

/// Serves a preloaded, in-memory corpus. Used by tests and offline scans;
/// unknown indices behave like failed fetches.
pub struct StaticShardFetcher {
    shards: std::collections::HashMap<ShardIndex, Vec<Record>>,
}

impl StaticShardFetcher {
    pub fn new(shards: std::collections::HashMap<ShardIndex, Vec<Record>>) -> Self {
        Self { shards }
    }
}

#[async_trait]
impl ShardFetcher for StaticShardFetcher {
    async fn fetch(&self, index: ShardIndex) -> FetchedShard {
        match self.shards.get(&index) {
            Some(records) => FetchedShard {
                index,
                records: records.clone(),
                failed: false,
            },
            None => FetchedShard {
                index,
                records: Vec::new(),
                failed: true,
            },
        }
    }
}
