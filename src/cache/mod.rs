//! Persistent shard cache.
//!
//! One JSON file per shard (`shard_{index}.json`) plus a `meta.json` holding
//! the corpus version marker, fronted by a bounded in-memory LRU so repeated
//! scans in one session avoid re-reading shard files.
//!
//! Contract notes:
//! - `get_many` returns hits only; a missing index is simply absent.
//! - The cache never self-invalidates: callers must check `is_valid` before
//!   trusting hits, and call `clear` before `set_version` when the version
//!   changed, otherwise stale payloads from the previous corpus snapshot
//!   would be served as valid for the new one.
//! - Every read/write failure is swallowed (read -> miss, write -> skipped);
//!   the cache degrades, it never aborts a scan.

use crate::corpus::{Record, ShardIndex};
use crate::error::EngineError;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

/// Shards kept decoded in memory.
const HOT_CACHE_SIZE: usize = 64;

const META_FILE: &str = "meta.json";

#[derive(Debug, Serialize, Deserialize)]
struct CacheMeta {
    data_version: String,
}

/// On-disk shard entry. Immutable once written for a given
/// `(shard_index, data_version)` pair.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    shard_index: ShardIndex,
    cached_at: u64,
    data: Vec<Record>,
}

pub struct ShardCache {
    root: PathBuf,
    hot: Mutex<LruCache<ShardIndex, Arc<Vec<Record>>>>,
}

impl ShardCache {
    /// Open (creating if needed) a cache rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| EngineError::Cache(e.to_string()))?;
        Ok(Self {
            root,
            hot: Mutex::new(LruCache::new(
                NonZeroUsize::new(HOT_CACHE_SIZE).expect("nonzero capacity"),
            )),
        })
    }

    /// Look up shard payloads; hits only, misses are simply absent.
    pub fn get_many(&self, indices: &[ShardIndex]) -> HashMap<ShardIndex, Arc<Vec<Record>>> {
        let mut hits = HashMap::new();

        for &index in indices {
            if let Ok(mut hot) = self.hot.lock() {
                if let Some(records) = hot.get(&index) {
                    hits.insert(index, Arc::clone(records));
                    continue;
                }
            }

            let path = self.shard_path(index);
            if !path.exists() {
                continue;
            }
            match read_entry(&path) {
                Ok(entry) => {
                    let records = Arc::new(entry.data);
                    if let Ok(mut hot) = self.hot.lock() {
                        hot.put(index, Arc::clone(&records));
                    }
                    hits.insert(index, records);
                }
                Err(reason) => {
                    // Unreadable entry degrades to a miss
                    warn!(shard = index, %reason, "discarding unreadable cache entry");
                }
            }
        }

        hits
    }

    /// Persist shard payloads. Write failures are logged and skipped.
    pub fn put_many(&self, shards: HashMap<ShardIndex, Vec<Record>>) {
        for (index, data) in shards {
            let entry = CacheEntry {
                shard_index: index,
                cached_at: unix_now(),
                data,
            };
            if let Err(reason) = write_entry(&self.shard_path(index), &entry) {
                warn!(shard = index, %reason, "failed to persist shard");
                continue;
            }
            if let Ok(mut hot) = self.hot.lock() {
                hot.put(index, Arc::new(entry.data));
            }
        }
    }

    /// Whether the stored version marker matches `version`. Callers must
    /// check this before trusting any hit.
    pub fn is_valid(&self, version: &str) -> bool {
        self.version().map(|v| v == version).unwrap_or(false)
    }

    /// The stored version marker, if any.
    pub fn version(&self) -> Option<String> {
        let content = fs::read_to_string(self.root.join(META_FILE)).ok()?;
        let meta: CacheMeta = serde_json::from_str(&content).ok()?;
        Some(meta.data_version)
    }

    /// Store the version marker.
    pub fn set_version(&self, version: &str) {
        let meta = CacheMeta {
            data_version: version.to_string(),
        };
        let result = serde_json::to_string(&meta)
            .map_err(|e| e.to_string())
            .and_then(|json| {
                fs::write(self.root.join(META_FILE), json).map_err(|e| e.to_string())
            });
        if let Err(reason) = result {
            warn!(%reason, "failed to write cache version marker");
        }
    }

    /// Remove every cached shard and the version marker.
    pub fn clear(&self) {
        if let Ok(mut hot) = self.hot.lock() {
            hot.clear();
        }
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(reason) => {
                warn!(%reason, "failed to list cache dir");
                return;
            }
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name == META_FILE || (name.starts_with("shard_") && name.ends_with(".json")) {
                if let Err(reason) = fs::remove_file(entry.path()) {
                    warn!(%reason, "failed to remove cache entry");
                }
            }
        }
    }

    /// Number of shard entries currently on disk.
    pub fn entry_count(&self) -> usize {
        fs::read_dir(&self.root)
            .map(|entries| {
                entries
                    .flatten()
                    .filter(|e| {
                        let name = e.file_name();
                        let name = name.to_string_lossy();
                        name.starts_with("shard_") && name.ends_with(".json")
                    })
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn shard_path(&self, index: ShardIndex) -> PathBuf {
        self.root.join(format!("shard_{index}.json"))
    }
}

fn read_entry(path: &Path) -> Result<CacheEntry, String> {
    let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&content).map_err(|e| e.to_string())
}

fn write_entry(path: &Path, entry: &CacheEntry) -> Result<(), String> {
    let json = serde_json::to_string(entry).map_err(|e| e.to_string())?;
    fs::write(path, json).map_err(|e| e.to_string())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
