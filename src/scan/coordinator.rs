//! Drives a scan: cached shards first in cooperatively-yielding batches, then
//! misses over the network with bounded concurrency, then a fire-and-forget
//! cache write-back.
//!
//! Aggregation is a commutative merge, so shard processing order never
//! affects the final result, only the granularity of progress events. Shard
//! payloads are immutable once fetched; no locking is needed.

use crate::corpus::{fetch_many, CorpusMeta, Record, RecordId, ShardFetcher, ShardIndex};
use crate::cache::ShardCache;
use crate::query::{CompiledMatcher, TermCounts};
use crate::scan::{finalize, CancelFlag, ScanOutcome, ScanProgress};
use ahash::AHashMap;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Cached shards processed per cooperative yield.
pub const CACHED_BATCH_SIZE: usize = 25;

/// Shard fetches in flight at once.
pub const FETCH_CONCURRENCY: usize = 50;

/// Explicit engine configuration. Replaces any runtime platform sniffing:
/// constrained callers disable term-frequency tracking themselves.
#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    /// Accumulate the per-term frequency table. Disabling trades
    /// observability for lower peak memory.
    pub track_term_frequency: bool,
    /// Read from / write back to the persistent shard cache.
    pub cache_enabled: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            track_term_frequency: true,
            cache_enabled: true,
        }
    }
}

/// Orchestrates cache, fetcher and matcher for one scan at a time.
pub struct ScanCoordinator {
    cache: Arc<ShardCache>,
    fetcher: Arc<dyn ShardFetcher>,
    options: ScanOptions,
}

/// Keeps `percent` monotonic while a scan is active.
struct ProgressTracker {
    total: usize,
    last_percent: u8,
}

impl ProgressTracker {
    fn new(total: usize) -> Self {
        Self {
            total,
            last_percent: 0,
        }
    }

    fn snapshot(&mut self, status: &str, processed: usize) -> ScanProgress {
        let percent = if self.total == 0 {
            100
        } else {
            ((processed * 100) / self.total).min(100) as u8
        };
        self.last_percent = self.last_percent.max(percent);
        ScanProgress {
            status: status.to_string(),
            percent: self.last_percent,
            processed,
            total: self.total,
        }
    }
}

impl ScanCoordinator {
    pub fn new(cache: Arc<ShardCache>, fetcher: Arc<dyn ShardFetcher>, options: ScanOptions) -> Self {
        Self {
            cache,
            fetcher,
            options,
        }
    }

    pub fn options(&self) -> ScanOptions {
        self.options
    }

    /// Run one scan to completion or cancellation, pushing progress snapshots
    /// into `on_progress` along the way. Cancellation discards all partial
    /// state; a scan is all-or-nothing once started.
    pub async fn scan(
        &self,
        matcher: &CompiledMatcher,
        meta: &CorpusMeta,
        cancel: &CancelFlag,
        mut on_progress: impl FnMut(ScanProgress),
    ) -> ScanOutcome {
        let total = meta.total_shards as usize;
        let mut tracker = ProgressTracker::new(total);
        on_progress(tracker.snapshot("scanning cached shards", 0));

        if self.options.cache_enabled && !self.cache.is_valid(&meta.data_version) {
            // Full invalidation: never merge shards across corpus versions
            debug!(version = %meta.data_version, "cache version changed, clearing");
            self.cache.clear();
            self.cache.set_version(&meta.data_version);
        }

        let all_indices: Vec<ShardIndex> = (0..meta.total_shards).collect();
        let hits = if self.options.cache_enabled {
            self.cache.get_many(&all_indices)
        } else {
            HashMap::new()
        };
        let misses: Vec<ShardIndex> = all_indices
            .iter()
            .copied()
            .filter(|i| !hits.contains_key(i))
            .collect();
        debug!(cached = hits.len(), missing = misses.len(), "scan staged");

        let mut counts: AHashMap<RecordId, u64> = AHashMap::new();
        let mut term_counts = TermCounts::default();
        let mut processed = 0usize;
        let mut failed_shards = 0usize;

        // Phase 1: cached shards, fixed-size batches with a yield between
        // them so the host stays responsive.
        let mut hit_indices: Vec<ShardIndex> = hits.keys().copied().collect();
        hit_indices.sort_unstable();
        for batch in hit_indices.chunks(CACHED_BATCH_SIZE) {
            if cancel.is_cancelled() {
                on_progress(tracker.snapshot("cancelled", processed));
                return ScanOutcome::Cancelled;
            }
            for index in batch {
                self.apply(matcher, &hits[index], &mut counts, &mut term_counts);
                processed += 1;
            }
            on_progress(tracker.snapshot("scanning cached shards", processed));
            tokio::task::yield_now().await;
        }

        // Phase 2: fetch misses with bounded concurrency, matching each
        // shard as it arrives.
        let mut fetched: HashMap<ShardIndex, Vec<Record>> = HashMap::new();
        {
            let stream = fetch_many(self.fetcher.as_ref(), &misses, FETCH_CONCURRENCY);
            futures::pin_mut!(stream);
            while let Some(shard) = stream.next().await {
                if cancel.is_cancelled() {
                    on_progress(tracker.snapshot("cancelled", processed));
                    return ScanOutcome::Cancelled;
                }
                if shard.failed {
                    failed_shards += 1;
                } else {
                    self.apply(matcher, &shard.records, &mut counts, &mut term_counts);
                    fetched.insert(shard.index, shard.records);
                }
                processed += 1;
                on_progress(tracker.snapshot("fetching shards", processed));
            }
        }

        // Persist newly fetched shards without holding up completion.
        if self.options.cache_enabled && !fetched.is_empty() {
            let cache = Arc::clone(&self.cache);
            tokio::spawn(async move {
                let _ = tokio::task::spawn_blocking(move || cache.put_many(fetched)).await;
            });
        }

        let status = if misses.is_empty() {
            "complete (cache)"
        } else {
            "complete (mixed)"
        };
        on_progress(tracker.snapshot(status, processed));

        ScanOutcome::Complete(finalize(
            counts,
            term_counts,
            matcher.regex_source.clone(),
            failed_shards,
        ))
    }

    fn apply(
        &self,
        matcher: &CompiledMatcher,
        records: &[Record],
        counts: &mut AHashMap<RecordId, u64>,
        term_counts: &mut TermCounts,
    ) {
        for record in records {
            let n = if self.options.track_term_frequency {
                matcher.evaluate(&record.text, Some(term_counts))
            } else {
                matcher.evaluate(&record.text, None)
            };
            if n > 0 {
                counts.insert(record.id.clone(), n as u64);
            }
        }
    }
}
