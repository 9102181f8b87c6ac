//! Scan orchestration: progress/result types, cooperative cancellation, the
//! coordinator and the result aggregator.

pub mod aggregate;
pub mod coordinator;

pub use aggregate::{finalize, TERM_FREQUENCY_LIMIT};
pub use coordinator::{ScanCoordinator, ScanOptions, CACHED_BATCH_SIZE, FETCH_CONCURRENCY};

use crate::corpus::RecordId;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Live progress snapshot, overwritten continuously during a scan.
/// `percent` is monotonically non-decreasing while a scan is active (reset to
/// 0 when a new scan starts); `processed`/`total` count shards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanProgress {
    pub status: String,
    pub percent: u8,
    pub processed: usize,
    pub total: usize,
}

/// One row of the term-frequency table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermFrequencyEntry {
    pub term: String,
    pub count: u64,
}

/// Final scan output. Absence of an id from `counts` means zero qualifying
/// matches; records are never stored with count 0.
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub counts: AHashMap<RecordId, u64>,
    /// Top terms by aggregate count, descending; truncated to
    /// [`TERM_FREQUENCY_LIMIT`]. Empty when tracking was disabled.
    pub term_frequency: Vec<TermFrequencyEntry>,
    /// Source of the counting pattern, for downstream highlighting.
    pub regex_source: String,
    /// Shards that failed to load and were treated as empty.
    pub failed_shards: usize,
}

/// Terminal state of a scan. A cancelled scan is all-or-nothing: partial
/// counts are discarded, not returned.
#[derive(Debug)]
pub enum ScanOutcome {
    Complete(ScanResult),
    Cancelled,
}

/// Shared cooperative cancellation flag, polled between batches; in-flight
/// work for the current batch completes before the scan halts.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Re-arm the flag before a new scan starts.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
