//! Result aggregation: merges per-record counts and builds the sorted
//! term-frequency table.

use crate::corpus::RecordId;
use crate::query::TermCounts;
use crate::scan::{ScanResult, TermFrequencyEntry};
use ahash::AHashMap;

/// Term-frequency rows exposed to callers. Terms beyond this are still
/// counted internally, just not reported.
pub const TERM_FREQUENCY_LIMIT: usize = 50;

/// Build the final [`ScanResult`]. Counts pass through unchanged (no
/// normalization, no zero entries); term frequencies are sorted descending by
/// count with the term as a deterministic tie-break, then truncated.
pub fn finalize(
    counts: AHashMap<RecordId, u64>,
    term_counts: TermCounts,
    regex_source: String,
    failed_shards: usize,
) -> ScanResult {
    let mut term_frequency: Vec<TermFrequencyEntry> = term_counts
        .into_iter()
        .map(|(term, count)| TermFrequencyEntry { term, count })
        .collect();
    term_frequency.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.term.cmp(&b.term)));
    term_frequency.truncate(TERM_FREQUENCY_LIMIT);

    ScanResult {
        counts,
        term_frequency,
        regex_source,
        failed_shards,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term_counts(pairs: &[(&str, u64)]) -> TermCounts {
        pairs
            .iter()
            .map(|(t, c)| (t.to_string(), *c))
            .collect()
    }

    #[test]
    fn test_sorted_descending_with_tie_break() {
        let result = finalize(
            AHashMap::new(),
            term_counts(&[("b", 2), ("a", 2), ("c", 9)]),
            String::new(),
            0,
        );
        let terms: Vec<&str> = result
            .term_frequency
            .iter()
            .map(|e| e.term.as_str())
            .collect();
        assert_eq!(terms, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_truncated_to_limit() {
        let pairs: Vec<(String, u64)> = (0..80)
            .map(|i| (format!("term{i:02}"), 80 - i as u64))
            .collect();
        let term_counts: TermCounts = pairs.into_iter().collect();
        let result = finalize(AHashMap::new(), term_counts, String::new(), 0);
        assert_eq!(result.term_frequency.len(), TERM_FREQUENCY_LIMIT);
        // The highest-count terms survive
        assert_eq!(result.term_frequency[0].term, "term00");
    }

    #[test]
    fn test_counts_pass_through_unchanged() {
        let mut counts = AHashMap::new();
        counts.insert(RecordId::from("a"), 2u64);
        let result = finalize(counts.clone(), TermCounts::default(), "re".to_string(), 3);
        assert_eq!(result.counts, counts);
        assert_eq!(result.regex_source, "re");
        assert_eq!(result.failed_shards, 3);
    }
}
