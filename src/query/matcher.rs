//! Record evaluation: applies a [`CompiledMatcher`] to one record's text and
//! returns the qualifying match count. Zero means the record does not match
//! and must not be stored.
//!
//! Term-frequency accumulation is optional (a resource-policy switch): when
//! the caller passes no frequency map, nothing is accumulated.

use crate::query::compiler::{CompiledMatcher, CoocUnit, MatchStrategy};
use ahash::AHashMap;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Aggregate count per distinct matched substring (lowercased).
pub type TermCounts = AHashMap<String, u64>;

fn sentence_boundary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]+\s+").expect("static pattern"))
}

fn paragraph_boundary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n").expect("static pattern"))
}

impl CompiledMatcher {
    /// Count qualifying matches in `text`. Exclusions run first: any excluded
    /// match drops the record regardless of gate outcome.
    pub fn evaluate(&self, text: &str, mut freq: Option<&mut TermCounts>) -> usize {
        if self.excluded.iter().any(|re| re.is_match(text)) {
            return 0;
        }

        match &self.strategy {
            MatchStrategy::Simple { pattern } => count_matches(pattern, text, freq.as_deref_mut()),

            MatchStrategy::Gated {
                gates,
                require_all,
                counting,
            } => {
                let qualifies = if *require_all {
                    gates.iter().all(|g| g.is_match(text))
                } else {
                    gates.iter().any(|g| g.is_match(text))
                };
                if !qualifies {
                    return 0;
                }
                count_matches(counting, text, freq.as_deref_mut())
            }

            MatchStrategy::Proximity {
                term_a,
                term_b,
                distance,
                ordered,
            } => proximity_matches(
                text,
                term_a,
                term_b,
                *distance as usize,
                *ordered,
                freq.as_deref_mut(),
            ),

            MatchStrategy::Cooccurrence {
                term_a,
                term_b,
                unit,
            } => cooccurrence_matches(text, term_a, term_b, *unit, freq.as_deref_mut()),
        }
    }
}

fn count_matches(pattern: &Regex, text: &str, freq: Option<&mut TermCounts>) -> usize {
    match freq {
        Some(freq) => {
            let mut count = 0;
            for m in pattern.find_iter(text) {
                count += 1;
                *freq.entry(m.as_str().to_lowercase()).or_insert(0) += 1;
            }
            count
        }
        None => pattern.find_iter(text).count(),
    }
}

/// Count qualifying (posA, posB) pairs: the number of whitespace-delimited
/// words strictly between the two match spans must be at most `distance`.
/// Ordered mode additionally requires the A occurrence to precede B. Distinct
/// pairs are keyed by word index so nested loops never double count.
fn proximity_matches(
    text: &str,
    term_a: &Regex,
    term_b: &Regex,
    distance: usize,
    ordered: bool,
    freq: Option<&mut TermCounts>,
) -> usize {
    let words = word_spans(text);
    if words.is_empty() {
        return 0;
    }

    let positions_a: Vec<usize> = term_a
        .find_iter(text)
        .map(|m| word_index(&words, m.start()))
        .collect();
    let positions_b: Vec<usize> = term_b
        .find_iter(text)
        .map(|m| word_index(&words, m.start()))
        .collect();

    let mut pairs: HashSet<(usize, usize)> = HashSet::new();
    for &ia in &positions_a {
        for &ib in &positions_b {
            if ordered {
                if ia >= ib {
                    continue;
                }
            } else if ia == ib {
                // Both terms in one word: zero words between
                pairs.insert((ia, ib));
                continue;
            }
            let (lo, hi) = if ia < ib { (ia, ib) } else { (ib, ia) };
            let between = hi - lo - 1;
            if between <= distance {
                let key = if ordered { (ia, ib) } else { (lo, hi) };
                pairs.insert(key);
            }
        }
    }

    let count = pairs.len();
    if count > 0 {
        if let Some(freq) = freq {
            for m in term_a.find_iter(text) {
                *freq.entry(m.as_str().to_lowercase()).or_insert(0) += 1;
            }
            for m in term_b.find_iter(text) {
                *freq.entry(m.as_str().to_lowercase()).or_insert(0) += 1;
            }
        }
    }
    count
}

/// One match per sentence/paragraph unit containing both terms, recorded for
/// frequency purposes against whichever term occurs first in the unit.
fn cooccurrence_matches(
    text: &str,
    term_a: &Regex,
    term_b: &Regex,
    unit: CoocUnit,
    mut freq: Option<&mut TermCounts>,
) -> usize {
    let boundary = match unit {
        CoocUnit::Sentence => sentence_boundary_re(),
        CoocUnit::Paragraph => paragraph_boundary_re(),
    };

    let mut count = 0;
    for piece in boundary.split(text) {
        let (ma, mb) = (term_a.find(piece), term_b.find(piece));
        if let (Some(ma), Some(mb)) = (ma, mb) {
            count += 1;
            if let Some(freq) = freq.as_deref_mut() {
                let first = if ma.start() <= mb.start() { ma } else { mb };
                *freq.entry(first.as_str().to_lowercase()).or_insert(0) += 1;
            }
        }
    }
    count
}

/// Byte spans of whitespace-delimited words.
fn word_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;
    for (i, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if let Some(s) = start.take() {
                spans.push((s, i));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        spans.push((s, text.len()));
    }
    spans
}

/// Index of the word containing (or nearest before) byte position `pos`.
fn word_index(spans: &[(usize, usize)], pos: usize) -> usize {
    let idx = spans.partition_point(|&(start, _)| start <= pos);
    idx.saturating_sub(1)
}
