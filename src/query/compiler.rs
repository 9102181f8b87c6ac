//! Compiles a [`QueryNode`] into an executable [`CompiledMatcher`].
//!
//! Every term goes through the same translation: regex metacharacters are
//! escaped, then `*` becomes `\S*` (non-space run) and `?` becomes `.`.
//! Whole-word mode wraps the result in `\b(?:...)\b`. Raw regex input skips
//! both steps. All patterns are compiled case-insensitive.
//!
//! Malformed regex (user-supplied or derived) fails here, synchronously,
//! before any scan work starts.

use crate::error::EngineError;
use crate::query::parser::QueryNode;
use regex::Regex;

/// Evaluation strategy selected at compile time.
#[derive(Debug)]
pub enum MatchStrategy {
    /// One combined regex; count = number of matches in the text.
    Simple { pattern: Regex },
    /// One gate regex per required term plus an OR-combined counting regex.
    /// `require_all` distinguishes AND (all gates) from OR (any gate).
    Gated {
        gates: Vec<Regex>,
        require_all: bool,
        counting: Regex,
    },
    /// Word-distance proximity between two terms.
    Proximity {
        term_a: Regex,
        term_b: Regex,
        distance: u32,
        ordered: bool,
    },
    /// Both terms inside the same sentence or paragraph.
    Cooccurrence {
        term_a: Regex,
        term_b: Regex,
        unit: CoocUnit,
    },
}

/// Text unit for co-occurrence matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoocUnit {
    /// Split on `[.!?]+\s+`
    Sentence,
    /// Split on blank lines
    Paragraph,
}

/// A compiled, executable matcher. Created fresh per query submission and
/// discarded after the scan completes.
#[derive(Debug)]
pub struct CompiledMatcher {
    pub strategy: MatchStrategy,
    /// Any match of one of these drops the record entirely, before gating.
    pub excluded: Vec<Regex>,
    /// Literal sub-terms reported to UI collaborators for highlighting.
    pub highlight_terms: Vec<String>,
    /// Source of the counting pattern, reported in the final result.
    pub regex_source: String,
}

/// Compile an AST node into a matcher.
pub fn compile(node: &QueryNode, whole_words: bool) -> Result<CompiledMatcher, EngineError> {
    match node {
        QueryNode::Literal { term } => {
            ensure_non_empty(term)?;
            let pattern = build_regex(&term_pattern(term, whole_words))?;
            Ok(simple(pattern, vec![term.clone()]))
        }

        QueryNode::Wildcard { pattern } => {
            ensure_non_empty(pattern)?;
            let regex = build_regex(&term_pattern(pattern, whole_words))?;
            Ok(simple(regex, vec![pattern.clone()]))
        }

        QueryNode::Phrase { text } => {
            ensure_non_empty(text)?;
            // Verbatim: escaped but never wildcard-translated
            let body = regex::escape(text);
            let body = if whole_words {
                format!(r"\b(?:{body})\b")
            } else {
                body
            };
            let pattern = build_regex(&body)?;
            Ok(simple(pattern, vec![text.clone()]))
        }

        QueryNode::RawRegex { source } => {
            ensure_non_empty(source)?;
            // Raw regex mode never applies whole-word wrapping
            let pattern = build_regex(source)?;
            Ok(CompiledMatcher {
                regex_source: pattern.as_str().to_string(),
                strategy: MatchStrategy::Simple { pattern },
                excluded: Vec::new(),
                highlight_terms: Vec::new(),
            })
        }

        QueryNode::And { required, excluded } | QueryNode::Or { required, excluded } => {
            if required.is_empty() {
                return Err(EngineError::QuerySyntax(
                    "query contains only exclusions".to_string(),
                ));
            }
            let require_all = matches!(node, QueryNode::And { .. });

            let bodies: Vec<String> = required
                .iter()
                .map(|t| term_pattern(t, whole_words))
                .collect();
            let gates = bodies
                .iter()
                .map(|b| build_regex(b))
                .collect::<Result<Vec<_>, _>>()?;
            let counting = build_regex(&bodies.join("|"))?;

            let excluded = excluded
                .iter()
                .map(|t| build_regex(&term_pattern(t, whole_words)))
                .collect::<Result<Vec<_>, _>>()?;

            Ok(CompiledMatcher {
                regex_source: counting.as_str().to_string(),
                strategy: MatchStrategy::Gated {
                    gates,
                    require_all,
                    counting,
                },
                excluded,
                highlight_terms: required.clone(),
            })
        }

        QueryNode::Near {
            term_a,
            term_b,
            distance,
            ordered,
        } => {
            ensure_non_empty(term_a)?;
            ensure_non_empty(term_b)?;
            let a_body = term_pattern(term_a, whole_words);
            let b_body = term_pattern(term_b, whole_words);
            let regex_source = format!("{a_body}|{b_body}");
            Ok(CompiledMatcher {
                strategy: MatchStrategy::Proximity {
                    term_a: build_regex(&a_body)?,
                    term_b: build_regex(&b_body)?,
                    distance: *distance,
                    ordered: *ordered,
                },
                excluded: Vec::new(),
                highlight_terms: vec![term_a.clone(), term_b.clone()],
                regex_source: format!("(?i){regex_source}"),
            })
        }

        QueryNode::SentenceCooc { term_a, term_b }
        | QueryNode::ParagraphCooc { term_a, term_b } => {
            ensure_non_empty(term_a)?;
            ensure_non_empty(term_b)?;
            let unit = if matches!(node, QueryNode::SentenceCooc { .. }) {
                CoocUnit::Sentence
            } else {
                CoocUnit::Paragraph
            };
            let a_body = term_pattern(term_a, whole_words);
            let b_body = term_pattern(term_b, whole_words);
            let regex_source = format!("(?i){a_body}|{b_body}");
            Ok(CompiledMatcher {
                strategy: MatchStrategy::Cooccurrence {
                    term_a: build_regex(&a_body)?,
                    term_b: build_regex(&b_body)?,
                    unit,
                },
                excluded: Vec::new(),
                highlight_terms: vec![term_a.clone(), term_b.clone()],
                regex_source,
            })
        }
    }
}

fn simple(pattern: Regex, highlight_terms: Vec<String>) -> CompiledMatcher {
    CompiledMatcher {
        regex_source: pattern.as_str().to_string(),
        strategy: MatchStrategy::Simple { pattern },
        excluded: Vec::new(),
        highlight_terms,
    }
}

fn ensure_non_empty(term: &str) -> Result<(), EngineError> {
    if term.trim().is_empty() {
        Err(EngineError::QuerySyntax("empty query".to_string()))
    } else {
        Ok(())
    }
}

/// Translate one extracted term into a regex body: escape metacharacters,
/// then `*` -> `\S*`, `?` -> `.`, then optional whole-word wrapping.
fn term_pattern(term: &str, whole_words: bool) -> String {
    let body = regex::escape(term)
        .replace(r"\*", r"\S*")
        .replace(r"\?", ".");
    if whole_words {
        format!(r"\b(?:{body})\b")
    } else {
        body
    }
}

fn build_regex(body: &str) -> Result<Regex, EngineError> {
    Ok(Regex::new(&format!("(?i){body}"))?)
}
