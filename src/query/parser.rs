//! Query string parsing.
//!
//! A raw query is classified into exactly one [`QueryNode`] variant by an
//! ordered rule table; the first matching rule wins. The order is:
//!
//! 1.  `A ONEAR/n B` (ordered proximity)
//! 2.  `A NEAR/n B`, `A ~n B`, `A AROUND(n) B` (unordered proximity)
//! 3.  `A /s B`, `A SENTENCE B` (sentence co-occurrence)
//! 4.  `A /p B`, `A PARAGRAPH B` (paragraph co-occurrence)
//! 5.  `"exact phrase"` (quoted literal)
//! 6.  `(?=.*\bT1\b)(?=.*\bT2\b).*` (legacy lookahead AND encoding)
//! 7.  `NOT T`, `-T`, `!T` (exclusions, removed from the remaining string)
//! 8.  `A OR B`, `A | B` (union)
//! 9.  `A AND B`, `A & B`, `+A +B` (intersection)
//! 10. lone term plus exclusions (intersection of one)
//! 11. native regex syntax (raw regex passthrough)
//! 12. plain literal (wildcard if it contains `*`/`?`)
//!
//! Boolean structure wins over raw-regex classification: a string that splits
//! under rules 1-10 never reaches rule 11.

use regex::Regex;
use std::sync::OnceLock;

/// Query AST node. Parsing is mutually exclusive: exactly one variant is
/// produced per input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryNode {
    /// Single literal term
    Literal { term: String },
    /// Literal term containing `*`/`?` wildcards
    Wildcard { pattern: String },
    /// Quoted phrase, matched verbatim (not tokenized)
    Phrase { text: String },
    /// All required terms must match; any excluded match drops the record
    And {
        required: Vec<String>,
        excluded: Vec<String>,
    },
    /// At least one required term must match
    Or {
        required: Vec<String>,
        excluded: Vec<String>,
    },
    /// Two terms within `distance` words of each other
    Near {
        term_a: String,
        term_b: String,
        distance: u32,
        ordered: bool,
    },
    /// Both terms inside the same sentence
    SentenceCooc { term_a: String, term_b: String },
    /// Both terms inside the same paragraph
    ParagraphCooc { term_a: String, term_b: String },
    /// User-supplied regex, passed through untouched
    RawRegex { source: String },
}

macro_rules! static_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pattern).expect("static pattern"))
        }
    };
}

static_regex!(onear_re, r"(?i)^(.+?)\s+ONEAR/(\d+)\s+(.+)$");
static_regex!(
    near_re,
    r"(?i)^(.+?)\s+(?:NEAR/(\d+)|~(\d+)|AROUND\((\d+)\))\s+(.+)$"
);
static_regex!(sentence_re, r"(?i)^(.+?)\s+(?:/s|SENTENCE)\s+(.+)$");
static_regex!(paragraph_re, r"(?i)^(.+?)\s+(?:/p|PARAGRAPH)\s+(.+)$");
static_regex!(lookahead_re, r"\(\?=\.\*\\b(.+?)\\b\)");
static_regex!(or_split_re, r"(?i)\s+(?:OR|\|)\s+");
static_regex!(and_split_re, r"(?i)\s+(?:AND|&)\s+");

/// Parse a raw query string into a [`QueryNode`].
///
/// Deterministic: identical input always yields an identical AST. Never
/// fails; unparsable input degrades to a literal, and invalid regex is caught
/// later at compile time.
pub fn parse(raw: &str) -> QueryNode {
    let raw = raw.trim();

    // Rules 1-4: two-term binary operators over the whole string
    if let Some(caps) = onear_re().captures(raw) {
        if let Ok(distance) = caps[2].parse() {
            return QueryNode::Near {
                term_a: caps[1].trim().to_string(),
                term_b: caps[3].trim().to_string(),
                distance,
                ordered: true,
            };
        }
    }

    if let Some(caps) = near_re().captures(raw) {
        let distance = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .and_then(|m| m.as_str().parse().ok());
        if let Some(distance) = distance {
            return QueryNode::Near {
                term_a: caps[1].trim().to_string(),
                term_b: caps[5].trim().to_string(),
                distance,
                ordered: false,
            };
        }
    }

    if let Some(caps) = sentence_re().captures(raw) {
        return QueryNode::SentenceCooc {
            term_a: caps[1].trim().to_string(),
            term_b: caps[2].trim().to_string(),
        };
    }

    if let Some(caps) = paragraph_re().captures(raw) {
        return QueryNode::ParagraphCooc {
            term_a: caps[1].trim().to_string(),
            term_b: caps[2].trim().to_string(),
        };
    }

    // Rule 5: quoted phrase
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        return QueryNode::Phrase {
            text: raw[1..raw.len() - 1].to_string(),
        };
    }

    // Rule 6: legacy lookahead AND encoding
    if raw.contains("(?=") {
        let terms: Vec<String> = lookahead_re()
            .captures_iter(raw)
            .map(|c| c[1].to_string())
            .collect();
        if !terms.is_empty() {
            return QueryNode::And {
                required: terms,
                excluded: Vec::new(),
            };
        }
    }

    // Rule 7: pull out exclusions, keep the rest of the string intact
    let (remaining, excluded) = extract_exclusions(raw);
    let remaining = remaining.trim();

    // Rule 8: OR split
    let or_parts: Vec<&str> = or_split_re().split(remaining).collect();
    if or_parts.len() > 1 {
        return QueryNode::Or {
            required: collect_terms(&or_parts),
            excluded,
        };
    }

    // Rule 9: AND split (keyword form, then `+term` form)
    let and_parts: Vec<&str> = and_split_re().split(remaining).collect();
    if and_parts.len() > 1 {
        return QueryNode::And {
            required: collect_terms(&and_parts),
            excluded,
        };
    }

    if remaining
        .split_whitespace()
        .any(|t| t.starts_with('+') && t.len() > 1)
    {
        let required: Vec<String> = remaining
            .split_whitespace()
            .map(|t| t.strip_prefix('+').unwrap_or(t).to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if !required.is_empty() {
            return QueryNode::And { required, excluded };
        }
    }

    // Rule 10: exclusions with whatever term(s) remain
    if !excluded.is_empty() {
        let required = if remaining.is_empty() {
            Vec::new()
        } else {
            vec![remaining.to_string()]
        };
        return QueryNode::And { required, excluded };
    }

    // Rule 11: native regex passthrough
    if looks_like_regex(remaining) {
        return QueryNode::RawRegex {
            source: remaining.to_string(),
        };
    }

    // Rule 12: plain literal / wildcard
    if remaining.contains('*') || remaining.contains('?') {
        QueryNode::Wildcard {
            pattern: remaining.to_string(),
        }
    } else {
        QueryNode::Literal {
            term: remaining.to_string(),
        }
    }
}

/// Remove `NOT term`, `-term` and `!term` tokens, returning the remaining
/// string and the excluded terms in source order.
fn extract_exclusions(input: &str) -> (String, Vec<String>) {
    let mut kept: Vec<&str> = Vec::new();
    let mut excluded = Vec::new();

    let mut tokens = input.split_whitespace();
    while let Some(token) = tokens.next() {
        if token.eq_ignore_ascii_case("NOT") {
            if let Some(term) = tokens.next() {
                excluded.push(term.to_string());
            }
        } else if let Some(rest) = token.strip_prefix('-') {
            if rest.is_empty() {
                kept.push(token);
            } else {
                excluded.push(rest.to_string());
            }
        } else if let Some(rest) = token.strip_prefix('!') {
            if rest.is_empty() {
                kept.push(token);
            } else {
                excluded.push(rest.to_string());
            }
        } else {
            kept.push(token);
        }
    }

    (kept.join(" "), excluded)
}

fn collect_terms(parts: &[&str]) -> Vec<String> {
    parts
        .iter()
        .map(|p| p.trim().trim_start_matches('+').to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Heuristic for native regex syntax: escape sequences, groups, character
/// classes, anchors, alternation. Bare `*`/`?` wildcards deliberately do not
/// count; they take the wildcard path instead.
fn looks_like_regex(input: &str) -> bool {
    input.contains('\\')
        || input.contains("(?")
        || input.contains(".*")
        || input.contains(".+")
        || input.contains('|')
        || (input.contains('[') && input.contains(']'))
        || (input.contains('(') && input.contains(')'))
        || input.contains('{')
        || input.starts_with('^')
        || input.ends_with('$')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_literal() {
        let node = parse("eagle");
        assert_eq!(
            node,
            QueryNode::Literal {
                term: "eagle".to_string()
            }
        );
    }

    #[test]
    fn test_multi_word_literal() {
        let node = parse("bald eagle");
        assert_eq!(
            node,
            QueryNode::Literal {
                term: "bald eagle".to_string()
            }
        );
    }

    #[test]
    fn test_wildcard() {
        let node = parse("cat*");
        assert_eq!(
            node,
            QueryNode::Wildcard {
                pattern: "cat*".to_string()
            }
        );
    }

    #[test]
    fn test_single_char_wildcard() {
        assert!(matches!(parse("gr?y"), QueryNode::Wildcard { .. }));
    }

    #[test]
    fn test_phrase() {
        let node = parse("\"the quick fox\"");
        assert_eq!(
            node,
            QueryNode::Phrase {
                text: "the quick fox".to_string()
            }
        );
    }

    #[test]
    fn test_onear() {
        let node = parse("apple ONEAR/3 banana");
        assert_eq!(
            node,
            QueryNode::Near {
                term_a: "apple".to_string(),
                term_b: "banana".to_string(),
                distance: 3,
                ordered: true,
            }
        );
    }

    #[test]
    fn test_near_slash_form() {
        let node = parse("apple NEAR/5 banana");
        assert!(matches!(
            node,
            QueryNode::Near {
                distance: 5,
                ordered: false,
                ..
            }
        ));
    }

    #[test]
    fn test_near_tilde_form() {
        let node = parse("apple ~4 banana");
        assert!(matches!(
            node,
            QueryNode::Near {
                distance: 4,
                ordered: false,
                ..
            }
        ));
    }

    #[test]
    fn test_near_around_form() {
        let node = parse("apple AROUND(7) banana");
        assert!(matches!(
            node,
            QueryNode::Near {
                distance: 7,
                ordered: false,
                ..
            }
        ));
    }

    #[test]
    fn test_near_case_insensitive_keyword() {
        assert!(matches!(parse("a near/2 b"), QueryNode::Near { .. }));
    }

    #[test]
    fn test_onear_takes_precedence_over_near() {
        assert!(matches!(
            parse("x ONEAR/1 y"),
            QueryNode::Near { ordered: true, .. }
        ));
    }

    #[test]
    fn test_sentence_cooc() {
        let node = parse("apple /s banana");
        assert_eq!(
            node,
            QueryNode::SentenceCooc {
                term_a: "apple".to_string(),
                term_b: "banana".to_string(),
            }
        );
        assert_eq!(parse("apple SENTENCE banana"), node);
    }

    #[test]
    fn test_paragraph_cooc() {
        let node = parse("apple /p banana");
        assert_eq!(
            node,
            QueryNode::ParagraphCooc {
                term_a: "apple".to_string(),
                term_b: "banana".to_string(),
            }
        );
        assert_eq!(parse("apple PARAGRAPH banana"), node);
    }

    #[test]
    fn test_lookahead_and_encoding() {
        let node = parse(r"(?=.*\bcat\b)(?=.*\bdog\b).*");
        assert_eq!(
            node,
            QueryNode::And {
                required: vec!["cat".to_string(), "dog".to_string()],
                excluded: Vec::new(),
            }
        );
    }

    #[test]
    fn test_not_keyword() {
        let node = parse("eagle NOT flew");
        assert_eq!(
            node,
            QueryNode::And {
                required: vec!["eagle".to_string()],
                excluded: vec!["flew".to_string()],
            }
        );
    }

    #[test]
    fn test_dash_and_bang_exclusions() {
        let node = parse("eagle -flew !landed");
        assert_eq!(
            node,
            QueryNode::And {
                required: vec!["eagle".to_string()],
                excluded: vec!["flew".to_string(), "landed".to_string()],
            }
        );
    }

    #[test]
    fn test_or_keyword() {
        let node = parse("cat OR dog");
        assert_eq!(
            node,
            QueryNode::Or {
                required: vec!["cat".to_string(), "dog".to_string()],
                excluded: Vec::new(),
            }
        );
    }

    #[test]
    fn test_or_pipe() {
        assert_eq!(parse("cat | dog"), parse("cat OR dog"));
    }

    #[test]
    fn test_or_carries_exclusions() {
        let node = parse("cat OR dog NOT bird");
        assert_eq!(
            node,
            QueryNode::Or {
                required: vec!["cat".to_string(), "dog".to_string()],
                excluded: vec!["bird".to_string()],
            }
        );
    }

    #[test]
    fn test_and_keyword() {
        let node = parse("cat AND dog");
        assert_eq!(
            node,
            QueryNode::And {
                required: vec!["cat".to_string(), "dog".to_string()],
                excluded: Vec::new(),
            }
        );
    }

    #[test]
    fn test_and_ampersand() {
        assert_eq!(parse("cat & dog"), parse("cat AND dog"));
    }

    #[test]
    fn test_and_plus_prefix() {
        let node = parse("+cat +dog");
        assert_eq!(
            node,
            QueryNode::And {
                required: vec!["cat".to_string(), "dog".to_string()],
                excluded: Vec::new(),
            }
        );
    }

    #[test]
    fn test_raw_regex_word_boundary() {
        let node = parse(r"\beagle\b");
        assert_eq!(
            node,
            QueryNode::RawRegex {
                source: r"\beagle\b".to_string()
            }
        );
    }

    #[test]
    fn test_raw_regex_char_class() {
        assert!(matches!(parse("[ck]at"), QueryNode::RawRegex { .. }));
    }

    #[test]
    fn test_raw_regex_non_capturing_group() {
        assert!(matches!(parse("(?:foo|bar)"), QueryNode::RawRegex { .. }));
    }

    #[test]
    fn test_boolean_wins_over_regex_syntax() {
        // Contains regex-looking tokens but splits as OR first
        let node = parse(r"\bcat\b OR dog");
        assert!(matches!(node, QueryNode::Or { .. }));
    }

    #[test]
    fn test_empty_query_is_empty_literal() {
        assert_eq!(
            parse("   "),
            QueryNode::Literal {
                term: String::new()
            }
        );
    }

    #[test]
    fn test_exclusion_only() {
        let node = parse("NOT spam");
        assert_eq!(
            node,
            QueryNode::And {
                required: Vec::new(),
                excluded: vec!["spam".to_string()],
            }
        );
    }

    #[test]
    fn test_determinism() {
        let q = "alpha NEAR/3 beta";
        assert_eq!(parse(q), parse(q));
    }

    #[test]
    fn test_hyphenated_word_not_excluded() {
        let node = parse("well-known");
        assert_eq!(
            node,
            QueryNode::Literal {
                term: "well-known".to_string()
            }
        );
    }
}
