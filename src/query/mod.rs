pub mod compiler;
pub mod matcher;
pub mod parser;

pub use compiler::{compile, CompiledMatcher, CoocUnit, MatchStrategy};
pub use matcher::TermCounts;
pub use parser::{parse, QueryNode};

use crate::error::EngineError;

/// Options applied when compiling a query.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileOptions {
    /// Wrap literal patterns in word-boundary assertions so substrings of
    /// other words do not match. Never applied to raw regex input.
    pub whole_words: bool,
}

/// Parse a raw query string and compile it into an executable matcher.
///
/// This is the engine's front door for UI collaborators: it either returns a
/// ready matcher or fails synchronously with [`EngineError::QuerySyntax`]
/// before any scan work begins.
pub fn parse_and_compile(raw: &str, opts: CompileOptions) -> Result<CompiledMatcher, EngineError> {
    compile(&parse(raw), opts.whole_words)
}
