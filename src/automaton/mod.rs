//! Typed automaton model for parsed regular expressions.
//!
//! A parsed pattern is stored as an arena of [`Node`]s that double as NFA
//! states: besides its syntactic children, every node knows its outgoing
//! automaton edges and the state that follows it in its enclosing sequence
//! (the continuation). All analyses read this one structure; there is no
//! separate compilation step and no executable matcher.

mod class;
mod flags;
mod node;
mod quantifier;

use serde::{Deserialize, Serialize};

pub use class::{CharacterClass, ClassElement};
pub use flags::RegexFlags;
pub use node::{
    Automaton, BoundaryKind, GroupReference, LookAroundDirection, LookAroundPolarity, Node,
    NodeId, NodeKind, TextRange, TransitionType,
};
pub use quantifier::{Quantifier, QuantifierModifier};

/// A problem found while parsing a pattern. Collected, never thrown; a
/// pattern with errors keeps its best-effort automaton but analyses that
/// need a well-formed graph skip it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxError {
    /// Char offset at which the problem was detected.
    pub position: usize,
    /// Span of the offending token.
    pub range: TextRange,
    pub message: String,
}

impl SyntaxError {
    pub fn new(position: usize, range: TextRange, message: impl Into<String>) -> Self {
        Self {
            position,
            range,
            message: message.into(),
        }
    }
}

/// Everything produced by one parse of one pattern.
///
/// Owned by the analysis run that parsed it; parsing the same text twice
/// yields structurally equal results, so derived equality compares
/// patterns by shape.
#[derive(Debug, Clone, PartialEq)]
pub struct RegexParseResult {
    pub automaton: Automaton,
    /// Entry node of the parsed tree (the start state's sole successor).
    pub root: NodeId,
    pub syntax_errors: Vec<SyntaxError>,
    /// Flags supplied at compile time, before any inline flag groups.
    pub initial_flags: RegexFlags,
    /// Whether free-spacing mode consumed at least one `#` comment.
    pub contains_comments: bool,
}

impl RegexParseResult {
    pub fn has_syntax_errors(&self) -> bool {
        !self.syntax_errors.is_empty()
    }
}

/// A bounded view of the automaton used by the inclusion checks: the walk
/// starts at `start` and never continues past `end`.
///
/// `allow_prefix` controls what happens when one side runs out while the
/// other still wants to consume: with it set, matching a prefix (or a
/// continuation) of the other side's string counts as a match. Transient;
/// lives only for the duration of one comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubAutomaton {
    pub start: NodeId,
    pub end: NodeId,
    pub allow_prefix: bool,
}

impl SubAutomaton {
    pub fn new(start: NodeId, end: NodeId, allow_prefix: bool) -> Self {
        Self {
            start,
            end,
            allow_prefix,
        }
    }

    /// The same view advanced to another start state.
    pub fn at(&self, start: NodeId) -> Self {
        Self { start, ..*self }
    }

    pub fn is_at_end(&self) -> bool {
        self.start == self.end
    }
}

/// How the whole regex is exercised by the code that compiled it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Only whole-input matching (`matches()` and friends).
    Full,
    /// Only substring searching (`find()`, `split()`, replacements).
    Partial,
    /// Both kinds of use were observed.
    Both,
    /// Nothing is known, typically because the compiled value escaped.
    Unknown,
}

/// Worst-case backtracking behavior of a pattern, ordered from harmless
/// to catastrophic.
///
/// The two `*WhenOptimized` variants describe patterns whose worst case
/// depends on whether the target engine rewrites unambiguous quantifier
/// runs into possessive form on its own; without that rewrite they stay
/// exponential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BacktrackingType {
    NoIssue,
    LinearWhenOptimized,
    QuadraticWhenOptimized,
    AlwaysQuadratic,
    AlwaysExponential,
}
