//! Semantic analyses over the regex automaton.
//!
//! Everything here consumes the state graph built by the parser and
//! answers questions no single node can: what a fragment of the pattern
//! can consume ([`coverage`]), which states can reach which without
//! input ([`reachability`]), whether two fragments share matches
//! ([`inclusion`]), how badly a repetition backtracks
//! ([`backtracking`]) and how fast it grows the call stack
//! ([`stack_usage`]). The checks layer turns these answers into
//! findings.
//!
//! All walks over the automaton terminate on cyclic graphs: each one
//! carries a visited set or a pre-filled pair cache.

pub mod backtracking;
pub mod coverage;
pub mod inclusion;
pub mod reachability;
pub mod stack_usage;

pub use backtracking::BacktrackingAnalysis;
pub use coverage::CodepointCoverage;
pub use reachability::ReachabilityChecker;
