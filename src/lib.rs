//! Static analysis for regular expression literals.
//!
//! This crate parses regex patterns into an automaton whose states are
//! the syntax nodes themselves, decides semantic questions about them
//! (reachability, character coverage, sub-automaton inclusion), and
//! runs a suite of checks that report runaway backtracking, stack
//! exhaustion, dead boundaries and other pattern defects as findings
//! anchored to source ranges.
//!
//! The host front end supplies pattern text plus flow events describing
//! how the compiled pattern objects travel through the surrounding
//! program; [`Engine`] turns both into per-pattern findings.

pub mod analysis;
pub mod automaton;
pub mod checks;
pub mod config;
pub mod engine;
pub mod error;
pub mod flow;
pub mod parser;
pub mod report;

pub use automaton::{
    BacktrackingType, MatchType, RegexFlags, RegexParseResult, SyntaxError, TextRange,
};
pub use config::AnalysisConfig;
pub use engine::{AnalysisUnit, Engine, PatternReport, PatternSource};
pub use error::{Result, RexError};
pub use flow::{
    AccessorMethod, FlowEvent, FlowTracker, GroupArg, PatternId, PatternUsage, StorageKind,
    UsageOrigin, ValueId, VarId,
};
pub use parser::parse;
pub use report::{CheckId, Finding, FindingSink, SecondaryLocation};
