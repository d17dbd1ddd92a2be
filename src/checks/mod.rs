//! The rules that turn analysis results into findings.
//!
//! Every check has the same shape: a free `run` function that reads one
//! parse result plus the usage facts the flow tracker derived for it,
//! and pushes findings into the sink. Checks other than [`syntax`] skip
//! patterns with syntax errors; a best-effort automaton is good enough
//! for parsing diagnostics but not for semantic claims.

pub mod alternation;
pub mod boundaries;
pub mod complexity;
pub mod group_usage;
pub mod redos;
pub mod stack_overflow;
pub mod syntax;

use crate::automaton::RegexParseResult;
use crate::config::AnalysisConfig;
use crate::flow::PatternUsage;
use crate::report::FindingSink;

/// Read-only state shared by every check in one run.
#[derive(Debug, Clone, Copy)]
pub struct CheckContext<'a> {
    pub config: &'a AnalysisConfig,
}

/// Runs every check over one parsed pattern.
pub fn run_all(
    ctx: &CheckContext<'_>,
    parse: &RegexParseResult,
    usage: &PatternUsage,
    sink: &mut FindingSink,
) {
    syntax::run(ctx, parse, usage, sink);
    redos::run(ctx, parse, usage, sink);
    stack_overflow::run(ctx, parse, usage, sink);
    boundaries::run(ctx, parse, usage, sink);
    alternation::run(ctx, parse, usage, sink);
    group_usage::run(ctx, parse, usage, sink);
    complexity::run(ctx, parse, usage, sink);
}
