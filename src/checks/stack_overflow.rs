//! Stack exhaustion from deeply recursive backtracking.

use crate::analysis::stack_usage;
use crate::automaton::RegexParseResult;
use crate::checks::CheckContext;
use crate::flow::PatternUsage;
use crate::report::{CheckId, FindingSink};

const MESSAGE: &str =
    "Refactor this repetition that can lead to a stack overflow for large inputs.";

/// Flags repetitions whose recursion depth grows faster per consumed
/// character than the configured ceiling allows. One finding per
/// pattern: the first offender anchors it, the rest become secondaries.
pub fn run(
    ctx: &CheckContext<'_>,
    parse: &RegexParseResult,
    _usage: &PatternUsage,
    sink: &mut FindingSink,
) {
    let offenders = stack_usage::analyze(parse, ctx.config.max_stack_consumption_factor);
    let Some((&first, rest)) = offenders.split_first() else {
        return;
    };
    let secondaries = rest
        .iter()
        .map(|&id| (parse.automaton.range(id), MESSAGE.to_string()))
        .collect();
    sink.report(
        CheckId::StackOverflow,
        parse.automaton.range(first),
        MESSAGE,
        None,
        secondaries,
    );
}
