//! Surfaces the parser's collected syntax errors as one finding.

use crate::automaton::RegexParseResult;
use crate::checks::CheckContext;
use crate::flow::PatternUsage;
use crate::report::{CheckId, FindingSink};

/// The first error anchors the finding; any further errors in the same
/// pattern become secondary locations with their own messages.
pub fn run(
    _ctx: &CheckContext<'_>,
    parse: &RegexParseResult,
    _usage: &PatternUsage,
    sink: &mut FindingSink,
) {
    let Some((first, rest)) = parse.syntax_errors.split_first() else {
        return;
    };
    let message = format!("Fix the syntax error inside this regex: {}", first.message);
    let secondaries = rest
        .iter()
        .map(|error| (error.range, error.message.clone()))
        .collect();
    sink.report(CheckId::Syntax, first.range, message, None, secondaries);
}
