//! Denial-of-service risk from catastrophic backtracking.

use crate::analysis::backtracking;
use crate::automaton::{BacktrackingType, RegexParseResult};
use crate::checks::CheckContext;
use crate::flow::PatternUsage;
use crate::report::{CheckId, FindingSink};

const SECONDARY_MESSAGE: &str = "This repetition can backtrack.";

/// Reports the worst backtracking blowup of the pattern once, at the
/// pattern itself, with the offending repetitions as secondaries.
///
/// The wording depends on both the classification and the target
/// engine: an engine that possessifies unambiguous quantifier runs on
/// its own downgrades `QuadraticWhenOptimized` to a quadratic issue
/// and silences `LinearWhenOptimized` entirely.
pub fn run(
    ctx: &CheckContext<'_>,
    parse: &RegexParseResult,
    usage: &PatternUsage,
    sink: &mut FindingSink,
) {
    if parse.has_syntax_errors() {
        return;
    }
    let analysis = backtracking::classify(parse, usage.match_type);
    let optimized = ctx.config.auto_possessification;
    let adjective = match analysis.classification {
        BacktrackingType::NoIssue => return,
        BacktrackingType::LinearWhenOptimized if optimized => return,
        BacktrackingType::LinearWhenOptimized => "exponential",
        BacktrackingType::QuadraticWhenOptimized if optimized => "quadratic",
        BacktrackingType::QuadraticWhenOptimized => "exponential",
        BacktrackingType::AlwaysQuadratic => "quadratic",
        BacktrackingType::AlwaysExponential => "exponential",
    };
    let message = format!(
        "Make sure the regex used here, which is vulnerable to {adjective} runtime \
         due to backtracking, cannot lead to denial of service."
    );
    let secondaries = analysis
        .offenders
        .iter()
        .map(|&id| (parse.automaton.range(id), SECONDARY_MESSAGE.to_string()))
        .collect();
    sink.report(
        CheckId::Redos,
        parse.automaton.range(parse.root),
        message,
        None,
        secondaries,
    );
}
