//! Runaway-backtracking reporting integration tests.
//!
//! Drives the corpus of vulnerable and harmless patterns through the
//! whole pipeline (parse, classification, reporting) and pins the
//! messages a host would surface.

use rexamine::{
    AccessorMethod, AnalysisConfig, CheckId, Engine, Finding, MatchType, PatternId, PatternUsage,
    RegexFlags, TextRange, UsageOrigin,
};

const EXPONENTIAL: &str = "Make sure the regex used here, which is vulnerable to exponential \
                           runtime due to backtracking, cannot lead to denial of service.";
const QUADRATIC: &str = "Make sure the regex used here, which is vulnerable to quadratic \
                         runtime due to backtracking, cannot lead to denial of service.";

fn usage(match_type: MatchType) -> PatternUsage {
    let invocations = match match_type {
        MatchType::Full => vec![AccessorMethod::Matches],
        MatchType::Partial => vec![AccessorMethod::Find],
        MatchType::Both => vec![AccessorMethod::Matches, AccessorMethod::Find],
        MatchType::Unknown => Vec::new(),
    };
    PatternUsage {
        pattern: PatternId(0),
        match_type,
        invocations,
        escaped: matches!(match_type, MatchType::Unknown),
        origin: UsageOrigin::MethodCall,
    }
}

fn analyze(pattern: &str, match_type: MatchType) -> Vec<Finding> {
    Engine::new(AnalysisConfig::new()).analyze(pattern, RegexFlags::empty(), &usage(match_type))
}

fn redos_findings(pattern: &str, match_type: MatchType) -> Vec<Finding> {
    analyze(pattern, match_type)
        .into_iter()
        .filter(|finding| finding.check == CheckId::Redos)
        .collect()
}

fn redos_messages(pattern: &str, match_type: MatchType) -> Vec<String> {
    redos_findings(pattern, match_type)
        .into_iter()
        .map(|finding| finding.message)
        .collect()
}

// =============================================================================
// Exponential Cases
// =============================================================================

#[test]
fn test_nested_quantifier_is_exponential() {
    assert_eq!(redos_messages("(a+)+$", MatchType::Full), vec![EXPONENTIAL]);
}

#[test]
fn test_reluctant_nested_loop_is_exponential() {
    assert_eq!(redos_messages("(.*,)*?", MatchType::Full), vec![EXPONENTIAL]);
}

#[test]
fn test_back_reference_after_loop_keeps_it_failable() {
    assert_eq!(
        redos_messages("(.*,)*\\1", MatchType::Full),
        vec![EXPONENTIAL]
    );
}

#[test]
fn test_finding_is_anchored_to_the_whole_pattern() {
    let findings = redos_findings("(a+)+$", MatchType::Full);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].range, TextRange::new(0, 6));
}

// =============================================================================
// Polynomial Cases
// =============================================================================

#[test]
fn test_overlapping_loops_are_quadratic() {
    for pattern in ["x*\\w*", ".*.*X", "x*a*x*", "x*xx*", ".*\\s*+"] {
        assert_eq!(
            redos_messages(pattern, MatchType::Full),
            vec![QUADRATIC],
            "pattern: {pattern}"
        );
    }
}

#[test]
fn test_nested_failable_loop_is_quadratic_when_optimized() {
    assert_eq!(redos_messages("(.*,)*", MatchType::Full), vec![QUADRATIC]);
}

#[test]
fn test_offending_repetitions_become_secondary_locations() {
    let findings = redos_findings("x*xx*", MatchType::Full);
    assert_eq!(findings.len(), 1);
    let messages: Vec<&str> = findings[0]
        .secondaries
        .iter()
        .map(|secondary| secondary.message.as_str())
        .collect();
    assert_eq!(
        messages,
        ["This repetition can backtrack.", "This repetition can backtrack."]
    );
}

// =============================================================================
// Optimization Capability
// =============================================================================

#[test]
fn test_quadratic_report_becomes_exponential_without_optimization() {
    let engine = Engine::new(AnalysisConfig::new().with_auto_possessification(false));
    let findings: Vec<Finding> = engine
        .analyze("(.*,)*", RegexFlags::empty(), &usage(MatchType::Full))
        .into_iter()
        .filter(|finding| finding.check == CheckId::Redos)
        .collect();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].message, EXPONENTIAL);
}

#[test]
fn test_linear_when_optimized_is_suppressed_by_default() {
    assert!(redos_messages("(.?,)*X", MatchType::Full).is_empty());
}

#[test]
fn test_linear_when_optimized_reports_without_optimization() {
    let engine = Engine::new(AnalysisConfig::new().with_auto_possessification(false));
    let findings: Vec<Finding> = engine
        .analyze("(.?,)*X", RegexFlags::empty(), &usage(MatchType::Full))
        .into_iter()
        .filter(|finding| finding.check == CheckId::Redos)
        .collect();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].message, EXPONENTIAL);
}

// =============================================================================
// Harmless Patterns
// =============================================================================

#[test]
fn test_non_overlapping_loops_stay_silent() {
    for pattern in [
        "x*,a*x*",
        "x*yx*",
        "a*b*",
        "(a|b)*",
        "((a|.a),)*",
        "([^,]*,)*",
        "(;*,)*",
        "(?>.*,)*",
        "([^,]*+,)*",
        "(.*?,){5}",
    ] {
        assert!(
            redos_messages(pattern, MatchType::Full).is_empty(),
            "pattern: {pattern}"
        );
    }
}

#[test]
fn test_loops_that_cannot_fail_stay_silent() {
    for pattern in ["(?s)(.*,)*.*", "(.*,)*[\\s\\S]*"] {
        assert!(
            redos_messages(pattern, MatchType::Full).is_empty(),
            "pattern: {pattern}"
        );
    }
}

// =============================================================================
// Match-Type Sensitivity
// =============================================================================

#[test]
fn test_find_only_usage_is_not_reported() {
    assert!(redos_messages("(.*,)*", MatchType::Partial).is_empty());
}

#[test]
fn test_mixed_usage_is_reported() {
    assert_eq!(redos_messages("(.*,)*", MatchType::Both), vec![QUADRATIC]);
}
