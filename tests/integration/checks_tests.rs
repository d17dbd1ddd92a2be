//! Per-check reporting integration tests.
//!
//! Exercises each check through the public engine surface: pattern text
//! and usage in, findings with pinned messages and ranges out.

use rexamine::{
    AccessorMethod, AnalysisConfig, CheckId, Engine, Finding, GroupArg, MatchType, PatternId,
    PatternUsage, RegexFlags, TextRange, UsageOrigin,
};

fn usage_with(invocations: Vec<AccessorMethod>) -> PatternUsage {
    PatternUsage {
        pattern: PatternId(0),
        match_type: MatchType::Full,
        invocations,
        escaped: false,
        origin: UsageOrigin::MethodCall,
    }
}

fn analyze(pattern: &str) -> Vec<Finding> {
    Engine::new(AnalysisConfig::new()).analyze(
        pattern,
        RegexFlags::empty(),
        &usage_with(vec![AccessorMethod::Matches]),
    )
}

fn checks_of(findings: &[Finding]) -> Vec<CheckId> {
    findings.iter().map(|finding| finding.check).collect()
}

// =============================================================================
// Syntax Errors
// =============================================================================

#[test]
fn test_unclosed_group_reports_syntax_error() {
    let findings = analyze("(a");
    assert_eq!(checks_of(&findings), [CheckId::Syntax]);
    assert_eq!(
        findings[0].message,
        "Fix the syntax error inside this regex: Expected ')', but found the end of the regex"
    );
}

#[test]
fn test_syntax_errors_suppress_semantic_checks() {
    // Without the dangling paren this pattern reports backtracking.
    let findings = analyze("(a+)+$(");
    assert_eq!(checks_of(&findings), [CheckId::Syntax]);
}

// =============================================================================
// Stack Overflow
// =============================================================================

#[test]
fn test_deeply_wrapped_alternation_overflows_the_stack() {
    let findings = analyze("(((a|b)))*");
    assert!(findings
        .iter()
        .any(|finding| finding.check == CheckId::StackOverflow));
    let finding = findings
        .iter()
        .find(|finding| finding.check == CheckId::StackOverflow)
        .unwrap();
    assert_eq!(
        finding.message,
        "Refactor this repetition that can lead to a stack overflow for large inputs."
    );
    assert_eq!(finding.range, TextRange::new(0, 10));
}

#[test]
fn test_stack_limit_is_configurable() {
    let pattern = "(ab|cd)*";
    assert!(!analyze(pattern)
        .iter()
        .any(|finding| finding.check == CheckId::StackOverflow));

    let engine = Engine::new(AnalysisConfig::new().with_max_stack_consumption_factor(2.0));
    let findings = engine.analyze(
        pattern,
        RegexFlags::empty(),
        &usage_with(vec![AccessorMethod::Matches]),
    );
    assert!(findings
        .iter()
        .any(|finding| finding.check == CheckId::StackOverflow));
}

// =============================================================================
// Impossible Boundaries
// =============================================================================

#[test]
fn test_line_start_after_mandatory_input_cannot_match() {
    let findings = analyze("a^b");
    assert_eq!(checks_of(&findings), [CheckId::ImpossibleBoundary]);
    assert_eq!(
        findings[0].message,
        "Remove or replace this boundary that can never match."
    );
    assert_eq!(findings[0].range, TextRange::new(1, 2));
}

#[test]
fn test_multiline_flag_makes_inner_line_anchors_possible() {
    let engine = Engine::new(AnalysisConfig::new());
    let findings = engine.analyze(
        "a^b",
        RegexFlags::MULTILINE,
        &usage_with(vec![AccessorMethod::Matches]),
    );
    assert!(findings.is_empty());
}

// =============================================================================
// Single-Character Alternation
// =============================================================================

#[test]
fn test_alternation_of_single_characters_reports() {
    let findings = analyze("a|b|c");
    assert_eq!(checks_of(&findings), [CheckId::SingleCharacterAlternation]);
    assert_eq!(
        findings[0].message,
        "Replace this alternation with a character class."
    );
    assert_eq!(findings[0].range, TextRange::new(0, 5));
}

#[test]
fn test_multi_character_alternative_is_fine() {
    assert!(analyze("ab|c").is_empty());
}

// =============================================================================
// Group Usage
// =============================================================================

#[test]
fn test_accessing_unknown_group_name_reports() {
    let findings = Engine::new(AnalysisConfig::new()).analyze(
        "(?<year>\\d+)",
        RegexFlags::empty(),
        &usage_with(vec![
            AccessorMethod::Matches,
            AccessorMethod::Group(Some(GroupArg::Name("yr".to_string()))),
        ]),
    );
    assert_eq!(checks_of(&findings), [CheckId::GroupUsage]);
    assert_eq!(
        findings[0].message,
        "There is no group named 'yr' in the regular expression."
    );
}

#[test]
fn test_accessing_named_group_by_number_reports() {
    let findings = Engine::new(AnalysisConfig::new()).analyze(
        "(?<year>\\d+)",
        RegexFlags::empty(),
        &usage_with(vec![
            AccessorMethod::Matches,
            AccessorMethod::Group(Some(GroupArg::Number(1))),
        ]),
    );
    assert_eq!(checks_of(&findings), [CheckId::GroupUsage]);
    assert_eq!(
        findings[0].message,
        "Directly use 'year' instead of its group number."
    );
}

#[test]
fn test_never_touching_the_names_reports() {
    let findings = analyze("(?<year>\\d+)");
    assert_eq!(checks_of(&findings), [CheckId::GroupUsage]);
    assert_eq!(
        findings[0].message,
        "Use the named groups of this regex or remove the names."
    );
}

#[test]
fn test_names_used_by_name_are_fine() {
    let findings = Engine::new(AnalysisConfig::new()).analyze(
        "(?<year>\\d+)",
        RegexFlags::empty(),
        &usage_with(vec![
            AccessorMethod::Matches,
            AccessorMethod::Group(Some(GroupArg::Name("year".to_string()))),
        ]),
    );
    assert!(findings.is_empty());
}

// =============================================================================
// Complexity
// =============================================================================

#[test]
fn test_complexity_over_the_limit_reports_with_cost() {
    let engine = Engine::new(AnalysisConfig::new().with_max_complexity(1));
    let findings = engine.analyze(
        "(ab|cd)(ef|gh)",
        RegexFlags::empty(),
        &usage_with(vec![AccessorMethod::Matches]),
    );
    assert_eq!(checks_of(&findings), [CheckId::Complexity]);
    assert_eq!(
        findings[0].message,
        "Simplify this regular expression to reduce its complexity from 2 to the 1 allowed."
    );
    assert_eq!(findings[0].cost, Some(1));
    let labels: Vec<&str> = findings[0]
        .secondaries
        .iter()
        .map(|secondary| secondary.message.as_str())
        .collect();
    assert_eq!(labels, ["+1", "+1"]);
}

#[test]
fn test_nesting_raises_the_complexity_score() {
    let engine = Engine::new(AnalysisConfig::new().with_max_complexity(5));
    let findings = engine.analyze(
        "((a|b)*)*",
        RegexFlags::empty(),
        &usage_with(vec![AccessorMethod::Matches]),
    );
    let complexity: Vec<&Finding> = findings
        .iter()
        .filter(|finding| finding.check == CheckId::Complexity)
        .collect();
    assert_eq!(complexity.len(), 1);
    assert_eq!(
        complexity[0].message,
        "Simplify this regular expression to reduce its complexity from 6 to the 5 allowed."
    );
}

// =============================================================================
// Check Ordering
// =============================================================================

#[test]
fn test_findings_come_back_in_check_order() {
    let findings = analyze("a^(b|c|d)");
    assert_eq!(
        checks_of(&findings),
        [CheckId::ImpossibleBoundary, CheckId::SingleCharacterAlternation]
    );
}
