//! Flow-resolution integration tests.
//!
//! Replays host event streams through the tracker and the engine and
//! checks that how a pattern object travels through the program decides
//! what gets reported about the pattern.

use rexamine::{
    AccessorMethod, AnalysisConfig, AnalysisUnit, CheckId, Engine, FlowEvent, FlowTracker,
    MatchType, PatternId, PatternReport, PatternSource, RegexFlags, StorageKind, UsageOrigin,
    ValueId, VarId,
};

fn unit(pattern: &str, events: Vec<FlowEvent>) -> AnalysisUnit {
    AnalysisUnit {
        patterns: vec![PatternSource::new(
            pattern,
            RegexFlags::empty(),
            UsageOrigin::MethodCall,
        )],
        events,
    }
}

fn matcher_chain(last: AccessorMethod) -> Vec<FlowEvent> {
    vec![
        FlowEvent::Compile {
            value: ValueId(0),
            pattern: PatternId(0),
        },
        FlowEvent::Matcher {
            value: ValueId(1),
            source: ValueId(0),
        },
        FlowEvent::Accessor {
            value: ValueId(2),
            source: ValueId(1),
            method: last,
        },
    ]
}

fn redos_findings(report: &PatternReport) -> usize {
    report
        .findings
        .iter()
        .filter(|finding| finding.check == CheckId::Redos)
        .count()
}

// =============================================================================
// Match-Type Resolution
// =============================================================================

#[test]
fn test_matcher_chain_resolves_to_full_match() {
    let mut tracker = FlowTracker::new();
    for event in matcher_chain(AccessorMethod::Matches) {
        tracker.record(event);
    }
    let usages = tracker.finish();
    assert_eq!(usages.len(), 1);
    assert_eq!(usages[0].pattern, PatternId(0));
    assert_eq!(usages[0].match_type, MatchType::Full);
    assert_eq!(usages[0].invocations, [AccessorMethod::Matches]);
    assert!(!usages[0].escaped);
}

#[test]
fn test_full_match_usage_reports_backtracking() {
    let reports = Engine::new(AnalysisConfig::new())
        .analyze_unit(&unit("(.*,)*", matcher_chain(AccessorMethod::Matches)));
    assert_eq!(redos_findings(&reports[0]), 1);
}

#[test]
fn test_find_only_usage_stays_silent() {
    let reports = Engine::new(AnalysisConfig::new())
        .analyze_unit(&unit("(.*,)*", matcher_chain(AccessorMethod::Find)));
    assert_eq!(redos_findings(&reports[0]), 0);
}

#[test]
fn test_find_and_matches_together_report() {
    let mut events = matcher_chain(AccessorMethod::Find);
    events.push(FlowEvent::Accessor {
        value: ValueId(3),
        source: ValueId(1),
        method: AccessorMethod::Matches,
    });
    let reports = Engine::new(AnalysisConfig::new()).analyze_unit(&unit("(.*,)*", events));
    assert_eq!(redos_findings(&reports[0]), 1);
}

// =============================================================================
// Escaping
// =============================================================================

#[test]
fn test_returning_the_matcher_downgrades_to_unknown() {
    let mut events = matcher_chain(AccessorMethod::Matches);
    events.push(FlowEvent::Return { value: ValueId(1) });

    let mut tracker = FlowTracker::new();
    for event in events.clone() {
        tracker.record(event);
    }
    let usages = tracker.finish();
    assert!(usages[0].escaped);
    assert_eq!(usages[0].match_type, MatchType::Unknown);

    let reports = Engine::new(AnalysisConfig::new()).analyze_unit(&unit("(a+)+$", events));
    assert_eq!(redos_findings(&reports[0]), 0);
}

#[test]
fn test_returning_an_accessor_result_also_escapes() {
    // The value produced by matches() still carries the pattern.
    let mut events = matcher_chain(AccessorMethod::Matches);
    events.push(FlowEvent::Return { value: ValueId(2) });
    let reports = Engine::new(AnalysisConfig::new()).analyze_unit(&unit("(a+)+$", events));
    assert_eq!(redos_findings(&reports[0]), 0);
}

#[test]
fn test_passing_to_an_untracked_call_escapes() {
    let mut events = matcher_chain(AccessorMethod::Matches);
    events.push(FlowEvent::Call {
        arguments: vec![ValueId(0)],
    });
    let reports = Engine::new(AnalysisConfig::new()).analyze_unit(&unit("(a+)+$", events));
    assert_eq!(redos_findings(&reports[0]), 0);
}

// =============================================================================
// Variable Binding
// =============================================================================

#[test]
fn test_private_final_field_keeps_the_pattern_tracked() {
    let events = vec![
        FlowEvent::Compile {
            value: ValueId(0),
            pattern: PatternId(0),
        },
        FlowEvent::Assign {
            variable: VarId(0),
            value: ValueId(0),
            storage: StorageKind::PrivateEffectivelyFinal,
        },
        FlowEvent::Read {
            value: ValueId(1),
            variable: VarId(0),
        },
        FlowEvent::Matcher {
            value: ValueId(2),
            source: ValueId(1),
        },
        FlowEvent::Accessor {
            value: ValueId(3),
            source: ValueId(2),
            method: AccessorMethod::Matches,
        },
    ];
    let reports = Engine::new(AnalysisConfig::new()).analyze_unit(&unit("(a+)+$", events));
    assert_eq!(redos_findings(&reports[0]), 1);
}

#[test]
fn test_shared_storage_escapes() {
    let events = vec![
        FlowEvent::Compile {
            value: ValueId(0),
            pattern: PatternId(0),
        },
        FlowEvent::Assign {
            variable: VarId(0),
            value: ValueId(0),
            storage: StorageKind::Shared,
        },
    ];
    let reports = Engine::new(AnalysisConfig::new()).analyze_unit(&unit("(a+)+$", events));
    assert_eq!(redos_findings(&reports[0]), 0);
}

// =============================================================================
// Annotations and Batches
// =============================================================================

#[test]
fn test_annotation_patterns_count_as_full_matches() {
    let unit = AnalysisUnit {
        patterns: vec![PatternSource::new(
            "(a+)+$",
            RegexFlags::empty(),
            UsageOrigin::Annotation,
        )],
        events: Vec::new(),
    };
    let reports = Engine::new(AnalysisConfig::new()).analyze_unit(&unit);
    assert_eq!(redos_findings(&reports[0]), 1);
}

#[test]
fn test_units_analyze_independently() {
    let vulnerable = unit("(a+)+$", matcher_chain(AccessorMethod::Matches));
    let harmless = unit("a*b*", matcher_chain(AccessorMethod::Matches));
    let reports = Engine::analyze_units(&AnalysisConfig::new(), &[vulnerable, harmless]);
    assert_eq!(reports.len(), 2);
    assert_eq!(redos_findings(&reports[0][0]), 1);
    assert_eq!(redos_findings(&reports[1][0]), 0);
}

// =============================================================================
// Wire Format
// =============================================================================

#[test]
fn test_units_deserialize_from_host_json() {
    let json = r#"{
        "patterns": [
            {"text": "(a+)+$", "origin": "method_call"}
        ],
        "events": [
            {"compile": {"value": 0, "pattern": 0}},
            {"matcher": {"value": 1, "source": 0}},
            {"accessor": {"value": 2, "source": 1, "method": "matches"}}
        ]
    }"#;
    let unit: AnalysisUnit = serde_json::from_str(json).unwrap();
    assert_eq!(unit.patterns[0].flags, RegexFlags::empty());

    let reports = Engine::new(AnalysisConfig::new()).analyze_unit(&unit);
    assert_eq!(redos_findings(&reports[0]), 1);
}

#[test]
fn test_reports_serialize_without_empty_fields() {
    let reports = Engine::new(AnalysisConfig::new())
        .analyze_unit(&unit("(a+)+$", matcher_chain(AccessorMethod::Matches)));
    let json = serde_json::to_value(&reports[0]).unwrap();
    let finding = &json["findings"][0];
    assert_eq!(finding["check"], "redos");
    assert!(finding.get("cost").is_none());
}
