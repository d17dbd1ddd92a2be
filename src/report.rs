//! Findings and the sink that collects them.
//!
//! Checks do not talk to the host directly; they push [`Finding`]s into
//! a [`FindingSink`] and the engine hands the collected batch back as a
//! plain vector. The sink also enforces the one-diagnostic-per-place
//! rule: a check reporting the same primary range twice within one run
//! keeps the first finding.

use std::fmt;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::automaton::TextRange;

/// Identifies the check a finding came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckId {
    Redos,
    StackOverflow,
    Syntax,
    ImpossibleBoundary,
    SingleCharacterAlternation,
    GroupUsage,
    Complexity,
}

impl CheckId {
    /// Stable name used in serialized findings and logs.
    pub fn name(self) -> &'static str {
        match self {
            CheckId::Redos => "redos",
            CheckId::StackOverflow => "stack_overflow",
            CheckId::Syntax => "syntax",
            CheckId::ImpossibleBoundary => "impossible_boundary",
            CheckId::SingleCharacterAlternation => "single_character_alternation",
            CheckId::GroupUsage => "group_usage",
            CheckId::Complexity => "complexity",
        }
    }
}

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Additional range a finding points at, with its own message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryLocation {
    pub range: TextRange,
    pub message: String,
}

/// One diagnostic, addressed in char offsets of the pattern text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub check: CheckId,
    /// Primary range the diagnostic is anchored to.
    pub range: TextRange,
    pub message: String,
    /// Remediation effort, for the checks that meter one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secondaries: Vec<SecondaryLocation>,
}

/// Collects findings during one analysis run.
#[derive(Debug, Default)]
pub struct FindingSink {
    findings: Vec<Finding>,
    seen: FxHashSet<(CheckId, TextRange)>,
}

impl FindingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a finding unless this check already reported this range.
    pub fn report(
        &mut self,
        check: CheckId,
        range: TextRange,
        message: impl Into<String>,
        cost: Option<u32>,
        secondaries: Vec<(TextRange, String)>,
    ) {
        if !self.seen.insert((check, range)) {
            return;
        }
        self.findings.push(Finding {
            check,
            range,
            message: message.into(),
            cost,
            secondaries: secondaries
                .into_iter()
                .map(|(range, message)| SecondaryLocation { range, message })
                .collect(),
        });
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Hands the collected findings to the caller.
    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: usize, end: usize) -> TextRange {
        TextRange { start, end }
    }

    #[test]
    fn reporting_one_range_twice_keeps_the_first_finding() {
        let mut sink = FindingSink::new();
        sink.report(CheckId::Redos, range(0, 4), "first", None, Vec::new());
        sink.report(CheckId::Redos, range(0, 4), "second", None, Vec::new());
        let findings = sink.into_findings();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].message, "first");
    }

    #[test]
    fn different_checks_may_share_a_range() {
        let mut sink = FindingSink::new();
        sink.report(CheckId::Redos, range(0, 4), "slow", None, Vec::new());
        sink.report(CheckId::Complexity, range(0, 4), "dense", None, Vec::new());
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn different_ranges_do_not_collide() {
        let mut sink = FindingSink::new();
        sink.report(CheckId::Syntax, range(0, 1), "a", None, Vec::new());
        sink.report(CheckId::Syntax, range(2, 3), "b", None, Vec::new());
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn cost_and_secondaries_are_carried_through() {
        let mut sink = FindingSink::new();
        sink.report(
            CheckId::Complexity,
            range(0, 10),
            "too dense",
            Some(3),
            vec![(range(2, 4), "+2".to_string()), (range(6, 8), "+1".to_string())],
        );
        let findings = sink.into_findings();
        assert_eq!(findings[0].cost, Some(3));
        assert_eq!(findings[0].secondaries.len(), 2);
        assert_eq!(findings[0].secondaries[0].message, "+2");
        assert_eq!(findings[0].secondaries[0].range, range(2, 4));
    }

    #[test]
    fn findings_serialize_without_empty_optional_fields() {
        let mut sink = FindingSink::new();
        sink.report(CheckId::ImpossibleBoundary, range(1, 2), "dead", None, Vec::new());
        let value = serde_json::to_value(&sink.into_findings()[0]).unwrap();
        assert_eq!(value["check"], "impossible_boundary");
        assert!(value.get("cost").is_none());
        assert!(value.get("secondaries").is_none());
        assert_eq!(value["range"]["start"], 1);
    }
}
