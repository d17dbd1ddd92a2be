//! Analysis driver tying the parser, the flow verdicts and the checks
//! together.
//!
//! An [`Engine`] owns nothing but configuration. Every pattern gets a
//! fresh parse, fresh caches and a fresh sink, so no verdict from one
//! pattern can leak into the next; batches of units run in parallel
//! with one engine per unit.

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::automaton::RegexFlags;
use crate::checks::{self, CheckContext};
use crate::config::AnalysisConfig;
use crate::flow::{FlowTracker, PatternId, PatternUsage, UsageOrigin};
use crate::parser;
use crate::report::{Finding, FindingSink};

pub use crate::flow::FlowEvent;

/// One regex literal the host wants analyzed.
///
/// The text must be the bare pattern, with any host-language string
/// escaping already undone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSource {
    pub text: String,
    /// Flags passed alongside the pattern at the compile site. Inline
    /// flags inside the text still apply on top of these.
    #[serde(default)]
    pub flags: RegexFlags,
    pub origin: UsageOrigin,
}

impl PatternSource {
    pub fn new(text: impl Into<String>, flags: RegexFlags, origin: UsageOrigin) -> Self {
        Self {
            text: text.into(),
            flags,
            origin,
        }
    }
}

/// A compilation unit's worth of work: the patterns the host found in
/// it plus the flow events its code produces.
///
/// Pattern ids are indices into `patterns`, so every event referring to
/// [`PatternId`] `n` talks about `patterns[n]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisUnit {
    pub patterns: Vec<PatternSource>,
    #[serde(default)]
    pub events: Vec<FlowEvent>,
}

/// Findings for one pattern of a unit, in check order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternReport {
    pub pattern: PatternId,
    pub findings: Vec<Finding>,
}

/// Runs every check over one pattern, or one unit, at a time.
#[derive(Debug, Clone)]
pub struct Engine {
    config: AnalysisConfig,
}

impl Engine {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Parses one pattern and runs every check against it under the
    /// given usage, returning the findings in check order.
    pub fn analyze(
        &self,
        pattern: &str,
        flags: RegexFlags,
        usage: &PatternUsage,
    ) -> Vec<Finding> {
        let parse = parser::parse(pattern, flags);
        let ctx = CheckContext {
            config: &self.config,
        };
        let mut sink = FindingSink::new();
        checks::run_all(&ctx, &parse, usage, &mut sink);
        let findings = sink.into_findings();
        debug!(
            "Analyzed {}: {} findings, {} syntax errors",
            usage.pattern,
            findings.len(),
            parse.syntax_errors.len()
        );
        findings
    }

    /// Replays the unit's flow events, then analyzes each of its
    /// patterns under the usage the events resolved for it.
    ///
    /// Annotation patterns always get the annotation usage; a compiled
    /// pattern no event ever mentions counts as escaped.
    pub fn analyze_unit(&self, unit: &AnalysisUnit) -> Vec<PatternReport> {
        let mut tracker = FlowTracker::new();
        for event in &unit.events {
            tracker.record(event.clone());
        }
        let mut usages: FxHashMap<PatternId, PatternUsage> = tracker
            .finish()
            .into_iter()
            .map(|usage| (usage.pattern, usage))
            .collect();
        unit.patterns
            .iter()
            .enumerate()
            .map(|(index, source)| {
                let pattern = PatternId(index);
                let usage = match source.origin {
                    UsageOrigin::Annotation => PatternUsage::annotation(pattern),
                    UsageOrigin::MethodCall => usages
                        .remove(&pattern)
                        .unwrap_or_else(|| PatternUsage::untracked(pattern)),
                };
                let findings = self.analyze(&source.text, source.flags, &usage);
                PatternReport { pattern, findings }
            })
            .collect()
    }

    /// Analyzes a batch of units in parallel, one engine per unit.
    /// Reports come back in unit order.
    pub fn analyze_units(
        config: &AnalysisConfig,
        units: &[AnalysisUnit],
    ) -> Vec<Vec<PatternReport>> {
        debug!("Analyzing {} units", units.len());
        units
            .par_iter()
            .map(|unit| Engine::new(config.clone()).analyze_unit(unit))
            .collect()
    }
}
