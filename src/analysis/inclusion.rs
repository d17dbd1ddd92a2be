//! Language intersection and inclusion over automaton fragments.
//!
//! Both queries simulate two [`SubAutomaton`]s in lock-step, comparing
//! codepoint coverage whenever both sides sit on a consuming state. The
//! result is a syntactic approximation: unsupported constructs
//! (lookarounds, boundaries, back references, counted repetitions) make
//! the walk give up and return the caller's `default_answer`, which
//! should be whichever answer does not lead to a finding.
//!
//! Cycles through repetitions are broken with a pair cache that is
//! pre-filled with the default answer when a calculation starts, so a
//! re-entrant query returns the default instead of recursing forever.
//! The cache is only valid for one top-level query, since entries
//! depend on the fragment ends and prefix mode.

use rustc_hash::FxHashMap;

use crate::analysis::coverage::CodepointCoverage;
use crate::automaton::{Automaton, NodeId, NodeKind, SubAutomaton, TransitionType};

/// True iff some string can be matched by both fragments.
///
/// When both fragments allow prefixes, this checks whether one
/// intersects a prefix of the other, not whether their prefixes
/// intersect (which would trivially hold for the empty string).
pub fn intersects(
    automaton: &Automaton,
    auto1: SubAutomaton,
    auto2: SubAutomaton,
    default_answer: bool,
) -> bool {
    Walker::new(automaton).intersects(auto1, auto2, default_answer)
}

/// True iff every string matched by `auto2` can also be matched by
/// `auto1`.
///
/// `auto2.allow_prefix` relaxes this to "auto1 can match a prefix of
/// it", `auto1.allow_prefix` to "auto1 can match a continuation of it".
pub fn superset_of(
    automaton: &Automaton,
    auto1: SubAutomaton,
    auto2: SubAutomaton,
    default_answer: bool,
) -> bool {
    Walker::new(automaton).superset_of(auto1, auto2, default_answer)
}

#[derive(Default)]
struct PairCache {
    entries: FxHashMap<(NodeId, NodeId), bool>,
}

impl PairCache {
    /// Returns the cached answer for `pair`, or pre-fills it with the
    /// default and returns `None` so the caller computes the real one.
    fn start_calculation(&mut self, pair: (NodeId, NodeId), default_answer: bool) -> Option<bool> {
        if let Some(&cached) = self.entries.get(&pair) {
            return Some(cached);
        }
        self.entries.insert(pair, default_answer);
        None
    }

    fn save(&mut self, pair: (NodeId, NodeId), value: bool) -> bool {
        self.entries.insert(pair, value);
        value
    }
}

struct Walker<'a> {
    automaton: &'a Automaton,
    cache: PairCache,
}

impl<'a> Walker<'a> {
    fn new(automaton: &'a Automaton) -> Self {
        Self {
            automaton,
            cache: PairCache::default(),
        }
    }

    fn intersects(
        &mut self,
        auto1: SubAutomaton,
        auto2: SubAutomaton,
        default_answer: bool,
    ) -> bool {
        if self.has_unsupported_start(auto1) || self.has_unsupported_start(auto2) {
            return default_answer;
        }
        let pair = (auto1.start, auto2.start);
        if let Some(cached) = self.cache.start_calculation(pair, default_answer) {
            return cached;
        }
        let value = if auto1.is_at_end() && auto2.is_at_end() {
            true
        } else if auto1.is_at_end() && self.transition(auto2) != TransitionType::Epsilon {
            auto2.allow_prefix
        } else if auto2.is_at_end() && self.transition(auto1) != TransitionType::Epsilon {
            auto1.allow_prefix
        } else if self.transition(auto2) == TransitionType::Epsilon && !auto2.is_at_end() {
            self.any_successor(auto2, |walker, successor| {
                walker.intersects(auto1, successor, default_answer)
            })
        } else if self.transition(auto1) == TransitionType::Epsilon && !auto1.is_at_end() {
            self.any_successor(auto1, |walker, successor| {
                walker.intersects(successor, auto2, default_answer)
            })
        } else {
            self.compare_intersects(auto1, auto2, default_answer)
        };
        self.cache.save(pair, value)
    }

    fn superset_of(
        &mut self,
        auto1: SubAutomaton,
        auto2: SubAutomaton,
        default_answer: bool,
    ) -> bool {
        if self.has_unsupported_start(auto1) || self.has_unsupported_start(auto2) {
            return default_answer;
        }
        let pair = (auto1.start, auto2.start);
        if let Some(cached) = self.cache.start_calculation(pair, default_answer) {
            return cached;
        }
        let value = if auto1.is_at_end() && auto2.is_at_end() {
            true
        } else if auto1.is_at_end() && self.transition(auto2) != TransitionType::Epsilon {
            auto2.allow_prefix
        } else if auto2.is_at_end() && self.transition(auto1) != TransitionType::Epsilon {
            auto1.allow_prefix
        } else if self.transition(auto2) == TransitionType::Epsilon && !auto2.is_at_end() {
            // Every way of continuing auto2 must stay included.
            self.all_successors(auto2, |walker, successor| {
                walker.superset_of(auto1, successor, default_answer)
            })
        } else if self.transition(auto1) == TransitionType::Epsilon && !auto1.is_at_end() {
            self.any_successor(auto1, |walker, successor| {
                walker.superset_of(successor, auto2, default_answer)
            })
        } else {
            self.compare_superset(auto1, auto2, default_answer)
        };
        self.cache.save(pair, value)
    }

    fn compare_intersects(
        &mut self,
        auto1: SubAutomaton,
        auto2: SubAutomaton,
        default_answer: bool,
    ) -> bool {
        let (Some(coverage1), Some(coverage2)) = (
            CodepointCoverage::from_node(self.automaton, auto1.start),
            CodepointCoverage::from_node(self.automaton, auto2.start),
        ) else {
            return default_answer;
        };
        coverage1.intersects(&coverage2, default_answer)
            && self.any_successor(auto1, |walker, successor1| {
                walker.any_successor(auto2, |walker, successor2| {
                    walker.intersects(successor1, successor2, default_answer)
                })
            })
    }

    fn compare_superset(
        &mut self,
        auto1: SubAutomaton,
        auto2: SubAutomaton,
        default_answer: bool,
    ) -> bool {
        let (Some(coverage1), Some(coverage2)) = (
            CodepointCoverage::from_node(self.automaton, auto1.start),
            CodepointCoverage::from_node(self.automaton, auto2.start),
        ) else {
            return default_answer;
        };
        coverage1.superset_of(&coverage2, default_answer)
            && self.any_successor(auto1, |walker, successor1| {
                walker.any_successor(auto2, |walker, successor2| {
                    walker.superset_of(successor1, successor2, default_answer)
                })
            })
    }

    /// Lookarounds, boundaries, back references and counted repetitions
    /// are outside what the lock-step walk can model. A fragment that
    /// has already reached its end is never unsupported; its start node
    /// is not part of the fragment.
    fn has_unsupported_start(&self, auto: SubAutomaton) -> bool {
        if auto.is_at_end() {
            return false;
        }
        let kind = self.automaton.kind(auto.start);
        self.automaton.transition(auto.start) == TransitionType::BackReference
            || matches!(
                kind,
                NodeKind::LookAround { .. }
                    | NodeKind::EndOfLookAround { .. }
                    | NodeKind::Boundary(_)
            )
            || matches!(
                kind,
                NodeKind::Repetition { quantifier, .. }
                    if quantifier.max.map_or(false, |max| max > 1)
            )
    }

    fn transition(&self, auto: SubAutomaton) -> TransitionType {
        self.automaton.transition(auto.start)
    }

    fn any_successor(
        &mut self,
        auto: SubAutomaton,
        mut f: impl FnMut(&mut Self, SubAutomaton) -> bool,
    ) -> bool {
        let automaton = self.automaton;
        automaton
            .successors(auto.start)
            .iter()
            .any(|&successor| f(self, auto.at(successor)))
    }

    fn all_successors(
        &mut self,
        auto: SubAutomaton,
        mut f: impl FnMut(&mut Self, SubAutomaton) -> bool,
    ) -> bool {
        let automaton = self.automaton;
        automaton
            .successors(auto.start)
            .iter()
            .all(|&successor| f(self, auto.at(successor)))
    }
}
