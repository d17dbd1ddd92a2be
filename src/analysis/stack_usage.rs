//! Stack-consumption estimation for repetitions.
//!
//! A backtracking engine matches by recursion: every split point inside
//! a repetition's element pushes frames that are only popped once the
//! whole match is decided. One pass over the element is priced in
//! frames per consumed character, and an open-ended repetition repeats
//! that price with the input length. The walk keeps the cheapest pass
//! it can find, so a price above the ceiling means every way of feeding
//! the loop grows the stack too fast and large inputs overflow it.
//!
//! Only repetitions that can actually split while matching are priced:
//! a loop over a plain literal or character class compiles to a flat
//! scan and never recurses per character.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::automaton::{Automaton, NodeId, NodeKind, RegexParseResult, TransitionType};

/// Repetitions whose cheapest element pass still pushes more than
/// `max_factor` stack frames per consumed character, in source order.
/// Patterns with syntax errors are not analyzed.
pub fn analyze(result: &RegexParseResult, max_factor: f64) -> Vec<NodeId> {
    if result.has_syntax_errors() {
        return Vec::new();
    }
    let automaton = &result.automaton;
    let mut candidates: Vec<NodeId> = automaton
        .ids()
        .filter(|&id| is_candidate(automaton, id))
        .collect();
    candidates.sort_by_key(|&id| (automaton.range(id).start, id.0));
    let mut estimator = Estimator::new(automaton);
    candidates.retain(|&id| estimator.consumption_factor(id) > max_factor);
    if !candidates.is_empty() {
        debug!(
            "{} repetitions exceed the stack factor of {}",
            candidates.len(),
            max_factor
        );
    }
    candidates
}

fn is_candidate(automaton: &Automaton, id: NodeId) -> bool {
    let &NodeKind::Repetition {
        element, quantifier, ..
    } = automaton.kind(id)
    else {
        return false;
    };
    quantifier.is_open_ended()
        && !quantifier.is_possessive()
        && has_backtrackable_branch(automaton, element)
}

/// Whether matching the subtree can split: a disjunction or a non-fixed
/// repetition anywhere under plain sequence and group wrappers.
fn has_backtrackable_branch(automaton: &Automaton, id: NodeId) -> bool {
    match automaton.kind(id) {
        NodeKind::Disjunction { .. } => true,
        NodeKind::Repetition { quantifier, .. } => !quantifier.is_fixed(),
        NodeKind::Sequence { items } => items
            .iter()
            .any(|&item| has_backtrackable_branch(automaton, item)),
        &NodeKind::CapturingGroup { element, .. } => has_backtrackable_branch(automaton, element),
        &NodeKind::NonCapturingGroup { element, .. } => {
            element.map_or(false, |element| has_backtrackable_branch(automaton, element))
        }
        _ => false,
    }
}

/// States the engine folds away; passing through them pushes no frame
/// and keeps an adjacent literal run intact.
fn is_free(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Sequence { .. } | NodeKind::EndOfRepetition { .. }
    )
}

/// Cost of a path: characters consumed and recursion steps taken. Each
/// step is priced at two stack frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PathInfo {
    consumed: u32,
    depth: u32,
}

impl PathInfo {
    const EMPTY: PathInfo = PathInfo { consumed: 0, depth: 0 };

    fn new(consumed: u32, depth: u32) -> Self {
        Self { consumed, depth }
    }

    fn add(self, other: PathInfo) -> Self {
        Self {
            consumed: self.consumed.saturating_add(other.consumed),
            depth: self.depth.saturating_add(other.depth),
        }
    }

    fn multiply(self, by: u32) -> Self {
        Self {
            consumed: self.consumed.saturating_mul(by),
            depth: self.depth.saturating_mul(by),
        }
    }

    /// Frames per consumed character; a path that consumes nothing has
    /// unbounded consumption.
    fn consumption_factor(self) -> f64 {
        if self.consumed == 0 {
            f64::INFINITY
        } else {
            2.0 * f64::from(self.depth) / f64::from(self.consumed)
        }
    }
}

/// Pending arrival in the best-first walk. Cheapest factor pops first;
/// ties prefer the deeper partial path, so epsilon chains reach their
/// consuming step before a shallow arrival ends the walk. The remaining
/// keys only make the order total, which keeps walks reproducible.
#[derive(Debug, Clone, Copy)]
struct Visit {
    info: PathInfo,
    after_character: bool,
    node: NodeId,
}

impl Ord for Visit {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .info
            .consumption_factor()
            .partial_cmp(&self.info.consumption_factor())
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.info.depth.cmp(&other.info.depth))
            .then_with(|| self.info.consumed.cmp(&other.info.consumed))
            .then_with(|| other.node.0.cmp(&self.node.0))
            .then_with(|| other.after_character.cmp(&self.after_character))
    }
}

impl PartialOrd for Visit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Visit {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Visit {}

/// Prices element passes; group consumption is memoized across every
/// repetition of the same pattern.
struct Estimator<'a> {
    automaton: &'a Automaton,
    group_consumptions: FxHashMap<NodeId, u32>,
}

impl<'a> Estimator<'a> {
    fn new(automaton: &'a Automaton) -> Self {
        Self {
            automaton,
            group_consumptions: FxHashMap::default(),
        }
    }

    fn consumption_factor(&mut self, repetition: NodeId) -> f64 {
        let &NodeKind::Repetition {
            element,
            end_of_repetition,
            ..
        } = self.automaton.kind(repetition)
        else {
            return 0.0;
        };
        self.cheapest_pass(element, end_of_repetition)
            .map_or(0.0, PathInfo::consumption_factor)
    }

    /// Best-first walk from `element` to `end`, cheapest consumption
    /// factor first, so the first arrival is the engine's most
    /// favorable pass. Each state is expanded once; loops inside the
    /// element contribute at most one iteration to the price.
    fn cheapest_pass(&mut self, element: NodeId, end: NodeId) -> Option<PathInfo> {
        let mut queue = BinaryHeap::new();
        let mut visited: FxHashSet<(NodeId, bool)> = FxHashSet::default();
        let (info, after_character, node) = self.step(PathInfo::EMPTY, false, element);
        queue.push(Visit {
            info,
            after_character,
            node,
        });
        while let Some(Visit {
            info,
            after_character,
            node,
        }) = queue.pop()
        {
            if node == end {
                return Some(info);
            }
            if !visited.insert((node, after_character)) {
                continue;
            }
            for &successor in self.automaton.successors(node) {
                let (info, after_character, landed) = self.step(info, after_character, successor);
                if !visited.contains(&(landed, after_character)) {
                    queue.push(Visit {
                        info,
                        after_character,
                        node: landed,
                    });
                }
            }
        }
        None
    }

    /// Cost of entering `target`, returning the state actually landed
    /// on: fixed repetitions are priced whole and skipped over, since
    /// the state graph does not count their iterations.
    fn step(&mut self, info: PathInfo, after_character: bool, target: NodeId) -> (PathInfo, bool, NodeId) {
        if let &NodeKind::Repetition {
            element,
            quantifier,
            end_of_repetition,
        } = self.automaton.kind(target)
        {
            if quantifier.is_fixed() {
                let iteration = self
                    .cheapest_pass(element, end_of_repetition)
                    .unwrap_or(PathInfo::EMPTY);
                let priced = info
                    .add(PathInfo::new(0, 1))
                    .add(iteration.multiply(quantifier.min));
                return match self.automaton.continuation(target) {
                    Some(next) => self.step(priced, false, next),
                    None => (priced, false, target),
                };
            }
        }
        match self.automaton.transition(target) {
            TransitionType::Epsilon => {
                if is_free(self.automaton.kind(target)) {
                    (info, after_character, target)
                } else {
                    (info.add(PathInfo::new(0, 1)), false, target)
                }
            }
            TransitionType::Character => {
                // Adjacent literals fold into one run; only the first
                // character of a run opens a frame.
                let depth = u32::from(!after_character);
                (info.add(PathInfo::new(1, depth)), true, target)
            }
            TransitionType::BackReference => {
                let consumed = self.referenced_consumption(target);
                (info.add(PathInfo::new(consumed, 0)), false, target)
            }
        }
    }

    fn referenced_consumption(&mut self, reference: NodeId) -> u32 {
        match self.automaton.kind(reference) {
            &NodeKind::BackReference {
                group: Some(group), ..
            } => self.group_consumption(group),
            _ => 0,
        }
    }

    /// Characters a capture of `group` is guaranteed to hold, memoized.
    /// Pricing a self-referencing group would recurse forever, so the
    /// cache is seeded with 1 before descending; the inner reference
    /// then counts as a single character.
    fn group_consumption(&mut self, group: NodeId) -> u32 {
        if let Some(&consumed) = self.group_consumptions.get(&group) {
            return consumed;
        }
        self.group_consumptions.insert(group, 1);
        let consumed = match self.automaton.kind(group) {
            &NodeKind::CapturingGroup { element, .. } => self.consumed_by(element),
            _ => 1,
        };
        self.group_consumptions.insert(group, consumed);
        consumed
    }

    /// Minimum characters one match of the subtree consumes.
    fn consumed_by(&mut self, id: NodeId) -> u32 {
        match self.automaton.kind(id) {
            NodeKind::Character { .. } | NodeKind::CharClass(_) => 1,
            NodeKind::Sequence { items } => items
                .iter()
                .fold(0u32, |total, &item| total.saturating_add(self.consumed_by(item))),
            NodeKind::Disjunction { alternatives } => alternatives
                .iter()
                .map(|&alternative| self.consumed_by(alternative))
                .min()
                .unwrap_or(0),
            &NodeKind::Repetition {
                element, quantifier, ..
            } => self.consumed_by(element).saturating_mul(quantifier.min),
            NodeKind::CapturingGroup { .. } => self.group_consumption(id),
            &NodeKind::NonCapturingGroup { element, .. } => {
                element.map_or(0, |element| self.consumed_by(element))
            }
            &NodeKind::BackReference { group, .. } => {
                group.map_or(0, |group| self.group_consumption(group))
            }
            _ => 0,
        }
    }
}
