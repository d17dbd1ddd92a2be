//! Backtracking-complexity classification of repetitions (ReDoS risks).
//!
//! A repetition is a risk when one iteration of its element can consume
//! the same text along two different paths: on failure the engine
//! retries every split, and with an open-ended quantifier the retries
//! multiply. Each risky repetition is classified by how bad the blowup
//! is and whether a matching engine that automatically possessifies
//! adjacent single-character runs would defuse it; the worst
//! classification over all repetitions stands for the pattern.
//!
//! Whether a repetition is a risk at all depends on how the pattern is
//! used. A full match fails on leftover input unless the pattern ends
//! in a loop that eats anything, while a partial search only fails when
//! the pattern cannot accept the empty string. Both gates are computed
//! over the automaton, not the text.

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::analysis::coverage::CodepointCoverage;
use crate::analysis::inclusion;
use crate::analysis::reachability::can_reach_without_consuming_input_nor_crossing_boundaries;
use crate::automaton::{
    Automaton, BacktrackingType, LookAroundPolarity, MatchType, NodeId, NodeKind, Quantifier,
    RegexParseResult, SubAutomaton, TransitionType,
};

/// Overlapping-loop pairs are only searched among the most recent
/// candidates; older loops fall out of the window.
const MAX_TRACKED_REPETITIONS: usize = 10;

/// Worst classification found plus the repetitions responsible for it,
/// in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BacktrackingAnalysis {
    pub classification: BacktrackingType,
    pub offenders: Vec<NodeId>,
}

impl BacktrackingAnalysis {
    fn clean() -> Self {
        Self {
            classification: BacktrackingType::NoIssue,
            offenders: Vec::new(),
        }
    }
}

/// Classifies the worst backtracking blowup the pattern can exhibit
/// under the given usage. Patterns with syntax errors are not analyzed.
pub fn classify(result: &RegexParseResult, match_type: MatchType) -> BacktrackingAnalysis {
    if result.has_syntax_errors() {
        return BacktrackingAnalysis::clean();
    }
    Classifier::new(&result.automaton, match_type).run()
}

struct Classifier<'a> {
    automaton: &'a Automaton,
    match_type: MatchType,
    has_back_reference: bool,
    /// Fail gate for `Full`/`Both`, shared by every repetition.
    full_match_can_fail: bool,
    /// Fail gate for the implicit-search-prefix rule: false when the
    /// pattern accepts the empty string at every position.
    search_can_fail: bool,
    window: Vec<TrackedRepetition>,
    classification: BacktrackingType,
    offenders: Vec<NodeId>,
}

/// A repetition eligible as the earlier half of an overlapping pair.
struct TrackedRepetition {
    id: NodeId,
    element: NodeId,
    end_of_repetition: NodeId,
    coverage: CodepointCoverage,
}

impl<'a> Classifier<'a> {
    fn new(automaton: &'a Automaton, match_type: MatchType) -> Self {
        let full_match_can_fail = !full_match_always_succeeds(automaton);
        let search_can_fail = !can_reach_without_consuming_input_nor_crossing_boundaries(
            automaton,
            automaton.start(),
            automaton.end(),
        );
        Self {
            automaton,
            match_type,
            has_back_reference: automaton.contains_back_reference(),
            full_match_can_fail,
            search_can_fail,
            window: Vec::new(),
            classification: BacktrackingType::NoIssue,
            offenders: Vec::new(),
        }
    }

    fn run(mut self) -> BacktrackingAnalysis {
        let mut repetitions: Vec<NodeId> = self
            .automaton
            .ids()
            .filter(|&id| matches!(self.automaton.kind(id), NodeKind::Repetition { .. }))
            .collect();
        repetitions.sort_by_key(|&id| (self.automaton.range(id).start, id.0));
        for id in repetitions {
            self.visit_repetition(id);
        }
        if self.classification != BacktrackingType::NoIssue {
            debug!(
                "Backtracking classified as {:?} with {} offending repetitions",
                self.classification,
                self.offenders.len()
            );
        }
        BacktrackingAnalysis {
            classification: self.classification,
            offenders: self.offenders,
        }
    }

    fn visit_repetition(&mut self, id: NodeId) {
        let NodeKind::Repetition {
            element,
            quantifier,
            end_of_repetition,
        } = *self.automaton.kind(id)
        else {
            return;
        };
        if !quantifier.is_open_ended() || !self.can_fail(id) {
            return;
        }

        // A search retries the whole pattern at every input position, an
        // implicit any-string prefix. A loop the search can enter at
        // position zero overlaps that prefix, so each retry re-consumes
        // the same text.
        if matches!(self.match_type, MatchType::Partial | MatchType::Both)
            && self.search_can_fail
            && can_reach_without_consuming_input_nor_crossing_boundaries(
                self.automaton,
                self.automaton.start(),
                id,
            )
        {
            self.record(BacktrackingType::AlwaysQuadratic, id);
        }

        let current = TrackedRepetition {
            id,
            element,
            end_of_repetition,
            coverage: element_coverage(self.automaton, element),
        };

        // Two consecutive loops that can absorb the same text: on
        // failure the engine tries every way to split the input between
        // them, which is quadratic no matter how the engine optimizes.
        for index in 0..self.window.len() {
            if self.overlaps(&self.window[index], &current) {
                let earlier = self.window[index].id;
                self.record(BacktrackingType::AlwaysQuadratic, earlier);
                self.record(BacktrackingType::AlwaysQuadratic, id);
            }
        }

        if quantifier.is_possessive() {
            return;
        }

        if let Some(classification) = self.ambiguity_classification(id, element, quantifier) {
            self.record(classification, id);
        }

        if self.window.len() == MAX_TRACKED_REPETITIONS {
            self.window.remove(0);
        }
        self.window.push(current);
    }

    /// Whether a match that has entered this repetition can still fail;
    /// backtracking cost is only paid on failure.
    fn can_fail(&self, repetition: NodeId) -> bool {
        match self.match_type {
            MatchType::Full | MatchType::Both => self.full_match_can_fail,
            MatchType::Partial | MatchType::Unknown => {
                !can_reach_without_consuming_input_nor_crossing_boundaries(
                    self.automaton,
                    repetition,
                    self.automaton.end(),
                )
            }
        }
    }

    fn overlaps(&self, earlier: &TrackedRepetition, current: &TrackedRepetition) -> bool {
        self.absorbable_path_between(earlier, current)
            && inclusion::intersects(
                self.automaton,
                SubAutomaton::new(earlier.element, earlier.end_of_repetition, false),
                SubAutomaton::new(current.element, current.end_of_repetition, false),
                false,
            )
    }

    /// True when the match can get from `earlier`'s exit to `current`
    /// while every consumed character could also have been consumed by
    /// either loop, so the engine cannot tell where one loop's text ends
    /// and the other's begins.
    fn absorbable_path_between(
        &self,
        earlier: &TrackedRepetition,
        current: &TrackedRepetition,
    ) -> bool {
        let automaton = self.automaton;
        let Some(exit) = automaton.continuation(earlier.id) else {
            return false;
        };
        let mut visited = FxHashSet::default();
        let mut queue = vec![exit];
        while let Some(state) = queue.pop() {
            if state == current.id {
                return true;
            }
            if !visited.insert(state) {
                continue;
            }
            match automaton.kind(state) {
                NodeKind::Boundary(_)
                | NodeKind::BackReference { .. }
                | NodeKind::EndOfLookAround { .. } => {}
                NodeKind::Character { .. } | NodeKind::CharClass(_) => {
                    if let Some(consumed) = CodepointCoverage::from_node(automaton, state) {
                        if consumed.intersects(&earlier.coverage, true)
                            && consumed.intersects(&current.coverage, true)
                        {
                            queue.extend(automaton.successors(state).iter().copied());
                        }
                    }
                }
                _ => queue.extend(automaton.successors(state).iter().copied()),
            }
        }
        false
    }

    /// Looks for a branch point inside one iteration whose two sides can
    /// consume the same text, then grades how a possessifying engine
    /// would fare against it.
    fn ambiguity_classification(
        &self,
        id: NodeId,
        element: NodeId,
        quantifier: Quantifier,
    ) -> Option<BacktrackingType> {
        let continuation = self.automaton.continuation(id).unwrap_or(self.automaton.end());
        let mut pairs = Vec::new();
        self.collect_branch_pairs(element, &mut pairs);
        let ambiguous = pairs.into_iter().any(|(left, right)| {
            inclusion::intersects(
                self.automaton,
                SubAutomaton::new(left, continuation, false),
                SubAutomaton::new(right, continuation, false),
                false,
            )
        });
        if !ambiguous {
            return None;
        }
        if self.has_back_reference
            || quantifier.is_reluctant()
            || self.is_bare_double_loop(element)
        {
            // Back-references defeat automatic possessification, a
            // reluctant outer loop is never possessified, and a doubly
            // nested loop over one character blows up even when the
            // inner loop is optimized.
            Some(BacktrackingType::AlwaysExponential)
        } else if self.has_open_ended_feeder(element) {
            Some(BacktrackingType::QuadraticWhenOptimized)
        } else {
            Some(BacktrackingType::LinearWhenOptimized)
        }
    }

    /// Collects the branch choices inside one iteration of a
    /// repetition: alternative pairs of disjunctions and the
    /// iterate-vs-leave choice of non-fixed inner repetitions. Atomic
    /// groups, possessive repetitions and lookarounds cannot be
    /// backtracked into, so their subtrees contribute nothing.
    fn collect_branch_pairs(&self, element: NodeId, pairs: &mut Vec<(NodeId, NodeId)>) {
        let automaton = self.automaton;
        let mut queue = vec![element];
        while let Some(state) = queue.pop() {
            match automaton.kind(state) {
                NodeKind::Sequence { items } => queue.extend(items.iter().copied()),
                NodeKind::Disjunction { alternatives } => {
                    for (index, &left) in alternatives.iter().enumerate() {
                        for &right in &alternatives[index + 1..] {
                            pairs.push((left, right));
                        }
                    }
                    queue.extend(alternatives.iter().copied());
                }
                NodeKind::Repetition {
                    element: inner,
                    quantifier,
                    ..
                } => {
                    if quantifier.is_possessive() {
                        continue;
                    }
                    if !quantifier.is_fixed() {
                        if let Some(continuation) = automaton.continuation(state) {
                            pairs.push((*inner, continuation));
                        }
                    }
                    queue.push(*inner);
                }
                NodeKind::CapturingGroup { element: inner, .. } => queue.push(*inner),
                NodeKind::NonCapturingGroup {
                    element: Some(inner),
                    atomic: false,
                    ..
                } => queue.push(*inner),
                _ => {}
            }
        }
    }

    /// `(a+)+`-shaped: the element is, through plain group wrappers,
    /// exactly one open-ended non-possessive repetition over a single
    /// character or class.
    fn is_bare_double_loop(&self, element: NodeId) -> bool {
        let automaton = self.automaton;
        let mut state = element;
        loop {
            match automaton.kind(state) {
                NodeKind::CapturingGroup { element: inner, .. } => state = *inner,
                NodeKind::NonCapturingGroup {
                    element: Some(inner),
                    atomic: false,
                    ..
                } => state = *inner,
                NodeKind::Repetition {
                    element: inner,
                    quantifier,
                    ..
                } => {
                    return quantifier.is_open_ended()
                        && !quantifier.is_possessive()
                        && matches!(
                            automaton.kind(*inner),
                            NodeKind::Character { .. } | NodeKind::CharClass(_)
                        );
                }
                _ => return false,
            }
        }
    }

    /// Whether the element contains an open-ended non-possessive inner
    /// repetition feeding the ambiguity, which keeps the blowup
    /// quadratic even after the engine possessifies what it can.
    fn has_open_ended_feeder(&self, element: NodeId) -> bool {
        let automaton = self.automaton;
        let mut queue = vec![element];
        while let Some(state) = queue.pop() {
            match automaton.kind(state) {
                NodeKind::Sequence { items } => queue.extend(items.iter().copied()),
                NodeKind::Disjunction { alternatives } => {
                    queue.extend(alternatives.iter().copied());
                }
                NodeKind::Repetition {
                    element: inner,
                    quantifier,
                    ..
                } => {
                    if quantifier.is_possessive() {
                        continue;
                    }
                    if quantifier.is_open_ended() {
                        return true;
                    }
                    queue.push(*inner);
                }
                NodeKind::CapturingGroup { element: inner, .. } => queue.push(*inner),
                NodeKind::NonCapturingGroup {
                    element: Some(inner),
                    atomic: false,
                    ..
                } => queue.push(*inner),
                _ => {}
            }
        }
        false
    }

    fn record(&mut self, classification: BacktrackingType, offender: NodeId) {
        if classification > self.classification {
            self.classification = classification;
        }
        if !self.offenders.contains(&offender) {
            self.offenders.push(offender);
        }
    }
}

/// A full match that always succeeds never backtracks pathologically.
/// The walk looks for a path from Start to Final over epsilon edges
/// where some universal eater consumed the rest of the input; without
/// one, leftover input fails the match.
fn full_match_always_succeeds(automaton: &Automaton) -> bool {
    let mut visited = FxHashSet::default();
    let mut queue = vec![(automaton.start(), false)];
    while let Some((state, ate)) = queue.pop() {
        if !visited.insert((state, ate)) {
            continue;
        }
        if state == automaton.end() {
            if ate {
                return true;
            }
            continue;
        }
        if let Some(continuation) = universal_eater_continuation(automaton, state) {
            // The eater absorbs arbitrary input, but only helps if what
            // follows it can be entered without consuming.
            if automaton.transition(continuation) == TransitionType::Epsilon {
                queue.push((continuation, true));
            }
            continue;
        }
        let negative_element = negative_look_around_element(automaton, state);
        for &successor in automaton.successors(state) {
            if Some(successor) == negative_element {
                continue;
            }
            if automaton.transition(successor) == TransitionType::Epsilon {
                queue.push((successor, ate));
            }
        }
    }
    false
}

fn negative_look_around_element(automaton: &Automaton, state: NodeId) -> Option<NodeId> {
    match automaton.kind(state) {
        NodeKind::LookAround {
            polarity: LookAroundPolarity::Negative,
            element,
            ..
        } => Some(*element),
        _ => None,
    }
}

/// An open-ended, non-reluctant repetition whose element covers every
/// codepoint under the active flags, like `.*` with DOTALL or
/// `[\s\S]*`. Such a loop consumes any remaining input.
fn universal_eater_continuation(automaton: &Automaton, state: NodeId) -> Option<NodeId> {
    let NodeKind::Repetition {
        element, quantifier, ..
    } = automaton.kind(state)
    else {
        return None;
    };
    if !quantifier.is_open_ended() || quantifier.is_reluctant() {
        return None;
    }
    if element_coverage(automaton, *element).covers_everything() {
        automaton.continuation(state)
    } else {
        None
    }
}

/// Approximate coverage of what one pass over a subtree can consume.
/// Shapes that cannot be summarized as a character set (multi-item
/// sequences, boundaries, references, lookarounds) become unknown.
fn element_coverage(automaton: &Automaton, root: NodeId) -> CodepointCoverage {
    let mut coverage = CodepointCoverage::new();
    collect_coverage(automaton, root, &mut coverage);
    coverage
}

fn collect_coverage(automaton: &Automaton, state: NodeId, coverage: &mut CodepointCoverage) {
    match automaton.kind(state) {
        NodeKind::Character { value, .. } => coverage.add_character(*value, automaton.flags(state)),
        NodeKind::CharClass(class) => coverage.add_class(class, automaton.flags(state)),
        NodeKind::CapturingGroup { element, .. } => collect_coverage(automaton, *element, coverage),
        NodeKind::NonCapturingGroup {
            element: Some(element),
            ..
        } => collect_coverage(automaton, *element, coverage),
        NodeKind::NonCapturingGroup { element: None, .. } => {}
        NodeKind::Repetition {
            element, quantifier, ..
        } => {
            if quantifier.min <= 1 {
                collect_coverage(automaton, *element, coverage);
            } else {
                coverage.mark_unknown();
            }
        }
        NodeKind::Sequence { items } => match items.as_slice() {
            [] => {}
            [only] => collect_coverage(automaton, *only, coverage),
            _ => coverage.mark_unknown(),
        },
        NodeKind::Disjunction { alternatives } => {
            for &alternative in alternatives {
                collect_coverage(automaton, alternative, coverage);
            }
        }
        _ => coverage.mark_unknown(),
    }
}
