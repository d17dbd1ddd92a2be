//! Reachability queries over the threaded automaton.
//!
//! Two flavors are needed by the checks: a zero-consumption walk that
//! only follows epsilon edges (can this anchor fire at all?), and a
//! memoized any-path walk used when it only matters whether one state
//! can eventually lead to another.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use crate::automaton::{Automaton, LookAroundPolarity, NodeId, NodeKind, TransitionType};

/// True iff `goal` can be reached from `from` without consuming any
/// input.
///
/// Backtracking edges are not followed: the end state of a lookaround
/// only counts when it is the goal itself, and the element of a
/// negative lookaround is never entered.
pub fn can_reach_without_consuming_input(
    automaton: &Automaton,
    from: NodeId,
    goal: NodeId,
) -> bool {
    let mut visited = FxHashSet::default();
    epsilon_walk(automaton, from, goal, false, &mut visited)
}

/// Like [`can_reach_without_consuming_input`], but boundaries also stop
/// the walk. Used to decide whether a repetition sits at the very start
/// of what the pattern can match.
pub fn can_reach_without_consuming_input_nor_crossing_boundaries(
    automaton: &Automaton,
    from: NodeId,
    goal: NodeId,
) -> bool {
    let mut visited = FxHashSet::default();
    epsilon_walk(automaton, from, goal, true, &mut visited)
}

fn epsilon_walk(
    automaton: &Automaton,
    current: NodeId,
    goal: NodeId,
    stop_at_boundaries: bool,
    visited: &mut FxHashSet<NodeId>,
) -> bool {
    if current == goal {
        return true;
    }
    if !visited.insert(current) {
        return false;
    }
    for &successor in automaton.successors(current) {
        if let NodeKind::LookAround {
            polarity: LookAroundPolarity::Negative,
            element,
            ..
        } = automaton.kind(current)
        {
            if successor == *element {
                continue;
            }
        }
        match automaton.kind(successor) {
            // What follows the end of a lookaround does not directly
            // follow what precedes it, so the end state is reachable
            // only as the goal itself.
            NodeKind::EndOfLookAround { .. } => {
                if successor == goal {
                    return true;
                }
            }
            NodeKind::Boundary(_) if stop_at_boundaries => {}
            _ => {
                if automaton.transition(successor) == TransitionType::Epsilon
                    && epsilon_walk(automaton, successor, goal, stop_at_boundaries, visited)
                {
                    return true;
                }
            }
        }
    }
    false
}

/// Memoized any-path reachability.
///
/// The cache is keyed by `(from, goal)` and must be [cleared] between
/// patterns, since node ids are only meaningful within one automaton.
/// Once the cache is full the checker gives up and returns its
/// configured default answer.
///
/// [cleared]: ReachabilityChecker::clear
#[derive(Debug)]
pub struct ReachabilityChecker {
    cache: FxHashMap<(NodeId, NodeId), bool>,
    default_answer: bool,
}

impl ReachabilityChecker {
    const MAX_CACHE_SIZE: usize = 5_000;

    pub fn new(default_answer: bool) -> Self {
        Self {
            cache: FxHashMap::default(),
            default_answer,
        }
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// True iff any path, consuming or not, leads from `from` to
    /// `goal`.
    pub fn can_reach(&mut self, automaton: &Automaton, from: NodeId, goal: NodeId) -> bool {
        let mut visited = FxHashSet::default();
        self.search(automaton, from, goal, &mut visited)
    }

    fn search(
        &mut self,
        automaton: &Automaton,
        current: NodeId,
        goal: NodeId,
        visited: &mut FxHashSet<NodeId>,
    ) -> bool {
        if current == goal {
            return true;
        }
        if let Some(&cached) = self.cache.get(&(current, goal)) {
            return cached;
        }
        if !visited.insert(current) {
            return false;
        }
        if self.cache.len() >= Self::MAX_CACHE_SIZE {
            trace!("Reachability cache full, answering {}", self.default_answer);
            return self.default_answer;
        }
        let mut reached = false;
        for &successor in automaton.successors(current) {
            if self.search(automaton, successor, goal, visited) {
                reached = true;
                break;
            }
        }
        self.cache.insert((current, goal), reached);
        reached
    }
}
