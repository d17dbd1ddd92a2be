//! Anchors that can never match.
//!
//! A `^` (outside multiline mode) matches only at the very start of the
//! input, so any path that must consume a character before reaching it
//! kills the whole pattern; the mirror argument applies to end anchors
//! followed by mandatory input. Both conditions are reachability
//! questions on the automaton. Boundaries inside lookarounds are left
//! alone: a lookbehind asserts about text before the current position,
//! where the forward walk's notion of "already consumed" does not apply.

use crate::analysis::reachability::can_reach_without_consuming_input;
use crate::automaton::{
    Automaton, BoundaryKind, NodeId, NodeKind, RegexFlags, RegexParseResult,
};
use crate::checks::CheckContext;
use crate::flow::PatternUsage;
use crate::report::{CheckId, FindingSink};

const MESSAGE: &str = "Remove or replace this boundary that can never match.";

pub fn run(
    _ctx: &CheckContext<'_>,
    parse: &RegexParseResult,
    _usage: &PatternUsage,
    sink: &mut FindingSink,
) {
    if parse.has_syntax_errors() {
        return;
    }
    let automaton = &parse.automaton;
    let mut boundaries = Vec::new();
    collect_boundaries(automaton, parse.root, &mut boundaries);
    for id in boundaries {
        let NodeKind::Boundary(kind) = automaton.kind(id) else {
            continue;
        };
        if is_impossible(automaton, id, *kind) {
            sink.report(
                CheckId::ImpossibleBoundary,
                automaton.range(id),
                MESSAGE,
                None,
                Vec::new(),
            );
        }
    }
}

fn is_impossible(automaton: &Automaton, id: NodeId, kind: BoundaryKind) -> bool {
    let multiline = automaton.flags(id).contains(RegexFlags::MULTILINE);
    if kind.is_start_boundary() {
        if kind == BoundaryKind::LineStart && multiline {
            return false;
        }
        !can_reach_without_consuming_input(automaton, automaton.start(), id)
    } else if kind.is_end_boundary() {
        if kind == BoundaryKind::LineEnd && multiline {
            return false;
        }
        !can_reach_without_consuming_input(automaton, id, automaton.end())
    } else {
        // \b, \B and \G depend on the input, not the position in the
        // pattern.
        false
    }
}

/// Collects boundary nodes of the pattern in source order, skipping
/// lookaround interiors.
fn collect_boundaries(automaton: &Automaton, id: NodeId, out: &mut Vec<NodeId>) {
    match automaton.kind(id) {
        NodeKind::Boundary(_) => out.push(id),
        NodeKind::Sequence { items } => {
            for &item in items {
                collect_boundaries(automaton, item, out);
            }
        }
        NodeKind::Disjunction { alternatives } => {
            for &alternative in alternatives {
                collect_boundaries(automaton, alternative, out);
            }
        }
        NodeKind::Repetition { element, .. } | NodeKind::CapturingGroup { element, .. } => {
            collect_boundaries(automaton, *element, out);
        }
        NodeKind::NonCapturingGroup {
            element: Some(element),
            ..
        } => {
            collect_boundaries(automaton, *element, out);
        }
        _ => {}
    }
}
