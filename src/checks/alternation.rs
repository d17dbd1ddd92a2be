//! Alternations that are really character classes in disguise.

use crate::automaton::{Automaton, NodeId, NodeKind, RegexParseResult};
use crate::checks::CheckContext;
use crate::flow::PatternUsage;
use crate::report::{CheckId, FindingSink};

const MESSAGE: &str = "Replace this alternation with a character class.";

/// Flags every disjunction whose alternatives are all single characters
/// or class items: `a|b|c` backtracks through three branches where
/// `[abc]` decides with one table lookup.
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
    let mut disjunctions: Vec<NodeId> = automaton
        .ids()
        .filter(|&id| is_single_character_alternation(automaton, id))
        .collect();
    disjunctions.sort_by_key(|&id| (automaton.range(id).start, id.0));
    for id in disjunctions {
        sink.report(
            CheckId::SingleCharacterAlternation,
            automaton.range(id),
            MESSAGE,
            None,
            Vec::new(),
        );
    }
}

fn is_single_character_alternation(automaton: &Automaton, id: NodeId) -> bool {
    let NodeKind::Disjunction { alternatives } = automaton.kind(id) else {
        return false;
    };
    alternatives.iter().all(|&alternative| {
        matches!(
            automaton.kind(alternative),
            NodeKind::Character { .. } | NodeKind::CharClass(_)
        )
    })
}
