//! Structural complexity ceiling for whole patterns.
//!
//! The score mirrors cognitive-complexity counting: disjunctions,
//! repetitions and lookarounds cost one point plus one per level of
//! nesting they sit under (a `|` run counts once no matter how many
//! branches it has), while class negations and `&&` intersections cost
//! a flat point. Groups are free; they add ceremony, not branching.

use crate::automaton::{
    Automaton, CharacterClass, ClassElement, NodeId, NodeKind, RegexParseResult, TextRange,
};
use crate::checks::CheckContext;
use crate::flow::PatternUsage;
use crate::report::{CheckId, FindingSink};

pub fn run(
    ctx: &CheckContext<'_>,
    parse: &RegexParseResult,
    _usage: &PatternUsage,
    sink: &mut FindingSink,
) {
    if parse.has_syntax_errors() {
        return;
    }
    let mut walker = ComplexityWalker {
        automaton: &parse.automaton,
        nesting: 0,
        complexity: 0,
        components: Vec::new(),
    };
    walker.walk(parse.root);

    let max = ctx.config.max_complexity;
    if walker.complexity <= max {
        return;
    }
    let message = format!(
        "Simplify this regular expression to reduce its complexity from {} to the {} allowed.",
        walker.complexity, max
    );
    let secondaries = walker
        .components
        .into_iter()
        .map(|component| {
            let label = component.label();
            (component.range, label)
        })
        .collect();
    sink.report(
        CheckId::Complexity,
        parse.automaton.range(parse.root),
        message,
        Some(walker.complexity - max),
        secondaries,
    );
}

/// One construct's contribution to the score.
struct Component {
    range: TextRange,
    increment: u32,
    nesting: u32,
}

impl Component {
    fn label(&self) -> String {
        if self.nesting > 0 {
            format!("+{} (incl {} for nesting)", self.increment, self.nesting)
        } else {
            format!("+{}", self.increment)
        }
    }
}

struct ComplexityWalker<'a> {
    automaton: &'a Automaton,
    nesting: u32,
    complexity: u32,
    components: Vec<Component>,
}

impl<'a> ComplexityWalker<'a> {
    fn walk(&mut self, id: NodeId) {
        match self.automaton.kind(id) {
            NodeKind::Sequence { items } => {
                for &item in items {
                    self.walk(item);
                }
            }
            NodeKind::Disjunction { alternatives } => {
                self.bump(id, 1 + self.nesting, self.nesting);
                self.nesting += 1;
                for &alternative in alternatives {
                    self.walk(alternative);
                }
                self.nesting -= 1;
            }
            NodeKind::Repetition { element, .. } => {
                self.bump(id, 1 + self.nesting, self.nesting);
                self.nesting += 1;
                self.walk(*element);
                self.nesting -= 1;
            }
            NodeKind::LookAround { element, .. } => {
                self.bump(id, 1 + self.nesting, self.nesting);
                self.nesting += 1;
                self.walk(*element);
                self.nesting -= 1;
            }
            NodeKind::CapturingGroup { element, .. } => self.walk(*element),
            NodeKind::NonCapturingGroup {
                element: Some(element),
                ..
            } => self.walk(*element),
            NodeKind::CharClass(class) => {
                let extra = class_complexity(class);
                if extra > 0 {
                    self.bump(id, extra, 0);
                }
            }
            _ => {}
        }
    }

    fn bump(&mut self, id: NodeId, increment: u32, nesting: u32) {
        self.complexity += increment;
        self.components.push(Component {
            range: self.automaton.range(id),
            increment,
            nesting,
        });
    }
}

fn class_complexity(class: &CharacterClass) -> u32 {
    u32::from(class.negated) + element_complexity(&class.element)
}

fn element_complexity(element: &ClassElement) -> u32 {
    match element {
        ClassElement::Intersection(parts) => {
            1 + parts.iter().map(element_complexity).sum::<u32>()
        }
        ClassElement::Union(parts) => parts.iter().map(element_complexity).sum(),
        ClassElement::Nested(class) => class_complexity(class),
        _ => 0,
    }
}
