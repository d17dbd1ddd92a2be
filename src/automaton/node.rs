//! Automaton node arena.
//!
//! The parsed syntax tree doubles as a threaded NFA: every node is also an
//! automaton state that knows its outgoing transitions (`successors`) and
//! the state that follows it inside its enclosing sequence
//! (`continuation`). Nodes live in a contiguous arena addressed by
//! [`NodeId`]; repetitions make the state graph cyclic, so every traversal
//! over it carries an explicit visited set.

use std::fmt;

use smallvec::SmallVec;

use crate::automaton::class::CharacterClass;
use crate::automaton::flags::RegexFlags;
use crate::automaton::quantifier::Quantifier;

/// Index of a node in the automaton arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Char-offset span into the pattern text, end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Zero-width range at a position.
    pub fn at(position: usize) -> Self {
        Self { start: position, end: position }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Smallest range covering both operands.
    pub fn merge(&self, other: TextRange) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Kind of edge leading into a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionType {
    /// Entering the state consumes nothing.
    Epsilon,
    /// Entering the state consumes one character.
    Character,
    /// Entering the state consumes the text of the referenced group.
    BackReference,
}

/// Anchor kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundaryKind {
    /// `\A`.
    InputStart,
    /// `^`.
    LineStart,
    /// `\z`.
    InputEnd,
    /// `\Z`.
    InputEndFinalTerminator,
    /// `$`.
    LineEnd,
    /// `\b`.
    Word,
    /// `\B`.
    NonWord,
    /// `\G`.
    PreviousMatchEnd,
}

impl BoundaryKind {
    /// Anchors that constrain the position before any input is consumed.
    pub fn is_start_boundary(&self) -> bool {
        matches!(self, BoundaryKind::InputStart | BoundaryKind::LineStart)
    }

    /// Anchors that constrain the position after all input is consumed.
    pub fn is_end_boundary(&self) -> bool {
        matches!(
            self,
            BoundaryKind::InputEnd | BoundaryKind::InputEndFinalTerminator | BoundaryKind::LineEnd
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookAroundDirection {
    Ahead,
    Behind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookAroundPolarity {
    Positive,
    Negative,
}

/// How a back-reference names its group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupReference {
    Number(u32),
    Name(String),
}

impl fmt::Display for GroupReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupReference::Number(n) => write!(f, "\\{n}"),
            GroupReference::Name(name) => write!(f, "\\k<{name}>"),
        }
    }
}

/// Closed set of node kinds; every analysis matches exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// One literal codepoint.
    Character { value: char, escaped: bool },
    /// `.`/`\d`-style standalone classes and bracketed classes.
    CharClass(CharacterClass),
    Boundary(BoundaryKind),
    Sequence { items: Vec<NodeId> },
    Disjunction { alternatives: Vec<NodeId> },
    Repetition {
        element: NodeId,
        quantifier: Quantifier,
        end_of_repetition: NodeId,
    },
    CapturingGroup {
        name: Option<String>,
        number: u32,
        element: NodeId,
    },
    /// `(?:…)`, `(?>…)` and flag groups; flag-only groups have no element.
    NonCapturingGroup {
        element: Option<NodeId>,
        enabled: RegexFlags,
        disabled: RegexFlags,
        atomic: bool,
    },
    LookAround {
        direction: LookAroundDirection,
        polarity: LookAroundPolarity,
        element: NodeId,
        end_state: NodeId,
    },
    /// `group` is `None` while unresolved.
    BackReference {
        reference: GroupReference,
        group: Option<NodeId>,
    },
    /// Synthetic state before the whole pattern.
    Start,
    /// Synthetic accepting state.
    Final,
    /// Loop point after one iteration of a repetition's element.
    EndOfRepetition { repetition: NodeId },
    /// Match point of a lookaround's element.
    EndOfLookAround { lookaround: NodeId },
}

/// A node and its automaton-state links.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub range: TextRange,
    pub flags: RegexFlags,
    pub continuation: Option<NodeId>,
    pub successors: SmallVec<[NodeId; 2]>,
}

impl Node {
    pub fn new(kind: NodeKind, range: TextRange, flags: RegexFlags) -> Self {
        Self {
            kind,
            range,
            flags,
            continuation: None,
            successors: SmallVec::new(),
        }
    }
}

/// Arena of nodes plus the synthetic start/final states.
///
/// Two parses of the same text produce identical arenas, so derived
/// equality gives structural pattern equality.
#[derive(Debug, Clone, PartialEq)]
pub struct Automaton {
    nodes: Vec<Node>,
    start: NodeId,
    end: NodeId,
}

impl Automaton {
    /// Assembles the automaton and threads continuations and successors
    /// from `root` to the final state.
    pub(crate) fn assemble(mut nodes: Vec<Node>, root: NodeId, flags: RegexFlags) -> Self {
        let start = NodeId(nodes.len());
        nodes.push(Node::new(NodeKind::Start, TextRange::at(0), flags));
        let end = NodeId(nodes.len());
        nodes.push(Node::new(NodeKind::Final, TextRange::at(0), flags));

        let mut automaton = Self { nodes, start, end };
        automaton.nodes[start.0].continuation = Some(root);
        automaton.nodes[start.0].successors.push(root);
        automaton.thread(root, end);
        automaton
    }

    pub fn start(&self) -> NodeId {
        self.start
    }

    pub fn end(&self) -> NodeId {
        self.end
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn range(&self, id: NodeId) -> TextRange {
        self.nodes[id.0].range
    }

    pub fn flags(&self, id: NodeId) -> RegexFlags {
        self.nodes[id.0].flags
    }

    pub fn successors(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].successors
    }

    pub fn continuation(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].continuation
    }

    /// All arena ids in creation order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Kind of edge that leads into this state.
    pub fn transition(&self, id: NodeId) -> TransitionType {
        match &self.nodes[id.0].kind {
            NodeKind::Character { .. } | NodeKind::CharClass(_) => TransitionType::Character,
            NodeKind::BackReference { .. } => TransitionType::BackReference,
            _ => TransitionType::Epsilon,
        }
    }

    /// True for states whose incoming edge consumes one character.
    pub fn is_consuming(&self, id: NodeId) -> bool {
        self.transition(id) == TransitionType::Character
    }

    /// Whether any node in the pattern is a back-reference.
    pub fn contains_back_reference(&self) -> bool {
        self.nodes
            .iter()
            .any(|node| matches!(node.kind, NodeKind::BackReference { .. }))
    }

    /// Threads `continuation` and `successors` through the subtree rooted
    /// at `node`, with `cont` as the state following it.
    fn thread(&mut self, node: NodeId, cont: NodeId) {
        self.nodes[node.0].continuation = Some(cont);
        let kind = self.nodes[node.0].kind.clone();
        match kind {
            NodeKind::Sequence { items } => {
                let entry = items.first().copied().unwrap_or(cont);
                self.nodes[node.0].successors = SmallVec::from_slice(&[entry]);
                for (index, item) in items.iter().enumerate() {
                    let next = items.get(index + 1).copied().unwrap_or(cont);
                    self.thread(*item, next);
                }
            }
            NodeKind::Disjunction { alternatives } => {
                self.nodes[node.0].successors = SmallVec::from_vec(alternatives.clone());
                for alternative in alternatives {
                    self.thread(alternative, cont);
                }
            }
            NodeKind::Repetition {
                element,
                quantifier,
                end_of_repetition,
            } => {
                let loop_first = !quantifier.is_reluctant();
                self.nodes[node.0].successors = if quantifier.min > 0 {
                    SmallVec::from_slice(&[element])
                } else if loop_first {
                    SmallVec::from_slice(&[element, cont])
                } else {
                    SmallVec::from_slice(&[cont, element])
                };
                self.nodes[end_of_repetition.0].continuation = Some(cont);
                self.nodes[end_of_repetition.0].successors = if loop_first {
                    SmallVec::from_slice(&[element, cont])
                } else {
                    SmallVec::from_slice(&[cont, element])
                };
                self.thread(element, end_of_repetition);
            }
            NodeKind::CapturingGroup { element, .. } => {
                self.nodes[node.0].successors = SmallVec::from_slice(&[element]);
                self.thread(element, cont);
            }
            NodeKind::NonCapturingGroup { element, .. } => match element {
                Some(element) => {
                    self.nodes[node.0].successors = SmallVec::from_slice(&[element]);
                    self.thread(element, cont);
                }
                None => {
                    self.nodes[node.0].successors = SmallVec::from_slice(&[cont]);
                }
            },
            NodeKind::LookAround {
                element, end_state, ..
            } => {
                self.nodes[node.0].successors = SmallVec::from_slice(&[element]);
                self.nodes[end_state.0].continuation = Some(cont);
                self.nodes[end_state.0].successors = SmallVec::from_slice(&[cont]);
                self.thread(element, end_state);
            }
            NodeKind::Character { .. }
            | NodeKind::CharClass(_)
            | NodeKind::Boundary(_)
            | NodeKind::BackReference { .. } => {
                self.nodes[node.0].successors = SmallVec::from_slice(&[cont]);
            }
            // Synthetic states are threaded by their owners; the tree walk
            // never lands on them directly.
            NodeKind::Start | NodeKind::Final | NodeKind::EndOfRepetition { .. } | NodeKind::EndOfLookAround { .. } => {}
        }
    }
}
