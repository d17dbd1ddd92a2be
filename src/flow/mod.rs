//! Tracks what host code does with a compiled pattern.
//!
//! The host walks one scope (typically a compilation unit) in bottom-up
//! evaluation order and replays every statement that touches a pattern
//! as a [`FlowEvent`]. The tracker follows each compiled pattern through
//! matcher construction, accessor calls, local bindings and reads, and
//! records which accessor methods were actually invoked on it. A value
//! that leaves the scope, by being stored somewhere shared, passed to a
//! foreign call, or returned, marks its pattern as escaped: the
//! invocation list is then no longer exhaustive and the match type
//! degrades to [`MatchType::Unknown`].
//!
//! The verdict per pattern is a [`PatternUsage`]. Checks read it to
//! decide whether the pattern is matched against whole inputs, searched
//! for substrings, both, or cannot be told.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::automaton::MatchType;

/// Host handle for one pattern literal in the analyzed scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatternId(pub usize);

impl std::fmt::Display for PatternId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Host handle for one value produced while evaluating the scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValueId(pub usize);

/// Host handle for one variable or field of the scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VarId(pub usize);

/// Where an assignment puts a tracked value.
///
/// The host reduces its storage taxonomy to these two cases; array
/// slots, non-final fields and fields of other objects all count as
/// [`StorageKind::Shared`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    /// A private or method-local variable that is assigned exactly once.
    PrivateEffectivelyFinal,
    /// Storage that code outside the scope could read.
    Shared,
}

/// Argument of a group-addressed accessor (`group`, `start`, `end`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupArg {
    Number(u32),
    Name(String),
}

/// A pattern or matcher method known to the tracker, as invoked by the
/// host code.
///
/// `matches` commits the pattern to whole-input matching; the searching
/// and replacing methods commit it to substring matching; the group
/// accessors reveal nothing about the match type but carry the group
/// they address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessorMethod {
    Matches,
    Find,
    LookingAt,
    Split,
    ReplaceAll,
    ReplaceFirst,
    Results,
    Group(Option<GroupArg>),
    Start(Option<GroupArg>),
    End(Option<GroupArg>),
    GroupCount,
}

impl AccessorMethod {
    /// The match kind an invocation of this method implies, if any.
    pub fn implied_match(&self) -> Option<MatchType> {
        match self {
            AccessorMethod::Matches => Some(MatchType::Full),
            AccessorMethod::Find
            | AccessorMethod::LookingAt
            | AccessorMethod::Split
            | AccessorMethod::ReplaceAll
            | AccessorMethod::ReplaceFirst
            | AccessorMethod::Results => Some(MatchType::Partial),
            AccessorMethod::Group(_)
            | AccessorMethod::Start(_)
            | AccessorMethod::End(_)
            | AccessorMethod::GroupCount => None,
        }
    }

    /// The group this invocation addresses, for accessors that take one.
    pub fn group_arg(&self) -> Option<&GroupArg> {
        match self {
            AccessorMethod::Group(arg) | AccessorMethod::Start(arg) | AccessorMethod::End(arg) => {
                arg.as_ref()
            }
            _ => None,
        }
    }
}

/// One statement of interest, replayed by the host in evaluation order.
///
/// Sub-expressions are replayed before the expressions containing them,
/// so every value handle an event refers to has already been introduced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowEvent {
    /// A pattern literal was compiled into a pattern object.
    Compile { value: ValueId, pattern: PatternId },
    /// A matcher for some input was obtained from `source`.
    Matcher { value: ValueId, source: ValueId },
    /// A known method was called on `source`, producing `value`.
    Accessor {
        value: ValueId,
        source: ValueId,
        method: AccessorMethod,
    },
    /// Some other call or constructor ran with these arguments.
    Call { arguments: Vec<ValueId> },
    /// `value` was stored into `variable`.
    Assign {
        variable: VarId,
        value: ValueId,
        storage: StorageKind,
    },
    /// `variable` was read, producing `value`.
    Read { value: ValueId, variable: VarId },
    /// `value` was returned out of the scope.
    Return { value: ValueId },
}

/// Everything observed about one compiled pattern so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackedValue {
    /// Accessor invocations in source order.
    pub invocations: Vec<AccessorMethod>,
    /// Whether the pattern left the scope.
    pub escaped: bool,
}

/// How the analyzed pattern entered the host program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageOrigin {
    /// Compiled by code the tracker watched.
    MethodCall,
    /// Declared in a validation annotation whose framework always
    /// performs a full match.
    Annotation,
}

/// The tracker's verdict for one pattern, consumed by the checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternUsage {
    pub pattern: PatternId,
    /// How the pattern is matched against input, as far as observed.
    pub match_type: MatchType,
    /// Accessor invocations in source order. Exhaustive only as long as
    /// the pattern never escaped.
    pub invocations: Vec<AccessorMethod>,
    pub escaped: bool,
    pub origin: UsageOrigin,
}

impl PatternUsage {
    /// Usage of a pattern declared in a validation annotation: the
    /// framework matches whole inputs and nothing else ever sees the
    /// pattern object.
    pub fn annotation(pattern: PatternId) -> Self {
        Self {
            pattern,
            match_type: MatchType::Full,
            invocations: Vec::new(),
            escaped: false,
            origin: UsageOrigin::Annotation,
        }
    }

    /// Usage of a pattern the host compiled but produced no flow events
    /// for. Nothing is known about it, so it counts as escaped and only
    /// usage-independent rules apply.
    pub fn untracked(pattern: PatternId) -> Self {
        Self {
            pattern,
            match_type: MatchType::Unknown,
            invocations: Vec::new(),
            escaped: true,
            origin: UsageOrigin::MethodCall,
        }
    }

    /// Whether the invocation list is the complete set of uses.
    pub fn is_exhaustive(&self) -> bool {
        !self.escaped
    }
}

/// Replays host events and resolves, per compiled pattern, how the
/// pattern is used.
///
/// One tracker covers one scope; the host builds a fresh tracker per
/// scope so nothing leaks between scopes.
#[derive(Debug, Default)]
pub struct FlowTracker {
    /// Values currently known to carry a tracked pattern.
    values: FxHashMap<ValueId, PatternId>,
    /// Variables bound by a private effectively final assignment.
    variables: FxHashMap<VarId, PatternId>,
    tracked: FxHashMap<PatternId, TrackedValue>,
}

impl FlowTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one event. Events that refer to values the tracker has
    /// never seen are ignored.
    pub fn record(&mut self, event: FlowEvent) {
        match event {
            FlowEvent::Compile { value, pattern } => {
                self.tracked.entry(pattern).or_default();
                self.values.insert(value, pattern);
            }
            FlowEvent::Matcher { value, source } => {
                if let Some(&pattern) = self.values.get(&source) {
                    self.values.insert(value, pattern);
                }
            }
            FlowEvent::Accessor {
                value,
                source,
                method,
            } => {
                if let Some(&pattern) = self.values.get(&source) {
                    self.tracked.entry(pattern).or_default().invocations.push(method);
                    // The result keeps carrying the pattern, so storing
                    // or returning it later still escapes.
                    self.values.insert(value, pattern);
                }
            }
            FlowEvent::Call { arguments } => {
                for argument in arguments {
                    if let Some(&pattern) = self.values.get(&argument) {
                        self.escape(pattern);
                    }
                }
            }
            FlowEvent::Assign {
                variable,
                value,
                storage,
            } => {
                if let Some(&pattern) = self.values.get(&value) {
                    match storage {
                        StorageKind::PrivateEffectivelyFinal => {
                            self.variables.insert(variable, pattern);
                        }
                        StorageKind::Shared => self.escape(pattern),
                    }
                }
            }
            FlowEvent::Read { value, variable } => {
                if let Some(&pattern) = self.variables.get(&variable) {
                    self.values.insert(value, pattern);
                }
            }
            FlowEvent::Return { value } => {
                if let Some(&pattern) = self.values.get(&value) {
                    self.escape(pattern);
                }
            }
        }
    }

    fn escape(&mut self, pattern: PatternId) {
        self.tracked.entry(pattern).or_default().escaped = true;
    }

    /// Resolves every tracked pattern into a [`PatternUsage`], ordered
    /// by pattern id.
    pub fn finish(self) -> Vec<PatternUsage> {
        let mut usages: Vec<PatternUsage> = self
            .tracked
            .into_iter()
            .map(|(pattern, tracked)| {
                let match_type = if tracked.escaped {
                    MatchType::Unknown
                } else {
                    observed_match_type(&tracked.invocations)
                };
                PatternUsage {
                    pattern,
                    match_type,
                    invocations: tracked.invocations,
                    escaped: tracked.escaped,
                    origin: UsageOrigin::MethodCall,
                }
            })
            .collect();
        usages.sort_by_key(|usage| usage.pattern);
        usages
    }
}

/// Folds the observed invocations into one match type.
fn observed_match_type(invocations: &[AccessorMethod]) -> MatchType {
    let mut full = false;
    let mut partial = false;
    for method in invocations {
        match method.implied_match() {
            Some(MatchType::Full) => full = true,
            Some(MatchType::Partial) => partial = true,
            _ => {}
        }
    }
    match (full, partial) {
        (true, true) => MatchType::Both,
        (true, false) => MatchType::Full,
        (false, true) => MatchType::Partial,
        (false, false) => MatchType::Unknown,
    }
}
