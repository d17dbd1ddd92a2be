//! Approximated sets of codepoints matched by one consuming element.
//!
//! [`CodepointCoverage`] is a run-length encoded character set over the
//! full Unicode range. It deliberately over- and under-approximates:
//! property escapes, class intersections and `\h`-style escapes are
//! recorded as "contains unknown characters" instead of being resolved,
//! and every query takes a `default_answer` to return in that case.
//! Callers pick the default that avoids reporting a finding on shaky
//! evidence.

use std::collections::BTreeMap;
use std::ops::Bound;

use once_cell::sync::Lazy;

use crate::automaton::{Automaton, CharacterClass, ClassElement, NodeId, NodeKind, RegexFlags};

/// Highest valid Unicode codepoint.
pub const MAX_CODE_POINT: u32 = 0x0010_FFFF;

/// Codepoints of `\s` under `UNICODE_CHARACTER_CLASS`, as inclusive
/// runs in ascending order.
static UNICODE_WHITESPACE: &[(u32, u32)] = &[
    (0x09, 0x0D),
    (0x20, 0x20),
    (0x85, 0x85),
    (0xA0, 0xA0),
    (0x1680, 0x1680),
    (0x2000, 0x200A),
    (0x2028, 0x2029),
    (0x202F, 0x202F),
    (0x205F, 0x205F),
    (0x3000, 0x3000),
];

/// Complement of [`UNICODE_WHITESPACE`], derived once at first use.
static UNICODE_NON_WHITESPACE: Lazy<Vec<(u32, u32)>> =
    Lazy::new(|| complement(UNICODE_WHITESPACE));

fn complement(runs: &[(u32, u32)]) -> Vec<(u32, u32)> {
    let mut out = Vec::with_capacity(runs.len() + 1);
    let mut next = 0;
    for &(lo, hi) in runs {
        if lo > next {
            out.push((next, lo - 1));
        }
        next = hi + 1;
    }
    if next <= MAX_CODE_POINT {
        out.push((next, MAX_CODE_POINT));
    }
    out
}

/// Run-length encoded membership map.
///
/// For an entry `k -> true` every codepoint from `k` up to (excluding)
/// the next key is covered; `k -> false` means those codepoints are
/// not. A codepoint is in the set iff the value of the closest entry at
/// or below it is `true`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodepointCoverage {
    runs: BTreeMap<u32, bool>,
    contains_unknown: bool,
}

impl CodepointCoverage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the coverage of a single consuming node, or `None` when
    /// the node does not consume characters.
    pub fn from_node(automaton: &Automaton, id: NodeId) -> Option<Self> {
        let mut coverage = Self::new();
        match automaton.kind(id) {
            NodeKind::Character { value, .. } => {
                coverage.add_character(*value, automaton.flags(id));
            }
            NodeKind::CharClass(class) => coverage.add_class(class, automaton.flags(id)),
            _ => return None,
        }
        Some(coverage)
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty() && !self.contains_unknown
    }

    pub fn contains_unknown(&self) -> bool {
        self.contains_unknown
    }

    pub fn mark_unknown(&mut self) {
        self.contains_unknown = true;
    }

    /// True iff `cp` is in the set (unknown characters aside).
    pub fn contains(&self, cp: u32) -> bool {
        matches!(self.runs.range(..=cp).next_back(), Some((_, true)))
    }

    /// True iff every codepoint is covered and nothing is unknown.
    pub fn covers_everything(&self) -> bool {
        !self.contains_unknown && self.covers_range(0, MAX_CODE_POINT)
    }

    /// True iff the two sets share at least one codepoint.
    ///
    /// When either side contains unknown characters and the other side
    /// is non-empty, the honest answer is "maybe"; `default_answer` is
    /// returned in that case.
    pub fn intersects(&self, that: &CodepointCoverage, default_answer: bool) -> bool {
        if default_answer
            && ((self.contains_unknown && !that.is_empty())
                || (!self.is_empty() && that.contains_unknown))
        {
            return true;
        }
        let mut iter = that.runs.iter().peekable();
        while let Some((&from, &covered)) = iter.next() {
            if covered {
                let to = iter.peek().map_or(MAX_CODE_POINT, |&(&k, _)| k);
                if self.has_entry_between(from, to) {
                    return true;
                }
            }
        }
        false
    }

    /// True iff every codepoint of `that` is also in `self`.
    ///
    /// Unknown characters on either side make the question undecidable,
    /// so `default_answer` is returned.
    pub fn superset_of(&self, that: &CodepointCoverage, default_answer: bool) -> bool {
        if self.contains_unknown || that.contains_unknown {
            return default_answer;
        }
        let mut iter = that.runs.iter().peekable();
        while let Some((&from, &covered)) = iter.next() {
            if covered {
                let to = iter.peek().map_or(MAX_CODE_POINT + 1, |&(&k, _)| k);
                if !self.covers_range(from, to - 1) {
                    return false;
                }
            }
        }
        true
    }

    fn has_entry_between(&self, from: u32, to: u32) -> bool {
        matches!(self.runs.range(..=from).next_back(), Some((_, true)))
            || self
                .runs
                .range((Bound::Excluded(from), Bound::Excluded(to)))
                .next()
                .is_some()
    }

    fn covers_range(&self, from: u32, to: u32) -> bool {
        if !matches!(self.runs.range(..=from).next_back(), Some((_, true))) {
            return false;
        }
        self.runs
            .range((Bound::Excluded(from), Bound::Included(to)))
            .all(|(_, &covered)| covered)
    }

    /// Marks `[from, to]` as covered, keeping the runs after `to`
    /// intact.
    pub fn add_range(&mut self, from: u32, to: u32) {
        if from > to {
            return;
        }
        let old_entry = self.runs.range(..=to).next_back().map(|(&k, &v)| (k, v));
        let old_end = old_entry.and_then(|(k, _)| {
            self.runs
                .range((Bound::Excluded(k), Bound::Unbounded))
                .next()
                .map(|(&next, _)| next)
        });
        self.runs.insert(from, true);
        let holes: Vec<u32> = self
            .runs
            .range((Bound::Excluded(from), Bound::Included(to)))
            .filter(|&(_, &covered)| !covered)
            .map(|(&k, _)| k)
            .collect();
        for key in holes {
            self.runs.insert(key, true);
        }
        let next = to + 1;
        if next <= MAX_CODE_POINT {
            match old_entry {
                // The run that used to contain `to` went past it, so it
                // resumes right after the inserted range.
                Some((_, true)) if old_end.map_or(true, |end| end > next) => {
                    self.runs.insert(next, true);
                }
                _ => {
                    self.runs.entry(next).or_insert(false);
                }
            }
        }
    }

    /// Adds a single character, honoring case-insensitive matching.
    pub fn add_character(&mut self, value: char, flags: RegexFlags) {
        self.add_folded(value as u32, value as u32, flags);
    }

    /// Adds the contents of a character class, resolving negation.
    pub fn add_class(&mut self, class: &CharacterClass, flags: RegexFlags) {
        if !class.negated {
            self.add_element(&class.element, flags);
            return;
        }
        let mut inner = CodepointCoverage::new();
        inner.add_element(&class.element, flags);
        if inner.contains_unknown {
            // Negating unknown contents leaves us unable to say anything
            // about any codepoint, including the ones added earlier.
            self.contains_unknown = true;
            self.runs.clear();
            return;
        }
        if !matches!(inner.runs.get(&0), Some(true)) {
            self.runs.insert(0, true);
        }
        for (&key, &covered) in &inner.runs {
            self.runs.insert(key, !covered);
        }
    }

    pub fn add_element(&mut self, element: &ClassElement, flags: RegexFlags) {
        match element {
            ClassElement::Literal { value } => {
                self.add_folded(*value as u32, *value as u32, flags);
            }
            ClassElement::Range { lo, hi } => self.add_folded(*lo as u32, *hi as u32, flags),
            ClassElement::Escape { kind } => self.add_escape(*kind, flags),
            ClassElement::Property { .. } => self.contains_unknown = true,
            ClassElement::Union(elements) => {
                for element in elements {
                    self.add_element(element, flags);
                }
            }
            ClassElement::Intersection(_) => self.contains_unknown = true,
            ClassElement::Nested(class) => self.add_class(class, flags),
            ClassElement::Dot => self.add_dot(flags),
        }
    }

    fn add_escape(&mut self, kind: char, flags: RegexFlags) {
        let unicode = flags.contains(RegexFlags::UNICODE_CHARACTER_CLASS);
        match kind {
            'd' => {
                self.add_range('0' as u32, '9' as u32);
                if unicode {
                    self.contains_unknown = true;
                }
            }
            'D' => {
                self.add_range(0x00, '0' as u32 - 1);
                if unicode {
                    self.add_range('9' as u32 + 1, 0xFF);
                    self.contains_unknown = true;
                } else {
                    self.add_range('9' as u32 + 1, MAX_CODE_POINT);
                }
            }
            'w' => {
                self.add_range('0' as u32, '9' as u32);
                self.add_range('A' as u32, 'Z' as u32);
                self.add_range('_' as u32, '_' as u32);
                self.add_range('a' as u32, 'z' as u32);
                if unicode {
                    self.contains_unknown = true;
                }
            }
            'W' => {
                self.add_range(0x00, '0' as u32 - 1);
                self.add_range('9' as u32 + 1, 'A' as u32 - 1);
                self.add_range('Z' as u32 + 1, '_' as u32 - 1);
                self.add_range('`' as u32, '`' as u32);
                if unicode {
                    self.add_range('z' as u32 + 1, 'µ' as u32 - 1);
                    self.contains_unknown = true;
                } else {
                    self.add_range('z' as u32 + 1, MAX_CODE_POINT);
                }
            }
            's' => {
                if unicode {
                    for &(lo, hi) in UNICODE_WHITESPACE {
                        self.add_range(lo, hi);
                    }
                } else {
                    self.add_range('\t' as u32, '\r' as u32);
                    self.add_range(' ' as u32, ' ' as u32);
                }
            }
            'S' => {
                if unicode {
                    for &(lo, hi) in UNICODE_NON_WHITESPACE.iter() {
                        self.add_range(lo, hi);
                    }
                } else {
                    self.add_range(0x00, '\t' as u32 - 1);
                    self.add_range('\r' as u32 + 1, ' ' as u32 - 1);
                    self.add_range(' ' as u32 + 1, MAX_CODE_POINT);
                }
            }
            // \h, \v and friends depend on definitions we do not model.
            _ => self.contains_unknown = true,
        }
    }

    fn add_dot(&mut self, flags: RegexFlags) {
        if flags.contains(RegexFlags::DOTALL) {
            self.add_range(0, MAX_CODE_POINT);
        } else if flags.contains(RegexFlags::UNIX_LINES) {
            self.add_range(0x00, '\n' as u32 - 1);
            self.add_range('\n' as u32 + 1, MAX_CODE_POINT);
        } else {
            // Everything except \n, \r, NEL and the Unicode line and
            // paragraph separators.
            self.add_range(0x00, 0x09);
            self.add_range(0x0B, 0x0C);
            self.add_range(0x0E, 0x84);
            self.add_range(0x86, 0x2027);
            self.add_range(0x202A, MAX_CODE_POINT);
        }
    }

    fn add_folded(&mut self, from: u32, to: u32, flags: RegexFlags) {
        let upper_from = simple_upper(from);
        let upper_to = simple_upper(to);
        let lower_from = simple_lower(upper_from);
        let lower_to = simple_lower(upper_to);
        let ascii = from < 128 && to < 128;
        if flags.contains(RegexFlags::CASE_INSENSITIVE)
            && lower_from != upper_from
            && lower_to != upper_to
            && (ascii || flags.contains(RegexFlags::UNICODE_CASE))
        {
            self.add_range(upper_from, upper_to);
            self.add_range(lower_from, lower_to);
        } else {
            self.add_range(from, to);
        }
    }
}

/// One-to-one uppercase mapping; multi-character expansions are left
/// unchanged, like `Character.toUpperCase` does.
fn simple_upper(cp: u32) -> u32 {
    let Some(c) = char::from_u32(cp) else {
        return cp;
    };
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) => u as u32,
        _ => cp,
    }
}

fn simple_lower(cp: u32) -> u32 {
    let Some(c) = char::from_u32(cp) else {
        return cp;
    };
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l as u32,
        _ => cp,
    }
}
