//! Recursive-descent parser for the Java regex dialect.
//!
//! Parsing never fails: syntax problems are collected as
//! [`SyntaxError`]s and the parser keeps going with a best-effort tree,
//! so the analyses can still look at partially broken patterns (and the
//! syntax check can report every problem at once). The grammar is the
//! usual tower: disjunction over sequences over quantified primaries.
//!
//! Positions are char offsets into the pattern text, which is the same
//! coordinate space the findings report.

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::automaton::{
    Automaton, BoundaryKind, CharacterClass, ClassElement, GroupReference, LookAroundDirection,
    LookAroundPolarity, Node, NodeId, NodeKind, Quantifier, QuantifierModifier, RegexFlags,
    RegexParseResult, SyntaxError, TextRange,
};

/// Parses `pattern` under the given compile-time flags.
pub fn parse(pattern: &str, flags: RegexFlags) -> RegexParseResult {
    Parser::new(pattern, flags).run()
}

/// Resolved form of one escape sequence.
enum Escaped {
    /// A literal character (`\n`, `\x41`, `\\.`, ...).
    Char(char),
    /// A predefined class: one of `d D w W s S h H v V`.
    Class(char),
    /// `\p{...}` / `\P{...}`.
    Property { negated: bool, name: String },
    /// `\b \B \A \z \Z \G` outside character classes.
    Boundary(BoundaryKind),
    /// `\1`-style or `\k<name>` references.
    BackRef(GroupReference),
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    /// Flags currently in effect; inline flag groups mutate this.
    flags: RegexFlags,
    initial_flags: RegexFlags,
    nodes: Vec<Node>,
    errors: Vec<SyntaxError>,
    group_count: u32,
    groups_by_number: FxHashMap<u32, NodeId>,
    groups_by_name: FxHashMap<String, NodeId>,
    back_references: Vec<NodeId>,
    /// Depth of `[...]` nesting; free-spacing does not apply inside.
    class_depth: u32,
    contains_comments: bool,
}

impl Parser {
    fn new(pattern: &str, flags: RegexFlags) -> Self {
        Self {
            chars: pattern.chars().collect(),
            pos: 0,
            flags,
            initial_flags: flags,
            nodes: Vec::new(),
            errors: Vec::new(),
            group_count: 0,
            groups_by_number: FxHashMap::default(),
            groups_by_name: FxHashMap::default(),
            back_references: Vec::new(),
            class_depth: 0,
            contains_comments: false,
        }
    }

    fn run(mut self) -> RegexParseResult {
        let mut parts = Vec::new();
        loop {
            parts.push(self.disjunction());
            self.skip_noise();
            if !self.at_end() {
                let found = self.current_char();
                self.error_here(format!("Unexpected '{found}'"), 1);
                self.advance();
            }
            if self.at_end() {
                break;
            }
        }
        let root = if parts.len() == 1 {
            parts[0]
        } else {
            let range = self.span_of(&parts);
            self.push(NodeKind::Sequence { items: parts }, range)
        };
        self.resolve_back_references();

        let Parser {
            nodes,
            errors,
            initial_flags,
            contains_comments,
            ..
        } = self;
        RegexParseResult {
            automaton: Automaton::assemble(nodes, root, initial_flags),
            root,
            syntax_errors: errors,
            initial_flags,
            contains_comments,
        }
    }

    // ========================================================================
    // Grammar
    // ========================================================================

    fn disjunction(&mut self) -> NodeId {
        let mut alternatives = vec![self.sequence()];
        self.skip_noise();
        while self.current_is('|') {
            self.advance();
            alternatives.push(self.sequence());
            self.skip_noise();
        }
        if alternatives.len() == 1 {
            alternatives[0]
        } else {
            let range = self.span_of(&alternatives);
            self.push(NodeKind::Disjunction { alternatives }, range)
        }
    }

    fn sequence(&mut self) -> NodeId {
        let start = self.pos;
        let mut items = Vec::new();
        while let Some(item) = self.repetition() {
            items.push(item);
        }
        match items.len() {
            1 => items[0],
            0 => self.push(NodeKind::Sequence { items }, TextRange::at(start)),
            _ => {
                let range = self.span_of(&items);
                self.push(NodeKind::Sequence { items }, range)
            }
        }
    }

    fn repetition(&mut self) -> Option<NodeId> {
        self.skip_noise();
        let element = self.primary();
        self.skip_noise();
        let quantifier = self.quantifier();
        match (element, quantifier) {
            (Some(element), Some((quantifier, q_range))) => {
                let range = self.range_of(element).merge(q_range);
                Some(self.repetition_node(element, quantifier, range))
            }
            (Some(element), None) => Some(element),
            (None, Some((quantifier, q_range))) => {
                self.error_at(q_range, format!("Unexpected quantifier '{quantifier}'"));
                None
            }
            (None, None) => None,
        }
    }

    fn primary(&mut self) -> Option<NodeId> {
        match self.peek()? {
            '(' => Some(self.group()),
            '\\' => Some(self.escape_primary()),
            '[' => Some(self.character_class()),
            '.' => {
                let start = self.pos;
                self.advance();
                Some(self.push(
                    NodeKind::CharClass(CharacterClass::dot()),
                    TextRange::new(start, self.pos),
                ))
            }
            '^' => Some(self.boundary(BoundaryKind::LineStart)),
            '$' => Some(self.boundary(BoundaryKind::LineEnd)),
            ')' | '|' | '*' | '+' | '?' => None,
            c => {
                let start = self.pos;
                self.advance();
                Some(self.push(
                    NodeKind::Character { value: c, escaped: false },
                    TextRange::new(start, self.pos),
                ))
            }
        }
    }

    fn boundary(&mut self, kind: BoundaryKind) -> NodeId {
        let start = self.pos;
        self.advance();
        self.push(NodeKind::Boundary(kind), TextRange::new(start, self.pos))
    }

    // ========================================================================
    // Quantifiers
    // ========================================================================

    fn quantifier(&mut self) -> Option<(Quantifier, TextRange)> {
        let start = self.pos;
        let (min, max) = match self.peek()? {
            '*' => {
                self.advance();
                (0, None)
            }
            '+' => {
                self.advance();
                (1, None)
            }
            '?' => {
                self.advance();
                (0, Some(1))
            }
            '{' => self.curly_quantifier()?,
            _ => return None,
        };
        let modifier = match self.peek() {
            Some('+') => {
                self.advance();
                QuantifierModifier::Possessive
            }
            Some('?') => {
                self.advance();
                QuantifierModifier::Reluctant
            }
            _ => QuantifierModifier::Greedy,
        };
        Some((
            Quantifier::new(min, max, modifier),
            TextRange::new(start, self.pos),
        ))
    }

    fn curly_quantifier(&mut self) -> Option<(u32, Option<u32>)> {
        self.advance(); // '{'
        let Some(min) = self.integer() else {
            self.expected("integer");
            return None;
        };
        let mut has_comma = false;
        let mut max = Some(min);
        if self.current_is(',') {
            self.advance();
            has_comma = true;
            max = self.integer();
        }
        if self.current_is('}') {
            self.advance();
        } else if !has_comma {
            self.expected("',' or '}'");
        } else if max.is_none() {
            self.expected("integer or '}'");
        } else {
            self.expected("'}'");
        }
        Some((min, max))
    }

    fn integer(&mut self) -> Option<u32> {
        let mut value: u32 = 0;
        let mut any = false;
        while let Some(digit) = self.peek().and_then(|c| c.to_digit(10)) {
            value = value.saturating_mul(10).saturating_add(digit);
            self.advance();
            any = true;
        }
        any.then_some(value)
    }

    // ========================================================================
    // Groups
    // ========================================================================

    fn group(&mut self) -> NodeId {
        let start = self.pos;
        self.advance(); // '('
        if !self.current_is('?') {
            self.group_count += 1;
            let number = self.group_count;
            let saved = self.flags;
            let element = self.disjunction();
            self.flags = saved;
            let range = self.close_group(start);
            let id = self.push(
                NodeKind::CapturingGroup { name: None, number, element },
                range,
            );
            self.groups_by_number.insert(number, id);
            return id;
        }
        self.advance(); // '?'
        match self.peek() {
            Some(':') => {
                self.advance();
                self.non_capturing(start, RegexFlags::empty(), RegexFlags::empty(), false)
            }
            Some('>') => {
                self.advance();
                self.non_capturing(start, RegexFlags::empty(), RegexFlags::empty(), true)
            }
            Some('=') => {
                self.advance();
                self.lookaround(start, LookAroundDirection::Ahead, LookAroundPolarity::Positive)
            }
            Some('!') => {
                self.advance();
                self.lookaround(start, LookAroundDirection::Ahead, LookAroundPolarity::Negative)
            }
            Some('<') => {
                self.advance();
                match self.peek() {
                    Some('=') => {
                        self.advance();
                        self.lookaround(
                            start,
                            LookAroundDirection::Behind,
                            LookAroundPolarity::Positive,
                        )
                    }
                    Some('!') => {
                        self.advance();
                        self.lookaround(
                            start,
                            LookAroundDirection::Behind,
                            LookAroundPolarity::Negative,
                        )
                    }
                    _ => self.named_group(start),
                }
            }
            _ => self.flag_group(start),
        }
    }

    fn non_capturing(
        &mut self,
        start: usize,
        enabled: RegexFlags,
        disabled: RegexFlags,
        atomic: bool,
    ) -> NodeId {
        let saved = self.flags;
        let element = self.disjunction();
        self.flags = saved;
        let range = self.close_group(start);
        self.push(
            NodeKind::NonCapturingGroup {
                element: Some(element),
                enabled,
                disabled,
                atomic,
            },
            range,
        )
    }

    fn lookaround(
        &mut self,
        start: usize,
        direction: LookAroundDirection,
        polarity: LookAroundPolarity,
    ) -> NodeId {
        let saved = self.flags;
        let element = self.disjunction();
        self.flags = saved;
        let range = self.close_group(start);
        let end_state = self.push(
            NodeKind::EndOfLookAround { lookaround: NodeId(0) },
            TextRange::at(range.end),
        );
        let id = self.push(
            NodeKind::LookAround {
                direction,
                polarity,
                element,
                end_state,
            },
            range,
        );
        if let NodeKind::EndOfLookAround { lookaround } = &mut self.nodes[end_state.0].kind {
            *lookaround = id;
        }
        id
    }

    fn named_group(&mut self, start: usize) -> NodeId {
        let name = self.group_name();
        if self.current_is('>') {
            self.advance();
        } else {
            self.expected("'>'");
        }
        self.group_count += 1;
        let number = self.group_count;
        let saved = self.flags;
        let element = self.disjunction();
        self.flags = saved;
        let range = self.close_group(start);
        let id = self.push(
            NodeKind::CapturingGroup {
                name: Some(name.clone()),
                number,
                element,
            },
            range,
        );
        self.groups_by_number.insert(number, id);
        if !name.is_empty() {
            self.groups_by_name.insert(name, id);
        }
        id
    }

    fn group_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphabetic() || (!name.is_empty() && c.is_ascii_digit()) {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if name.is_empty() {
            self.expected("a group name");
        }
        name
    }

    fn flag_group(&mut self, start: usize) -> NodeId {
        let mut enabled = RegexFlags::empty();
        let mut disabled = RegexFlags::empty();
        let mut disabling = false;
        loop {
            match self.peek() {
                Some(')') => {
                    self.advance();
                    // A flag-only group changes the flags for the rest of
                    // the enclosing group.
                    self.flags.insert(enabled);
                    self.flags.remove(disabled);
                    return self.push(
                        NodeKind::NonCapturingGroup {
                            element: None,
                            enabled,
                            disabled,
                            atomic: false,
                        },
                        TextRange::new(start, self.pos),
                    );
                }
                Some(':') => {
                    self.advance();
                    let saved = self.flags;
                    self.flags.insert(enabled);
                    self.flags.remove(disabled);
                    let element = self.disjunction();
                    self.flags = saved;
                    let range = self.close_group(start);
                    return self.push(
                        NodeKind::NonCapturingGroup {
                            element: Some(element),
                            enabled,
                            disabled,
                            atomic: false,
                        },
                        range,
                    );
                }
                Some('-') if !disabling => {
                    disabling = true;
                    self.advance();
                }
                Some(c) => match RegexFlags::from_inline(c) {
                    Some(flag) => {
                        if disabling {
                            disabled.insert(flag);
                        } else {
                            enabled.insert(flag);
                        }
                        self.advance();
                    }
                    None => {
                        self.expected("flag or ':' or ')'");
                        self.advance();
                    }
                },
                None => {
                    self.expected("flag or ':' or ')'");
                    return self.push(
                        NodeKind::NonCapturingGroup {
                            element: None,
                            enabled,
                            disabled,
                            atomic: false,
                        },
                        TextRange::new(start, self.pos),
                    );
                }
            }
        }
    }

    fn close_group(&mut self, start: usize) -> TextRange {
        if self.current_is(')') {
            self.advance();
        } else {
            self.expected("')'");
        }
        TextRange::new(start, self.pos)
    }

    // ========================================================================
    // Escapes
    // ========================================================================

    fn escape_primary(&mut self) -> NodeId {
        let start = self.pos;
        let escaped = self.escape_token(false);
        let range = TextRange::new(start, self.pos);
        match escaped {
            Escaped::Char(value) => {
                self.push(NodeKind::Character { value, escaped: true }, range)
            }
            Escaped::Class(kind) => {
                self.push(NodeKind::CharClass(CharacterClass::escape(kind)), range)
            }
            Escaped::Property { negated, name } => self.push(
                NodeKind::CharClass(CharacterClass::of(ClassElement::Property { negated, name })),
                range,
            ),
            Escaped::Boundary(kind) => self.push(NodeKind::Boundary(kind), range),
            Escaped::BackRef(reference) => {
                let id = self.push(
                    NodeKind::BackReference { reference, group: None },
                    range,
                );
                self.back_references.push(id);
                id
            }
        }
    }

    fn escape_token(&mut self, in_class: bool) -> Escaped {
        self.advance(); // backslash
        let Some(c) = self.peek() else {
            self.expected("any character");
            return Escaped::Char('\\');
        };
        match c {
            'd' | 'D' | 'w' | 'W' | 's' | 'S' | 'h' | 'H' | 'v' | 'V' => {
                self.advance();
                Escaped::Class(c)
            }
            'p' | 'P' => self.property(c == 'P'),
            // Inside classes `\b` is the backspace character.
            'b' if in_class => {
                self.advance();
                Escaped::Char('\u{0008}')
            }
            'b' => {
                self.advance();
                Escaped::Boundary(BoundaryKind::Word)
            }
            'B' if !in_class => {
                self.advance();
                Escaped::Boundary(BoundaryKind::NonWord)
            }
            'A' if !in_class => {
                self.advance();
                Escaped::Boundary(BoundaryKind::InputStart)
            }
            'z' if !in_class => {
                self.advance();
                Escaped::Boundary(BoundaryKind::InputEnd)
            }
            'Z' if !in_class => {
                self.advance();
                Escaped::Boundary(BoundaryKind::InputEndFinalTerminator)
            }
            'G' if !in_class => {
                self.advance();
                Escaped::Boundary(BoundaryKind::PreviousMatchEnd)
            }
            '1'..='9' if !in_class => self.numeric_back_reference(),
            'k' if !in_class => self.named_back_reference(),
            '0' => self.octal_escape(),
            'x' => self.hex_escape(),
            'u' => self.unicode_escape(),
            't' => {
                self.advance();
                Escaped::Char('\t')
            }
            'n' => {
                self.advance();
                Escaped::Char('\n')
            }
            'r' => {
                self.advance();
                Escaped::Char('\r')
            }
            'f' => {
                self.advance();
                Escaped::Char('\u{000C}')
            }
            'a' => {
                self.advance();
                Escaped::Char('\u{0007}')
            }
            'e' => {
                self.advance();
                Escaped::Char('\u{001B}')
            }
            'c' => self.control_escape(),
            _ => {
                self.advance();
                Escaped::Char(c)
            }
        }
    }

    fn property(&mut self, negated: bool) -> Escaped {
        self.advance(); // 'p' | 'P'
        let name = if self.current_is('{') {
            self.advance();
            let mut name = String::new();
            while let Some(c) = self.peek().filter(|&c| c != '}') {
                name.push(c);
                self.advance();
            }
            if self.current_is('}') {
                self.advance();
            } else {
                self.expected("'}'");
            }
            name
        } else {
            match self.peek() {
                Some(c) => {
                    self.advance();
                    c.to_string()
                }
                None => {
                    self.expected("a property name");
                    String::new()
                }
            }
        };
        Escaped::Property { negated, name }
    }

    fn numeric_back_reference(&mut self) -> Escaped {
        let mut value: u32 = 0;
        while let Some(digit) = self.peek().and_then(|c| c.to_digit(10)) {
            value = value.saturating_mul(10).saturating_add(digit);
            self.advance();
        }
        Escaped::BackRef(GroupReference::Number(value))
    }

    fn named_back_reference(&mut self) -> Escaped {
        self.advance(); // 'k'
        if self.current_is('<') {
            self.advance();
        } else {
            self.expected("'<'");
        }
        let name = self.group_name();
        if self.current_is('>') {
            self.advance();
        } else {
            self.expected("'>'");
        }
        Escaped::BackRef(GroupReference::Name(name))
    }

    fn octal_escape(&mut self) -> Escaped {
        self.advance(); // '0'
        let mut value: u32 = 0;
        let mut digits = 0;
        while digits < 3 {
            match self.peek() {
                Some(c @ '0'..='7') => {
                    // A third digit is only part of the escape when the
                    // result still fits in a byte.
                    if digits == 2 && value > 0o37 {
                        break;
                    }
                    value = value * 8 + (c as u32 - '0' as u32);
                    self.advance();
                    digits += 1;
                }
                _ => break,
            }
        }
        if digits == 0 {
            self.expected("octal digit");
            return Escaped::Char('\0');
        }
        Escaped::Char(char::from_u32(value).unwrap_or('\u{FFFD}'))
    }

    fn hex_escape(&mut self) -> Escaped {
        self.advance(); // 'x'
        if self.current_is('{') {
            self.advance();
            let mut value: u32 = 0;
            let mut any = false;
            while let Some(digit) = self.peek().and_then(|c| c.to_digit(16)) {
                value = value.saturating_mul(16).saturating_add(digit);
                self.advance();
                any = true;
            }
            if !any || !self.current_is('}') {
                self.expected("hexadecimal digit or '}'");
            }
            if self.current_is('}') {
                self.advance();
            }
            return Escaped::Char(self.codepoint(value));
        }
        let mut value: u32 = 0;
        for _ in 0..2 {
            match self.peek().and_then(|c| c.to_digit(16)) {
                Some(digit) => {
                    value = value * 16 + digit;
                    self.advance();
                }
                None => {
                    self.expected("hexadecimal digit");
                    break;
                }
            }
        }
        Escaped::Char(self.codepoint(value))
    }

    fn unicode_escape(&mut self) -> Escaped {
        self.advance(); // 'u'
        let mut value: u32 = 0;
        for _ in 0..4 {
            match self.peek().and_then(|c| c.to_digit(16)) {
                Some(digit) => {
                    value = value * 16 + digit;
                    self.advance();
                }
                None => {
                    self.expected("hexadecimal digit");
                    return Escaped::Char('\u{FFFD}');
                }
            }
        }
        Escaped::Char(self.codepoint(value))
    }

    fn control_escape(&mut self) -> Escaped {
        self.advance(); // 'c'
        match self.peek() {
            Some(c) => {
                self.advance();
                Escaped::Char(char::from_u32((c as u32) ^ 0x40).unwrap_or('\u{FFFD}'))
            }
            None => {
                self.expected("any character");
                Escaped::Char('\u{FFFD}')
            }
        }
    }

    fn codepoint(&mut self, value: u32) -> char {
        match char::from_u32(value) {
            Some(c) => c,
            None => {
                self.error_here("Invalid Unicode code point".to_string(), 0);
                '\u{FFFD}'
            }
        }
    }

    // ========================================================================
    // Character classes
    // ========================================================================

    fn character_class(&mut self) -> NodeId {
        let (class, range) = self.bracketed_class();
        self.push(NodeKind::CharClass(class), range)
    }

    fn bracketed_class(&mut self) -> (CharacterClass, TextRange) {
        let start = self.pos;
        self.advance(); // '['
        self.class_depth += 1;
        let negated = if self.current_is('^') {
            self.advance();
            true
        } else {
            false
        };
        let element = self.class_intersection();
        if self.current_is(']') {
            self.advance();
        } else {
            self.expected("]");
        }
        self.class_depth -= 1;
        (
            CharacterClass::new(negated, element),
            TextRange::new(start, self.pos),
        )
    }

    fn class_intersection(&mut self) -> ClassElement {
        let mut parts = vec![self.class_union(true)];
        while self.eat_ampersands() {
            parts.push(self.class_union(false));
        }
        if parts.len() == 1 {
            parts.pop().unwrap_or(ClassElement::Union(Vec::new()))
        } else {
            ClassElement::Intersection(parts)
        }
    }

    fn eat_ampersands(&mut self) -> bool {
        if self.peek() == Some('&') && self.peek_at(1) == Some('&') {
            self.advance();
            self.advance();
            true
        } else {
            false
        }
    }

    fn class_union(&mut self, at_beginning: bool) -> ClassElement {
        let mut elements = Vec::new();
        let mut first = at_beginning;
        while let Some(element) = self.class_element(first) {
            elements.push(element);
            first = false;
        }
        if elements.len() == 1 {
            elements.pop().unwrap_or(ClassElement::Union(Vec::new()))
        } else {
            ClassElement::Union(elements)
        }
    }

    fn class_element(&mut self, at_beginning: bool) -> Option<ClassElement> {
        let c = self.peek()?;
        if c == '&' && self.peek_at(1) == Some('&') {
            return None;
        }
        match c {
            '\\' => match self.escape_token(true) {
                Escaped::Char(value) => Some(self.class_range(value)),
                Escaped::Class(kind) => Some(ClassElement::Escape { kind }),
                Escaped::Property { negated, name } => {
                    Some(ClassElement::Property { negated, name })
                }
                // Not produced in class context.
                Escaped::Boundary(_) | Escaped::BackRef(_) => {
                    Some(ClassElement::Union(Vec::new()))
                }
            },
            '[' => {
                let (class, _) = self.bracketed_class();
                Some(ClassElement::Nested(Box::new(class)))
            }
            // A ']' right after the opening bracket is a literal.
            ']' if at_beginning => {
                self.advance();
                Some(self.class_range(']'))
            }
            ']' => None,
            _ => {
                self.advance();
                Some(self.class_range(c))
            }
        }
    }

    /// Continues a just-read class character into a range when a `-`
    /// with a usable right-hand side follows.
    fn class_range(&mut self, lo: char) -> ClassElement {
        if self.peek() != Some('-') {
            return ClassElement::Literal { value: lo };
        }
        match self.peek_at(1) {
            // Trailing dash is a literal; leave it for the next element.
            None | Some(']') => ClassElement::Literal { value: lo },
            Some('\\') => {
                self.advance(); // '-'
                match self.escape_token(true) {
                    Escaped::Char(hi) => ClassElement::Range { lo, hi },
                    other => {
                        self.expected("simple character");
                        let tail = match other {
                            Escaped::Class(kind) => ClassElement::Escape { kind },
                            Escaped::Property { negated, name } => {
                                ClassElement::Property { negated, name }
                            }
                            _ => ClassElement::Union(Vec::new()),
                        };
                        ClassElement::Union(vec![
                            ClassElement::Literal { value: lo },
                            ClassElement::Literal { value: '-' },
                            tail,
                        ])
                    }
                }
            }
            Some(_) => {
                self.advance(); // '-'
                match self.peek() {
                    Some(hi) => {
                        self.advance();
                        ClassElement::Range { lo, hi }
                    }
                    None => ClassElement::Literal { value: lo },
                }
            }
        }
    }

    // ========================================================================
    // Plumbing
    // ========================================================================

    fn repetition_node(
        &mut self,
        element: NodeId,
        quantifier: Quantifier,
        range: TextRange,
    ) -> NodeId {
        let end_of_repetition = self.push(
            NodeKind::EndOfRepetition { repetition: NodeId(0) },
            TextRange::at(range.end),
        );
        let id = self.push(
            NodeKind::Repetition {
                element,
                quantifier,
                end_of_repetition,
            },
            range,
        );
        if let NodeKind::EndOfRepetition { repetition } = &mut self.nodes[end_of_repetition.0].kind
        {
            *repetition = id;
        }
        id
    }

    fn resolve_back_references(&mut self) {
        for id in std::mem::take(&mut self.back_references) {
            let NodeKind::BackReference { reference, .. } = &self.nodes[id.0].kind else {
                continue;
            };
            let reference = reference.clone();
            let range = self.nodes[id.0].range;
            let resolved = match &reference {
                GroupReference::Number(n) => {
                    if *n == 0 || *n > self.group_count {
                        self.error_at(range, format!("There is no group number {n} in the regex"));
                        None
                    } else {
                        self.groups_by_number.get(n).copied()
                    }
                }
                GroupReference::Name(name) if name.is_empty() => None,
                GroupReference::Name(name) => match self.groups_by_name.get(name).copied() {
                    Some(group) => Some(group),
                    None => {
                        self.error_at(
                            range,
                            format!("There is no group named '{name}' in the regex"),
                        );
                        None
                    }
                },
            };
            if let NodeKind::BackReference { group, .. } = &mut self.nodes[id.0].kind {
                *group = resolved;
            }
        }
    }

    /// Skips whitespace and `#` comments in free-spacing mode.
    fn skip_noise(&mut self) {
        if !self.flags.contains(RegexFlags::COMMENTS) || self.class_depth > 0 {
            return;
        }
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('#') => {
                    self.contains_comments = true;
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn push(&mut self, kind: NodeKind, range: TextRange) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(kind, range, self.flags));
        id
    }

    fn range_of(&self, id: NodeId) -> TextRange {
        self.nodes[id.0].range
    }

    fn span_of(&self, ids: &[NodeId]) -> TextRange {
        let mut range = self.range_of(ids[0]);
        if let Some(last) = ids.last() {
            range = range.merge(self.range_of(*last));
        }
        range
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn current_char(&self) -> char {
        self.chars.get(self.pos).copied().unwrap_or('\0')
    }

    fn current_is(&self, c: char) -> bool {
        self.peek() == Some(c)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn error_at(&mut self, range: TextRange, message: String) {
        trace!("syntax error at {}..{}: {message}", range.start, range.end);
        self.errors.push(SyntaxError::new(range.start, range, message));
    }

    fn error_here(&mut self, message: String, len: usize) {
        let end = (self.pos + len).min(self.chars.len());
        self.error_at(TextRange::new(self.pos, end.max(self.pos)), message);
    }

    fn expected(&mut self, token: &str) {
        let found = match self.peek() {
            Some(c) => format!("'{c}'"),
            None => "the end of the regex".to_string(),
        };
        self.error_here(format!("Expected {token}, but found {found}"), 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(pattern: &str) -> RegexParseResult {
        let result = parse(pattern, RegexFlags::empty());
        assert!(
            !result.has_syntax_errors(),
            "unexpected errors for {pattern:?}: {:?}",
            result.syntax_errors
        );
        result
    }

    fn first_error(pattern: &str) -> String {
        let result = parse(pattern, RegexFlags::empty());
        result
            .syntax_errors
            .first()
            .map(|e| e.message.clone())
            .unwrap_or_else(|| panic!("expected a syntax error for {pattern:?}"))
    }

    #[test]
    fn literal_sequence() {
        let result = ok("abc");
        let NodeKind::Sequence { items } = result.automaton.kind(result.root) else {
            panic!("expected sequence root");
        };
        assert_eq!(items.len(), 3);
        assert_eq!(
            result.automaton.kind(items[0]),
            &NodeKind::Character { value: 'a', escaped: false }
        );
        assert_eq!(result.automaton.range(items[2]), TextRange::new(2, 3));
    }

    #[test]
    fn parsing_twice_gives_equal_results() {
        let a = parse("(a|b)*c{2,3}[^x-z]\\d", RegexFlags::empty());
        let b = parse("(a|b)*c{2,3}[^x-z]\\d", RegexFlags::empty());
        assert_eq!(a, b);
    }

    #[test]
    fn quantifier_forms_and_modifiers() {
        let result = ok("a{2,5}?");
        let NodeKind::Repetition { quantifier, .. } = result.automaton.kind(result.root) else {
            panic!("expected repetition root");
        };
        assert_eq!(quantifier.min, 2);
        assert_eq!(quantifier.max, Some(5));
        assert!(quantifier.is_reluctant());

        let result = ok("a*+");
        let NodeKind::Repetition { quantifier, .. } = result.automaton.kind(result.root) else {
            panic!("expected repetition root");
        };
        assert!(quantifier.is_possessive());
        assert!(quantifier.is_open_ended());
    }

    #[test]
    fn dangling_quantifier_is_reported() {
        assert_eq!(first_error("*a"), "Unexpected quantifier '*'");
        assert_eq!(first_error("a|?b"), "Unexpected quantifier '?'");
    }

    #[test]
    fn stray_closing_paren_is_reported_and_skipped() {
        let result = parse("a)b", RegexFlags::empty());
        assert_eq!(result.syntax_errors.len(), 1);
        assert_eq!(result.syntax_errors[0].message, "Unexpected ')'");
        assert_eq!(result.syntax_errors[0].position, 1);
    }

    #[test]
    fn groups_are_numbered_by_opening_paren() {
        let result = ok("((a)(?<x>b))");
        let mut numbers = Vec::new();
        for id in result.automaton.ids() {
            if let NodeKind::CapturingGroup { number, name, .. } = result.automaton.kind(id) {
                numbers.push((*number, name.clone()));
            }
        }
        numbers.sort();
        assert_eq!(
            numbers,
            vec![(1, None), (2, None), (3, Some("x".to_string()))]
        );
    }

    #[test]
    fn named_back_reference_resolves() {
        let result = ok("(?<y>a)\\k<y>");
        let back = result
            .automaton
            .ids()
            .find_map(|id| match result.automaton.kind(id) {
                NodeKind::BackReference { group, .. } => Some(*group),
                _ => None,
            })
            .flatten();
        let group = back.expect("resolved group");
        assert!(matches!(
            result.automaton.kind(group),
            NodeKind::CapturingGroup { name: Some(n), .. } if n == "y"
        ));
    }

    #[test]
    fn unknown_references_are_reported() {
        assert_eq!(
            first_error("(a)\\2"),
            "There is no group number 2 in the regex"
        );
        assert_eq!(
            first_error("\\k<zz>a"),
            "There is no group named 'zz' in the regex"
        );
        // Forward numeric references resolve without an error.
        ok("\\1(a)");
    }

    #[test]
    fn inline_flags_scope_to_enclosing_group() {
        let result = ok("(?i:a)b");
        let mut found = Vec::new();
        for id in result.automaton.ids() {
            if let NodeKind::Character { value, .. } = result.automaton.kind(id) {
                found.push((
                    *value,
                    result
                        .automaton
                        .flags(id)
                        .contains(RegexFlags::CASE_INSENSITIVE),
                ));
            }
        }
        found.sort();
        assert_eq!(found, vec![('a', true), ('b', false)]);

        let result = ok("(?i)ab");
        for id in result.automaton.ids() {
            if let NodeKind::Character { .. } = result.automaton.kind(id) {
                assert!(result
                    .automaton
                    .flags(id)
                    .contains(RegexFlags::CASE_INSENSITIVE));
            }
        }
    }

    #[test]
    fn free_spacing_skips_whitespace_and_comments() {
        let result = parse("a # trailing\nb", RegexFlags::COMMENTS);
        assert!(!result.has_syntax_errors());
        assert!(result.contains_comments);
        let NodeKind::Sequence { items } = result.automaton.kind(result.root) else {
            panic!("expected sequence root");
        };
        assert_eq!(items.len(), 2);

        let plain = parse("a b", RegexFlags::COMMENTS);
        assert!(!plain.contains_comments);
    }

    #[test]
    fn character_class_shapes() {
        let result = ok("[]a-z&&[^d]]");
        let class = result
            .automaton
            .ids()
            .find_map(|id| match result.automaton.kind(id) {
                NodeKind::CharClass(class) => Some(class.clone()),
                _ => None,
            })
            .expect("class node");
        let ClassElement::Intersection(parts) = &class.element else {
            panic!("expected intersection, got {:?}", class.element);
        };
        assert_eq!(parts.len(), 2);
        let ClassElement::Union(first) = &parts[0] else {
            panic!("expected union");
        };
        assert_eq!(first[0], ClassElement::Literal { value: ']' });
        assert_eq!(first[1], ClassElement::Range { lo: 'a', hi: 'z' });
        let ClassElement::Nested(nested) = &parts[1] else {
            panic!("expected nested class");
        };
        assert!(nested.negated);
    }

    #[test]
    fn lookahead_threads_past_its_end_state() {
        let result = ok("(?=a)b");
        let automaton = &result.automaton;
        let (lookaround, end_state) = automaton
            .ids()
            .find_map(|id| match automaton.kind(id) {
                NodeKind::LookAround { end_state, .. } => Some((id, *end_state)),
                _ => None,
            })
            .expect("lookaround node");
        let b = automaton
            .ids()
            .find(|&id| {
                matches!(automaton.kind(id), NodeKind::Character { value: 'b', .. })
            })
            .expect("b node");
        assert_eq!(automaton.continuation(lookaround), Some(b));
        assert_eq!(automaton.successors(end_state), &[b]);
    }

    #[test]
    fn unclosed_constructs_report_expected_tokens() {
        assert_eq!(
            first_error("(a"),
            "Expected ')', but found the end of the regex"
        );
        assert_eq!(first_error("[ab"), "Expected ], but found the end of the regex");
        assert_eq!(first_error("a{x}"), "Expected integer, but found 'x'");
        assert_eq!(first_error("a{1x}"), "Expected ',' or '}', but found 'x'");
        assert_eq!(first_error("a{1,x}"), "Expected integer or '}', but found 'x'");
        assert_eq!(first_error("a{1,2x"), "Expected '}', but found 'x'");
    }

    #[test]
    fn escapes_resolve_to_characters() {
        let result = ok("\\x41\\u0042\\043\\cA\\n");
        let values: Vec<char> = result
            .automaton
            .ids()
            .filter_map(|id| match result.automaton.kind(id) {
                NodeKind::Character { value, escaped: true } => Some(*value),
                _ => None,
            })
            .collect();
        assert_eq!(values, vec!['A', 'B', '#', '\u{1}', '\n']);
    }

    #[test]
    fn empty_pattern_parses_to_empty_sequence() {
        let result = ok("");
        assert!(matches!(
            result.automaton.kind(result.root),
            NodeKind::Sequence { items } if items.is_empty()
        ));
        let automaton = &result.automaton;
        assert_eq!(automaton.successors(result.root), &[automaton.end()]);
    }
}
