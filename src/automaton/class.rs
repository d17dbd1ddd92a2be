//! Character-class element model.
//!
//! A single consuming position in a pattern is either a literal character
//! or a character class. Classes keep their syntactic element structure
//! (ranges, unions, intersections, nesting, predefined escapes) so that
//! the analyses can reason about their codepoint coverage without ever
//! flattening eagerly.

use serde::{Deserialize, Serialize};

/// One element inside a character class (or a standalone class-like
/// construct such as `.` or `\d`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassElement {
    /// A single codepoint, either plain or escaped.
    Literal { value: char },
    /// `a-z` style inclusive range.
    Range { lo: char, hi: char },
    /// Predefined class escape: one of `d D w W s S h H v V`.
    Escape { kind: char },
    /// `\p{...}` / `\P{...}` property — contents unknown to the analyses.
    Property { negated: bool, name: String },
    /// Juxtaposed elements: `[abc0-9\d]`.
    Union(Vec<ClassElement>),
    /// `&&`-joined operands: `[a-z&&[^aeiou]]`.
    Intersection(Vec<ClassElement>),
    /// A bracketed class nested inside another class.
    Nested(Box<CharacterClass>),
    /// The `.` metacharacter; its coverage depends on the active flags.
    Dot,
}

/// A (possibly negated) character class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterClass {
    pub negated: bool,
    pub element: ClassElement,
}

impl CharacterClass {
    pub fn new(negated: bool, element: ClassElement) -> Self {
        Self { negated, element }
    }

    /// Plain class around a single element.
    pub fn of(element: ClassElement) -> Self {
        Self::new(false, element)
    }

    /// The `.` metacharacter.
    pub fn dot() -> Self {
        Self::of(ClassElement::Dot)
    }

    /// A predefined escape such as `\d` used outside brackets.
    pub fn escape(kind: char) -> Self {
        Self::of(ClassElement::Escape { kind })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors() {
        let dot = CharacterClass::dot();
        assert!(!dot.negated);
        assert_eq!(dot.element, ClassElement::Dot);

        let digits = CharacterClass::escape('d');
        assert_eq!(digits.element, ClassElement::Escape { kind: 'd' });

        let negated = CharacterClass::new(true, ClassElement::Literal { value: ',' });
        assert!(negated.negated);
    }
}
