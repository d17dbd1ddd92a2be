//! Repetition quantifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Backtracking behavior of a quantifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantifierModifier {
    /// Match as much as possible, give back on demand.
    Greedy,
    /// Match as little as possible, extend on demand.
    Reluctant,
    /// Match as much as possible, never give back.
    Possessive,
}

/// Repetition bounds plus backtracking modifier. `max == None` means
/// unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quantifier {
    pub min: u32,
    pub max: Option<u32>,
    pub modifier: QuantifierModifier,
}

impl Quantifier {
    pub fn new(min: u32, max: Option<u32>, modifier: QuantifierModifier) -> Self {
        Self { min, max, modifier }
    }

    /// `*`, `+`, `{n,}` — no upper bound.
    pub fn is_open_ended(&self) -> bool {
        self.max.is_none()
    }

    /// `{n}` — exactly n repetitions.
    pub fn is_fixed(&self) -> bool {
        self.max == Some(self.min)
    }

    pub fn is_greedy(&self) -> bool {
        self.modifier == QuantifierModifier::Greedy
    }

    pub fn is_reluctant(&self) -> bool {
        self.modifier == QuantifierModifier::Reluctant
    }

    pub fn is_possessive(&self) -> bool {
        self.modifier == QuantifierModifier::Possessive
    }
}

impl fmt::Display for Quantifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            (0, None) => write!(f, "*")?,
            (1, None) => write!(f, "+")?,
            (0, Some(1)) => write!(f, "?")?,
            (min, None) => write!(f, "{{{min},}}")?,
            (min, Some(max)) if min == max => write!(f, "{{{min}}}")?,
            (min, Some(max)) => write!(f, "{{{min},{max}}}")?,
        }
        match self.modifier {
            QuantifierModifier::Greedy => Ok(()),
            QuantifierModifier::Reluctant => write!(f, "?"),
            QuantifierModifier::Possessive => write!(f, "+"),
        }
    }
}
