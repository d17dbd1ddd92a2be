//! Regex compilation flags.
//!
//! The flag set mirrors the Java dialect: every flag can be supplied at
//! compile time, and all but `CANON_EQ` can also be toggled inline through
//! `(?idmsuxU-idmsuxU)` groups. Each automaton node records the flags in
//! effect at its position.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Flags in effect for a node or a whole pattern.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct RegexFlags: u16 {
        /// `i` — ASCII case-insensitive matching.
        const CASE_INSENSITIVE = 1 << 0;
        /// `m` — `^`/`$` match at line boundaries.
        const MULTILINE = 1 << 1;
        /// `s` — `.` also matches line terminators.
        const DOTALL = 1 << 2;
        /// `u` — case-insensitivity covers the full Unicode range.
        const UNICODE_CASE = 1 << 3;
        /// `U` — predefined classes use Unicode definitions.
        const UNICODE_CHARACTER_CLASS = 1 << 4;
        /// Canonical equivalence (no inline letter).
        const CANON_EQ = 1 << 5;
        /// `x` — free-spacing mode with `#` comments.
        const COMMENTS = 1 << 6;
        /// `d` — only `\n` counts as a line terminator.
        const UNIX_LINES = 1 << 7;
    }
}

impl RegexFlags {
    /// Parses a single inline flag letter, `None` for unknown letters.
    pub fn from_inline(letter: char) -> Option<Self> {
        match letter {
            'i' => Some(Self::CASE_INSENSITIVE),
            'm' => Some(Self::MULTILINE),
            's' => Some(Self::DOTALL),
            'u' => Some(Self::UNICODE_CASE),
            'U' => Some(Self::UNICODE_CHARACTER_CLASS),
            'x' => Some(Self::COMMENTS),
            'd' => Some(Self::UNIX_LINES),
            _ => None,
        }
    }
}
