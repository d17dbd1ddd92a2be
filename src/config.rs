//! Analysis configuration.
//!
//! All thresholds recognized by the engine live here. The defaults mirror
//! the values the rules were tuned against; both limits are heuristics and
//! deliberately stay configurable.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RexError};

/// Default ceiling for the structural complexity rule.
pub const DEFAULT_MAX_COMPLEXITY: u32 = 20;

/// Default ceiling for the stack-consumption factor rule.
pub const DEFAULT_MAX_STACK_CONSUMPTION_FACTOR: f64 = 5.0;

/// Tunable limits and target-engine capabilities.
///
/// `auto_possessification` describes the regex engine the analyzed patterns
/// will run on: when true, the engine is assumed to rewrite unambiguously
/// bounded single-character quantifier runs into their possessive form,
/// which downgrades some exponential backtracking risks to polynomial ones
/// and silences others entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct AnalysisConfig {
    /// Maximum allowed structural complexity score per pattern.
    pub max_complexity: u32,
    /// Maximum allowed worst-case recursion depth per consumed character.
    pub max_stack_consumption_factor: f64,
    /// Whether the target engine folds adjacent single-character
    /// quantifier runs into possessive loops on its own.
    pub auto_possessification: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_complexity: DEFAULT_MAX_COMPLEXITY,
            max_stack_consumption_factor: DEFAULT_MAX_STACK_CONSUMPTION_FACTOR,
            auto_possessification: true,
        }
    }
}

impl AnalysisConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the structural complexity ceiling.
    #[must_use]
    pub fn with_max_complexity(mut self, max: u32) -> Self {
        self.max_complexity = max;
        self
    }

    /// Sets the stack-consumption factor ceiling.
    #[must_use]
    pub fn with_max_stack_consumption_factor(mut self, max: f64) -> Self {
        self.max_stack_consumption_factor = max;
        self
    }

    /// Sets the auto-possessification capability of the target engine.
    #[must_use]
    pub fn with_auto_possessification(mut self, enabled: bool) -> Self {
        self.auto_possessification = enabled;
        self
    }

    /// Loads a configuration from a JSON blob; absent fields keep their
    /// defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values outside the accepted domain.
    pub fn validate(&self) -> Result<()> {
        if self.max_complexity == 0 {
            return Err(RexError::InvalidConfig {
                reason: "max_complexity must be at least 1".to_string(),
            });
        }
        if !self.max_stack_consumption_factor.is_finite() || self.max_stack_consumption_factor <= 0.0 {
            return Err(RexError::InvalidConfig {
                reason: format!(
                    "max_stack_consumption_factor must be a positive finite number, got {}",
                    self.max_stack_consumption_factor
                ),
            });
        }
        Ok(())
    }
}
