//! Run configuration and its JSON loader.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ElicitationError;
use crate::focal_set::InconsistencyType;
use crate::possibility::TNorm;

use super::strategy::QuestionPolicy;

const DEFAULT_REGRET_LIMIT: f64 = 1e-8;
const DEFAULT_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElicitationMode {
    /// Branch on contradictions, weight branches by possibility.
    #[default]
    Possibilistic,
    /// Single region; every answer is a hard constraint.
    Classic,
}

impl fmt::Display for ElicitationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Possibilistic => "possibilistic",
            Self::Classic => "classic",
        })
    }
}

impl FromStr for ElicitationMode {
    type Err = ElicitationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "possibilistic" => Ok(Self::Possibilistic),
            "classic" | "robust" => Ok(Self::Classic),
            other => Err(ElicitationError::InvalidConfig(format!(
                "unknown mode `{other}` (expected `possibilistic` or `classic`)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElicitationConfig {
    pub mode: ElicitationMode,
    /// Caller cap on rounds; always further capped by the number of pairs.
    pub max_iter: Option<usize>,
    pub regret_limit: f64,
    pub t_norm: TNorm,
    pub inconsistency: InconsistencyType,
    /// Branches at or below this possibility are pruned.
    pub min_possibility: f64,
    pub policy: QuestionPolicy,
    pub rng_seed: Option<u64>,
    /// Slack used when classifying a half-space against a region.
    pub tolerance: f64,
}

impl Default for ElicitationConfig {
    fn default() -> Self {
        Self {
            mode: ElicitationMode::default(),
            max_iter: None,
            regret_limit: DEFAULT_REGRET_LIMIT,
            t_norm: TNorm::default(),
            inconsistency: InconsistencyType::default(),
            min_possibility: 0.0,
            policy: QuestionPolicy::default(),
            rng_seed: None,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl ElicitationConfig {
    pub fn classic() -> Self {
        Self {
            mode: ElicitationMode::Classic,
            t_norm: TNorm::Minimum,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ElicitationError> {
        if !self.regret_limit.is_finite() || self.regret_limit < 0.0 {
            return Err(ElicitationError::InvalidConfig(format!(
                "regret_limit must be finite and >= 0, got {}",
                self.regret_limit
            )));
        }
        if !(0.0..1.0).contains(&self.min_possibility) {
            return Err(ElicitationError::InvalidConfig(format!(
                "min_possibility must be in [0, 1), got {}",
                self.min_possibility
            )));
        }
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(ElicitationError::InvalidConfig(format!(
                "tolerance must be finite and > 0, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ElicitationError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ElicitationError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Round budget for `n` alternatives after filtering.
    pub fn round_budget(&self, n: usize) -> usize {
        let pairs = n * n.saturating_sub(1) / 2;
        self.max_iter.map_or(pairs, |cap| cap.min(pairs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let config =
            ElicitationConfig::from_json_str(r#"{"t_norm": "minimum", "max_iter": 4}"#).unwrap();
        assert_eq!(config.t_norm, TNorm::Minimum);
        assert_eq!(config.max_iter, Some(4));
        assert_eq!(config.inconsistency, InconsistencyType::Zero);
        assert_eq!(config.round_budget(3), 3);
        assert_eq!(config.round_budget(5), 4);
    }

    #[test]
    fn unknown_names_and_ranges_are_rejected() {
        assert!(ElicitationConfig::from_json_str(r#"{"inconsistency": "ignorance"}"#).is_err());
        assert!(ElicitationConfig::from_json_str(r#"{"min_possibility": 1.0}"#).is_err());
        assert!(ElicitationConfig::from_json_str(r#"{"tolerance": 0.0}"#).is_err());
        assert!("robust".parse::<ElicitationMode>().is_ok());
    }
}
