//! Possibility-theory combinators.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ElicitationError;

/// Conjunction used to fold answer strengths into a polytope's possibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TNorm {
    #[default]
    Product,
    Minimum,
}

impl TNorm {
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Product => a * b,
            Self::Minimum => a.min(b),
        }
    }

    /// Neutral element is 1, so an empty fold is fully possible.
    pub fn fold<I: IntoIterator<Item = f64>>(self, values: I) -> f64 {
        values.into_iter().fold(1.0, |acc, v| self.apply(acc, v))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Minimum => "minimum",
        }
    }
}

impl fmt::Display for TNorm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TNorm {
    type Err = ElicitationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "product" => Ok(Self::Product),
            "minimum" | "min" => Ok(Self::Minimum),
            _ => Err(ElicitationError::UnknownTNorm {
                name: s.to_string(),
            }),
        }
    }
}

/// Max t-conorm; empty input has possibility 0.
pub fn conorm_max<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    values.into_iter().fold(0.0, f64::max)
}
