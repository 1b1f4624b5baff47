//! Error types for the elicitation engine.

use thiserror::Error;

use crate::lp::LpError;

#[derive(Debug, Error)]
pub enum ElicitationError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unknown t-norm: {name} (expected `product` or `minimum`)")]
    UnknownTNorm { name: String },
    #[error("unknown inconsistency type: {name} (expected `zero` or `maximum`)")]
    UnknownInconsistencyType { name: String },
    #[error("unknown question policy: {name} (expected `pessimistic` or `random`)")]
    UnknownQuestionPolicy { name: String },
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("every live polytope has an empty region at round {round}")]
    AllBranchesEmpty { round: usize },
    #[error("every live polytope was pruned at round {round}; no recommendation available")]
    FullyContradicted { round: usize },
    #[error("subset enumeration too large: {requested} subsets requested, limit is {limit}")]
    TooManySubsets { requested: u128, limit: u128 },
    #[error("lp error: {0}")]
    Lp(#[from] LpError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ElicitationError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// True when the run ended without any recommendation (aborted branch set).
    pub fn is_no_recommendation(&self) -> bool {
        matches!(
            self,
            Self::AllBranchesEmpty { .. } | Self::FullyContradicted { .. }
        )
    }
}
