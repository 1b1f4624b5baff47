//! Answer oracle seam: whoever answers the pairwise questions.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::alternatives::Alternatives;
use crate::error::ElicitationError;
use crate::model::Model;

/// One answered comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Index (in the filtered set) of the alternative declared better.
    pub preferred: usize,
    /// Whether the answer agrees with the decision-maker's true model.
    pub rational: bool,
    /// Self-reported confidence in [0, 1].
    pub confidence: f64,
}

pub trait AnswerOracle {
    fn answer(
        &mut self,
        round: usize,
        candidate: usize,
        opponent: usize,
        alternatives: &Alternatives,
        model: &dyn Model,
    ) -> Result<Answer, ElicitationError>;

    /// True scores of every alternative, when the oracle knows them.
    fn true_scores(&self, _alternatives: &Alternatives, _model: &dyn Model) -> Option<DVector<f64>> {
        None
    }
}

/// Picks the truly better of `a` and `b` under `params` (ties go to `a`),
/// or the other one when `rational` is false.
pub fn fixed_choice(
    model: &dyn Model,
    params: &DVector<f64>,
    alternatives: &Alternatives,
    a: usize,
    b: usize,
    rational: bool,
) -> Result<usize, ElicitationError> {
    let (Some(alt_a), Some(alt_b)) = (alternatives.get(a), alternatives.get(b)) else {
        return Err(ElicitationError::invalid(format!(
            "pair ({a}, {b}) out of range for {} alternatives",
            alternatives.len()
        )));
    };
    if params.len() != model.parameter_count() {
        return Err(ElicitationError::invalid(format!(
            "model expects {} parameters, got {}",
            model.parameter_count(),
            params.len()
        )));
    }
    let a_wins = model.score(alt_a, params) >= model.score(alt_b, params);
    Ok(if a_wins == rational { a } else { b })
}
