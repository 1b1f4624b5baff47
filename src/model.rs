//! Utility models: score functions linear in their parameters, plus the
//! base region every polytope starts from.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::ElicitationError;
use crate::lp::{LinearConstraint, VarBounds};

/// Base feasible region of the parameter space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConstraints {
    pub equalities: Vec<LinearConstraint>,
    pub bounds: Vec<VarBounds>,
}

/// A model whose score is linear in its parameters:
/// `score(alt, x) = coefficients(alt) · x`.
pub trait Model: Send + Sync {
    fn parameter_count(&self) -> usize;

    fn criteria_count(&self) -> usize;

    /// Coefficient vector of `alternative` in parameter space.
    fn coefficients(&self, alternative: &DVector<f64>) -> DVector<f64>;

    fn base_constraints(&self) -> ModelConstraints;

    fn score(&self, alternative: &DVector<f64>, params: &DVector<f64>) -> f64 {
        self.coefficients(alternative).dot(params)
    }

    /// Coefficients of `score(a, x) - score(b, x)`.
    fn diff(&self, a: &DVector<f64>, b: &DVector<f64>) -> DVector<f64> {
        self.coefficients(a) - self.coefficients(b)
    }

    /// Minimization objective whose optimum maximizes the score of `alternative`.
    fn objective_for(&self, alternative: &DVector<f64>) -> DVector<f64> {
        -self.coefficients(alternative)
    }

    fn check_alternative(&self, alternative: &DVector<f64>) -> Result<(), ElicitationError> {
        if alternative.len() != self.criteria_count() {
            return Err(ElicitationError::invalid(format!(
                "alternative has {} criteria, model expects {}",
                alternative.len(),
                self.criteria_count()
            )));
        }
        Ok(())
    }
}

/// Weighted sum over criteria with weights on the unit simplex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedSumModel {
    pub criteria: usize,
}

impl WeightedSumModel {
    pub fn new(criteria: usize) -> Result<Self, ElicitationError> {
        if criteria == 0 {
            return Err(ElicitationError::invalid("weighted sum needs at least one criterion"));
        }
        Ok(Self { criteria })
    }
}

impl Model for WeightedSumModel {
    fn parameter_count(&self) -> usize {
        self.criteria
    }

    fn criteria_count(&self) -> usize {
        self.criteria
    }

    fn coefficients(&self, alternative: &DVector<f64>) -> DVector<f64> {
        alternative.clone()
    }

    fn base_constraints(&self) -> ModelConstraints {
        ModelConstraints {
            equalities: vec![LinearConstraint::new(DVector::from_element(self.criteria, 1.0), 1.0)],
            bounds: vec![VarBounds::non_negative(); self.criteria],
        }
    }
}

/// Half-space encoding "`preferred` scores at least as much as `other`":
/// `diff(other, preferred) · x ≤ 0`.
pub fn answer_constraint(
    model: &dyn Model,
    preferred: &DVector<f64>,
    other: &DVector<f64>,
) -> LinearConstraint {
    LinearConstraint::new(model.diff(other, preferred), 0.0)
}
