//! Recommendations from a set of weighted regions or precomputed PMRs.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::alternatives::Alternatives;
use crate::error::ElicitationError;
use crate::focal_set::{compute_epmr_emr, InconsistencyType};
use crate::lp::{LinearConstraint, LinearProgram, LpOutcome, LpSolver, VarBounds};
use crate::model::Model;
use crate::polytope::Polytope;
use crate::regret;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub best_alternative: usize,
    /// Aggregated max regret of the recommended alternative.
    pub estimated_regret: f64,
}

impl Recommendation {
    /// Score gap between the true optimum and the recommendation.
    pub fn real_regret(&self, reference_scores: &DVector<f64>) -> f64 {
        real_regret(reference_scores, self.best_alternative)
    }
}

pub fn real_regret(scores: &DVector<f64>, chosen: usize) -> f64 {
    scores.max() - scores[chosen]
}

/// Scores of every alternative under known parameters.
pub fn true_scores(alternatives: &Alternatives, model: &dyn Model, params: &DVector<f64>) -> DVector<f64> {
    DVector::from_iterator(
        alternatives.len(),
        alternatives.rows().iter().map(|a| model.score(a, params)),
    )
}

/// Minimax-regret choice over the EMR of the given PMRs.
pub fn recommend_from_values(
    value_list: &[DMatrix<f64>],
    possibilities: &[f64],
    inconsistency: InconsistencyType,
) -> Result<Recommendation, ElicitationError> {
    let (_, emr) = compute_epmr_emr(value_list, possibilities, inconsistency)?;
    let best_alternative = regret::argmin(&emr)
        .ok_or_else(|| ElicitationError::invalid("aggregated regret has no finite entry"))?;
    Ok(Recommendation {
        best_alternative,
        estimated_regret: emr[best_alternative],
    })
}

pub fn recommend_from_polytopes(
    polytopes: &[Polytope],
    possibilities: &[f64],
    alternatives: &Alternatives,
    model: &dyn Model,
    solver: &dyn LpSolver,
    inconsistency: InconsistencyType,
) -> Result<Recommendation, ElicitationError> {
    let pmrs = regret::pmr_list(alternatives, polytopes, model, solver)?;
    recommend_from_values(&pmrs, possibilities, inconsistency)
}

/// Relaxes every answered constraint by the smallest total slack that makes
/// the answers jointly satisfiable, then recommends from that single region.
pub fn epsilon_consistency(
    answered: &[LinearConstraint],
    model: &dyn Model,
    alternatives: &Alternatives,
    solver: &dyn LpSolver,
) -> Result<Recommendation, ElicitationError> {
    let base = model.base_constraints();
    let p = model.parameter_count();
    let m = answered.len();

    let lift = |c: &LinearConstraint, slack: Option<usize>| {
        let mut coefficients = DVector::zeros(p + m);
        coefficients.rows_mut(0, p).copy_from(&c.coefficients);
        if let Some(i) = slack {
            coefficients[p + i] = -1.0;
        }
        LinearConstraint::new(coefficients, c.rhs)
    };

    for c in answered {
        if c.dimension() != p {
            return Err(ElicitationError::invalid(format!(
                "answered constraint has {} coefficients, model has {p} parameters",
                c.dimension()
            )));
        }
    }

    let mut objective = DVector::zeros(p + m);
    objective.rows_mut(p, m).fill(1.0);
    let inequalities: Vec<LinearConstraint> = answered
        .iter()
        .enumerate()
        .map(|(i, c)| lift(c, Some(i)))
        .collect();
    let equalities: Vec<LinearConstraint> = base.equalities.iter().map(|c| lift(c, None)).collect();
    let mut bounds = base.bounds.clone();
    bounds.extend(std::iter::repeat(VarBounds::non_negative()).take(m));

    let outcome = solver.solve(&LinearProgram {
        objective: &objective,
        inequalities: &inequalities,
        equalities: &equalities,
        bounds: &bounds,
    })?;
    let LpOutcome::Optimal { x, .. } = outcome else {
        return Err(ElicitationError::invalid("model base region is empty"));
    };

    let relaxed: Vec<LinearConstraint> = answered
        .iter()
        .enumerate()
        .map(|(i, c)| LinearConstraint::new(c.coefficients.clone(), c.rhs + x[p + i]))
        .collect();
    let polytope = Polytope::with_constraints(relaxed, base.equalities, base.bounds, 1.0, Vec::new());
    recommend_from_polytopes(
        std::slice::from_ref(&polytope),
        &[1.0],
        alternatives,
        model,
        solver,
        InconsistencyType::Zero,
    )
}
