//! Polytopes: convex parameter regions carrying a possibility degree and
//! the strength with which each answer was accepted along their branch.

use std::collections::HashSet;

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::lp::{LinearConstraint, LinearProgram, LpError, LpOutcome, LpSolver, VarBounds};
use crate::model::ModelConstraints;
use crate::possibility::TNorm;

/// Position of a region relative to a half-space `a·x ≤ b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// The whole region satisfies the half-space.
    Inside,
    /// The whole region satisfies the complement (boundary allowed).
    Outside,
    /// The hyperplane cuts through the region.
    Crossing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polytope {
    inequalities: Vec<LinearConstraint>,
    equalities: Vec<LinearConstraint>,
    bounds: Vec<VarBounds>,
    possibility: f64,
    answers: Vec<f64>,
}

impl Polytope {
    /// Fully possible region with no answers applied.
    pub fn root(base: &ModelConstraints) -> Self {
        Self {
            inequalities: Vec::new(),
            equalities: base.equalities.clone(),
            bounds: base.bounds.clone(),
            possibility: 1.0,
            answers: Vec::new(),
        }
    }

    pub fn with_constraints(
        inequalities: Vec<LinearConstraint>,
        equalities: Vec<LinearConstraint>,
        bounds: Vec<VarBounds>,
        possibility: f64,
        answers: Vec<f64>,
    ) -> Self {
        Self {
            inequalities,
            equalities,
            bounds,
            possibility: possibility.clamp(0.0, 1.0),
            answers,
        }
    }

    pub fn possibility(&self) -> f64 {
        self.possibility
    }

    pub fn answers(&self) -> &[f64] {
        &self.answers
    }

    pub fn inequalities(&self) -> &[LinearConstraint] {
        &self.inequalities
    }

    pub fn equalities(&self) -> &[LinearConstraint] {
        &self.equalities
    }

    pub fn bounds(&self) -> &[VarBounds] {
        &self.bounds
    }

    pub fn dimension(&self) -> usize {
        self.bounds.len()
    }

    /// Appends `weight·a·x ≤ weight·b`, folds `weight` into the possibility
    /// and records it as the strength of this answer.
    pub fn add_constraint(&mut self, constraint: &LinearConstraint, weight: f64, t_norm: TNorm) {
        let weight = weight.clamp(0.0, 1.0);
        self.inequalities.push(constraint.scaled(weight));
        self.possibility = t_norm.apply(self.possibility, weight);
        self.answers.push(weight);
    }

    /// Minimizes `objective · x` over the region.
    pub fn minimize(
        &self,
        objective: &DVector<f64>,
        solver: &dyn LpSolver,
    ) -> Result<LpOutcome, LpError> {
        solver.solve(&LinearProgram {
            objective,
            inequalities: &self.inequalities,
            equalities: &self.equalities,
            bounds: &self.bounds,
        })
    }

    /// Whether any parameter vector satisfies every constraint.
    pub fn is_feasible(&self, solver: &dyn LpSolver) -> Result<bool, LpError> {
        let zero = DVector::zeros(self.dimension());
        Ok(!self.minimize(&zero, solver)?.is_infeasible())
    }

    /// Classifies `constraint` against the region with a min and a max solve
    /// of `a·x`. `Ok(None)` means the region is empty.
    pub fn intersection_test(
        &self,
        constraint: &LinearConstraint,
        solver: &dyn LpSolver,
        tolerance: f64,
    ) -> Result<Option<Side>, LpError> {
        let lowest = match self.minimize(&constraint.coefficients, solver)? {
            LpOutcome::Optimal { value, .. } => value,
            LpOutcome::Unbounded => f64::NEG_INFINITY,
            LpOutcome::Infeasible => return Ok(None),
        };
        let highest = match self.minimize(&-&constraint.coefficients, solver)? {
            LpOutcome::Optimal { value, .. } => -value,
            LpOutcome::Unbounded => f64::INFINITY,
            LpOutcome::Infeasible => return Ok(None),
        };

        let side = if highest <= constraint.rhs + tolerance {
            Side::Inside
        } else if lowest >= constraint.rhs - tolerance {
            Side::Outside
        } else {
            Side::Crossing
        };
        Ok(Some(side))
    }

    /// Splits on a crossing half-space: the accept child keeps the constraint
    /// at full strength, the reject child keeps its complement at
    /// `1 - confidence`.
    pub fn cut(
        &self,
        constraint: &LinearConstraint,
        confidence: f64,
        t_norm: TNorm,
    ) -> (Polytope, Polytope) {
        let mut accept = self.clone();
        accept.add_constraint(constraint, 1.0, t_norm);
        let mut reject = self.clone();
        reject.add_constraint(&constraint.negated(), 1.0 - confidence, t_norm);
        (accept, reject)
    }

    /// Applies an answer given its classification; consumes the parent.
    pub fn apply(
        mut self,
        side: Side,
        constraint: &LinearConstraint,
        confidence: f64,
        t_norm: TNorm,
    ) -> Vec<Polytope> {
        match side {
            Side::Inside => {
                self.add_constraint(constraint, 1.0, t_norm);
                vec![self]
            }
            Side::Outside => {
                self.add_constraint(&constraint.negated(), 1.0 - confidence, t_norm);
                vec![self]
            }
            Side::Crossing => {
                let (accept, reject) = self.cut(constraint, confidence, t_norm);
                vec![accept, reject]
            }
        }
    }

    /// Same region, history cut down to `subset`, possibility recomputed.
    pub fn restricted_to(&self, subset: &[usize], t_norm: TNorm) -> Polytope {
        let answers: Vec<f64> = subset
            .iter()
            .filter_map(|&i| self.answers.get(i).copied())
            .collect();
        Polytope {
            possibility: t_norm.fold(answers.iter().copied()),
            answers,
            ..self.clone()
        }
    }

    /// Membership check for a concrete parameter vector.
    pub fn contains(&self, x: &DVector<f64>, tolerance: f64) -> bool {
        x.len() == self.dimension()
            && self.inequalities.iter().all(|c| c.lhs(x) <= c.rhs + tolerance)
            && self
                .equalities
                .iter()
                .all(|c| (c.lhs(x) - c.rhs).abs() <= tolerance)
            && self
                .bounds
                .iter()
                .zip(x.iter())
                .all(|(b, &v)| b.contains(v, tolerance))
    }

    fn history_key(&self) -> Vec<u64> {
        self.answers.iter().map(|v| v.to_bits()).collect()
    }
}

/// Keeps the first polytope of every distinct answer history.
pub fn dedup_by_history(polytopes: Vec<Polytope>) -> Vec<Polytope> {
    let mut seen = HashSet::new();
    polytopes
        .into_iter()
        .filter(|p| seen.insert(p.history_key()))
        .collect()
}

pub fn possibilities(polytopes: &[Polytope]) -> Vec<f64> {
    polytopes.iter().map(Polytope::possibility).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Polytope {
        Polytope::root(&ModelConstraints {
            equalities: Vec::new(),
            bounds: vec![VarBounds::between(0.0, 1.0); 2],
        })
    }

    #[test]
    fn add_constraint_folds_weight() {
        let mut p = unit_square();
        let c = LinearConstraint::new(DVector::from_vec(vec![1.0, 0.0]), 0.5);
        p.add_constraint(&c, 0.4, TNorm::Product);
        p.add_constraint(&c, 0.5, TNorm::Product);
        assert!((p.possibility() - 0.2).abs() < 1e-12);
        assert_eq!(p.answers(), &[0.4, 0.5]);
    }

    #[test]
    fn restriction_recomputes_possibility() {
        let mut p = unit_square();
        let c = LinearConstraint::new(DVector::from_vec(vec![1.0, 0.0]), 0.5);
        p.add_constraint(&c, 1.0, TNorm::Minimum);
        p.add_constraint(&c, 0.3, TNorm::Minimum);
        let r = p.restricted_to(&[0], TNorm::Minimum);
        assert_eq!(r.possibility(), 1.0);
        assert_eq!(r.answers(), &[1.0]);
        assert_eq!(r.inequalities().len(), 2);
    }

    #[test]
    fn dedup_keeps_first_of_each_history() {
        let mut a = unit_square();
        let c = LinearConstraint::new(DVector::from_vec(vec![1.0, 0.0]), 0.5);
        a.add_constraint(&c, 1.0, TNorm::Product);
        let b = a.clone();
        let mut d = unit_square();
        d.add_constraint(&c, 0.2, TNorm::Product);
        let kept = dedup_by_history(vec![a, b, d]);
        assert_eq!(kept.len(), 2);
    }
}
