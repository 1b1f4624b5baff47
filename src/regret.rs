//! Pairwise max regret, max regret and max score over a polytope.
//!
//! Every entry is one independent LP solve, fanned out with rayon.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

use crate::alternatives::Alternatives;
use crate::lp::{LpError, LpOutcome, LpSolver};
use crate::model::Model;
use crate::polytope::Polytope;

/// `pmr[(i, j)] = max_x score(j, x) - score(i, x)` over the region.
///
/// Pairs whose LP is infeasible or unbounded get `+inf`; the diagonal is 0.
pub fn pmr(
    alternatives: &Alternatives,
    polytope: &Polytope,
    model: &dyn Model,
    solver: &dyn LpSolver,
) -> Result<DMatrix<f64>, LpError> {
    let n = alternatives.len();
    let rows = alternatives.rows();
    let pairs: Vec<(usize, usize)> = (0..n)
        .flat_map(|i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
        .collect();

    let entries = pairs
        .par_iter()
        .map(|&(i, j)| -> Result<_, LpError> {
            // max (c_j - c_i)·x  ==  -min (c_i - c_j)·x
            let objective = model.diff(&rows[i], &rows[j]);
            let value = match polytope.minimize(&objective, solver)? {
                LpOutcome::Optimal { value, .. } => -value,
                LpOutcome::Infeasible | LpOutcome::Unbounded => f64::INFINITY,
            };
            Ok((i, j, value))
        })
        .collect::<Result<Vec<_>, LpError>>()?;

    let mut matrix = DMatrix::zeros(n, n);
    for (i, j, value) in entries {
        matrix[(i, j)] = value;
    }
    Ok(matrix)
}

/// Row-wise maximum of a PMR matrix.
pub fn mr(pmr: &DMatrix<f64>) -> DVector<f64> {
    DVector::from_iterator(
        pmr.nrows(),
        pmr.row_iter()
            .map(|row| row.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
    )
}

/// Per-alternative best achievable score over the region.
/// Unbounded gives `+inf`, an empty region `-inf`.
pub fn max_score(
    alternatives: &Alternatives,
    polytope: &Polytope,
    model: &dyn Model,
    solver: &dyn LpSolver,
) -> Result<DVector<f64>, LpError> {
    let scores = alternatives
        .rows()
        .par_iter()
        .map(|alt| -> Result<f64, LpError> {
            let objective = model.objective_for(alt);
            Ok(match polytope.minimize(&objective, solver)? {
                LpOutcome::Optimal { value, .. } => -value,
                LpOutcome::Unbounded => f64::INFINITY,
                LpOutcome::Infeasible => f64::NEG_INFINITY,
            })
        })
        .collect::<Result<Vec<f64>, LpError>>()?;
    Ok(DVector::from_vec(scores))
}

/// PMR of every polytope in the live set, in order.
pub fn pmr_list(
    alternatives: &Alternatives,
    polytopes: &[Polytope],
    model: &dyn Model,
    solver: &dyn LpSolver,
) -> Result<Vec<DMatrix<f64>>, LpError> {
    polytopes
        .par_iter()
        .map(|p| pmr(alternatives, p, model, solver))
        .collect()
}

pub fn max_score_list(
    alternatives: &Alternatives,
    polytopes: &[Polytope],
    model: &dyn Model,
    solver: &dyn LpSolver,
) -> Result<Vec<DVector<f64>>, LpError> {
    polytopes
        .par_iter()
        .map(|p| max_score(alternatives, p, model, solver))
        .collect()
}

/// First index of the smallest value; NaN never wins.
pub fn argmin(values: &DVector<f64>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v >= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Serde adapters for regret values that may be `+inf`.
///
/// JSON has no infinity, so `+inf` is written as `null` and `null` reads
/// back as `+inf`. Regrets are never `-inf` or NaN.
pub mod unbounded {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    fn to_json(value: f64) -> Option<f64> {
        value.is_finite().then_some(value)
    }

    fn from_json(value: Option<f64>) -> f64 {
        value.unwrap_or(f64::INFINITY)
    }

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        to_json(*value).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Option::<f64>::deserialize(deserializer).map(from_json)
    }

    pub mod vec {
        use super::*;

        pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
            let row: Vec<Option<f64>> = values.iter().copied().map(to_json).collect();
            row.serialize(serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
            let row = Vec::<Option<f64>>::deserialize(deserializer)?;
            Ok(row.into_iter().map(from_json).collect())
        }
    }

    /// PMR matrices as nested row arrays.
    pub mod matrices {
        use nalgebra::DMatrix;
        use serde::de::Error;

        use super::*;

        pub fn serialize<S: Serializer>(
            matrices: &[DMatrix<f64>],
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            let rows: Vec<Vec<Vec<Option<f64>>>> = matrices
                .iter()
                .map(|m| {
                    m.row_iter()
                        .map(|row| row.iter().copied().map(to_json).collect())
                        .collect()
                })
                .collect();
            rows.serialize(serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<DMatrix<f64>>, D::Error> {
            let raw = Vec::<Vec<Vec<Option<f64>>>>::deserialize(deserializer)?;
            raw.into_iter()
                .map(|rows| {
                    let width = rows.first().map_or(0, Vec::len);
                    if rows.iter().any(|row| row.len() != width) {
                        return Err(D::Error::custom("regret matrix rows differ in length"));
                    }
                    Ok(DMatrix::from_fn(rows.len(), width, |i, j| from_json(rows[i][j])))
                })
                .collect()
        }
    }
}
