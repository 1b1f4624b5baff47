//! Focal-set aggregation of per-polytope values.
//!
//! Values (PMR matrices, MR vectors, max-score vectors) are integrated
//! against the nested level sets of the possibility distribution: sorted
//! by descending possibility, each value is weighted by the gap between
//! its level and the next lower one.

use std::fmt;
use std::str::FromStr;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::ElicitationError;
use crate::regret;

/// How the possibility mass missing from the live set is filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InconsistencyType {
    /// Missing mass has zero value.
    #[default]
    Zero,
    /// Missing mass takes the element-wise worst observed value.
    Maximum,
}

impl InconsistencyType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Zero => "zero",
            Self::Maximum => "maximum",
        }
    }
}

impl fmt::Display for InconsistencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InconsistencyType {
    type Err = ElicitationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zero" => Ok(Self::Zero),
            "maximum" | "max" => Ok(Self::Maximum),
            _ => Err(ElicitationError::UnknownInconsistencyType {
                name: s.to_string(),
            }),
        }
    }
}

/// Array shapes the aggregator can integrate.
pub trait FocalValue: Clone {
    fn shape(&self) -> (usize, usize);
    fn zeros_like(&self) -> Self;
    /// Element-wise maximum.
    fn sup(&self, other: &Self) -> Self;
    fn add_scaled(&mut self, weight: f64, other: &Self);
}

impl FocalValue for DMatrix<f64> {
    fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    fn zeros_like(&self) -> Self {
        DMatrix::zeros(self.nrows(), self.ncols())
    }

    fn sup(&self, other: &Self) -> Self {
        self.zip_map(other, f64::max)
    }

    fn add_scaled(&mut self, weight: f64, other: &Self) {
        *self += other * weight;
    }
}

impl FocalValue for DVector<f64> {
    fn shape(&self) -> (usize, usize) {
        (self.len(), 1)
    }

    fn zeros_like(&self) -> Self {
        DVector::zeros(self.len())
    }

    fn sup(&self, other: &Self) -> Self {
        self.zip_map(other, f64::max)
    }

    fn add_scaled(&mut self, weight: f64, other: &Self) {
        *self += other * weight;
    }
}

/// Distinct possibility levels plus the 0 floor, descending.
fn levels(possibilities: &[f64]) -> Vec<f64> {
    let mut levels: Vec<f64> = possibilities.to_vec();
    levels.push(0.0);
    levels.sort_by(|a, b| b.total_cmp(a));
    levels.dedup();
    levels
}

fn check_inputs<V: FocalValue>(values: &[V], possibilities: &[f64]) -> Result<(), ElicitationError> {
    let Some(first) = values.first() else {
        return Err(ElicitationError::invalid("nothing to aggregate"));
    };
    if values.len() != possibilities.len() {
        return Err(ElicitationError::invalid(format!(
            "{} values but {} possibilities",
            values.len(),
            possibilities.len()
        )));
    }
    if possibilities.iter().any(|p| !(0.0..=1.0).contains(p)) {
        return Err(ElicitationError::invalid("possibility outside [0, 1]"));
    }
    let shape = first.shape();
    if values.iter().any(|v| v.shape() != shape) {
        return Err(ElicitationError::invalid("values have different shapes"));
    }
    Ok(())
}

/// Adds the possibility-1 closure entry when no value is fully possible.
fn close<V: FocalValue>(
    values: &[V],
    possibilities: &[f64],
    inconsistency: InconsistencyType,
) -> (Vec<V>, Vec<f64>) {
    let mut values = values.to_vec();
    let mut possibilities = possibilities.to_vec();
    let fully_possible = possibilities.iter().any(|&p| p == 1.0);
    if !fully_possible {
        let closure = match inconsistency {
            InconsistencyType::Maximum => values[1..]
                .iter()
                .fold(values[0].clone(), |acc, v| acc.sup(v)),
            InconsistencyType::Zero => values[0].zeros_like(),
        };
        values.push(closure);
        possibilities.push(1.0);
    }
    (values, possibilities)
}

fn level_integral<V: FocalValue>(values: &[V], possibilities: &[f64]) -> V {
    let levels = levels(possibilities);
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| possibilities[b].total_cmp(&possibilities[a]));

    let mut result = values[0].zeros_like();
    let mut level = 0usize;
    for i in order {
        while levels[level] != possibilities[i] {
            level += 1;
        }
        // The floor level has no mass below it.
        let Some(&next) = levels.get(level + 1) else {
            continue;
        };
        result.add_scaled(levels[level] - next, &values[i]);
    }
    result
}

/// Aggregates one value per polytope into a single array of the same shape.
pub fn aggregate<V: FocalValue>(
    values: &[V],
    possibilities: &[f64],
    inconsistency: InconsistencyType,
) -> Result<V, ElicitationError> {
    check_inputs(values, possibilities)?;
    let (values, possibilities) = close(values, possibilities, inconsistency);
    Ok(level_integral(&values, &possibilities))
}

/// EPMR and EMR. The EMR integrates each polytope's own MR (closure
/// included), which is not in general the MR of the EPMR.
pub fn compute_epmr_emr(
    pmr_list: &[DMatrix<f64>],
    possibilities: &[f64],
    inconsistency: InconsistencyType,
) -> Result<(DMatrix<f64>, DVector<f64>), ElicitationError> {
    check_inputs(pmr_list, possibilities)?;
    let (pmrs, possibilities) = close(pmr_list, possibilities, inconsistency);
    let mrs: Vec<DVector<f64>> = pmrs.iter().map(regret::mr).collect();
    Ok((
        level_integral(&pmrs, &possibilities),
        level_integral(&mrs, &possibilities),
    ))
}

/// Expected per-alternative max score.
pub fn compute_max_values_level(
    max_list: &[DVector<f64>],
    possibilities: &[f64],
    inconsistency: InconsistencyType,
) -> Result<DVector<f64>, ElicitationError> {
    aggregate(max_list, possibilities, inconsistency)
}
