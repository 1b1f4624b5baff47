//! Coherent subsets of answers.
//!
//! A subset is coherent when some branch accepted every answer in it at
//! full strength; a maximal one is not contained in another.

use std::collections::BTreeSet;

use nalgebra::{DMatrix, DVector};

use crate::error::ElicitationError;
use crate::polytope::{dedup_by_history, Polytope};
use crate::possibility::TNorm;

use super::combinations;

/// Rows are polytopes, columns the first `n` answers. Short histories are
/// padded with 1.
pub fn answers_matrix(polytopes: &[Polytope], n: usize) -> DMatrix<f64> {
    DMatrix::from_fn(polytopes.len(), n, |i, j| {
        polytopes[i].answers().get(j).copied().unwrap_or(1.0)
    })
}

/// Per question, the lowest strength any branch gave it.
pub fn answer_confidence(answers: &DMatrix<f64>) -> DVector<f64> {
    DVector::from_iterator(
        answers.ncols(),
        answers
            .column_iter()
            .map(|col| col.iter().copied().fold(1.0, f64::min)),
    )
}

fn check_width(answers: &DMatrix<f64>, n: usize) -> Result<(), ElicitationError> {
    if n > answers.ncols() {
        return Err(ElicitationError::invalid(format!(
            "asked about {n} answers but the matrix has {} columns",
            answers.ncols()
        )));
    }
    Ok(())
}

fn fully_accepted(answers: &DMatrix<f64>, row: usize, subset: &[usize]) -> bool {
    subset.iter().all(|&j| answers[(row, j)] == 1.0)
}

/// Every size-`k` subset of the first `n` answers that some branch
/// accepted in full.
pub fn find_coherent_subsets(
    answers: &DMatrix<f64>,
    k: usize,
    n: usize,
) -> Result<Vec<Vec<usize>>, ElicitationError> {
    check_width(answers, n)?;
    Ok(combinations(n, k)?
        .into_iter()
        .filter(|s| (0..answers.nrows()).any(|row| fully_accepted(answers, row, s)))
        .collect())
}

/// Subset with the highest mean confidence; first on ties.
pub fn find_best_coherent_subset<'a>(
    subsets: &'a [Vec<usize>],
    confidence: &DVector<f64>,
) -> Option<&'a [usize]> {
    let mean = |s: &[usize]| {
        if s.is_empty() {
            0.0
        } else {
            s.iter().map(|&i| confidence.get(i).copied().unwrap_or(0.0)).sum::<f64>() / s.len() as f64
        }
    };
    let mut best: Option<(&[usize], f64)> = None;
    for s in subsets {
        let m = mean(s);
        match best {
            Some((_, b)) if m <= b => {}
            _ => best = Some((s.as_slice(), m)),
        }
    }
    best.map(|(s, _)| s)
}

/// Re-weights each row by the t-norm of its strengths on `subset`.
pub fn update_possibility_list(
    answers: &DMatrix<f64>,
    subset: &[usize],
    t_norm: TNorm,
) -> Result<Vec<f64>, ElicitationError> {
    if let Some(&bad) = subset.iter().find(|&&j| j >= answers.ncols()) {
        return Err(ElicitationError::invalid(format!(
            "answer index {bad} out of range"
        )));
    }
    Ok((0..answers.nrows())
        .map(|row| t_norm.fold(subset.iter().map(|&j| answers[(row, j)])))
        .collect())
}

/// Restricts every branch to `subset` and merges branches whose restricted
/// histories coincide. Returns the new live set and its possibilities.
pub fn restrict_polytopes(
    polytopes: &[Polytope],
    subset: &[usize],
    t_norm: TNorm,
) -> (Vec<Polytope>, Vec<f64>) {
    let restricted = dedup_by_history(
        polytopes
            .iter()
            .map(|p| p.restricted_to(subset, t_norm))
            .collect(),
    );
    let possibilities = restricted.iter().map(Polytope::possibility).collect();
    (restricted, possibilities)
}

/// Maximal coherent subsets among the first `n` answers, largest first.
///
/// Each branch's full-strength index set is coherent by construction; the
/// maximal ones are those not contained in a larger kept set.
pub fn find_all_maximum_coherent_subsets(
    answers: &DMatrix<f64>,
    n: usize,
) -> Result<Vec<Vec<usize>>, ElicitationError> {
    check_width(answers, n)?;
    let mut candidates: Vec<BTreeSet<usize>> = (0..answers.nrows())
        .map(|row| (0..n).filter(|&j| answers[(row, j)] == 1.0).collect())
        .collect();
    candidates.sort_by(|a, b| b.len().cmp(&a.len()));

    let mut kept: Vec<BTreeSet<usize>> = Vec::new();
    for c in candidates {
        if !kept.iter().any(|k| c.is_subset(k)) {
            kept.push(c);
        }
    }
    Ok(kept.into_iter().map(|s| s.into_iter().collect()).collect())
}
