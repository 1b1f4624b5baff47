//! l-out-of-n fusion: discount a fixed number of answers.

use crate::error::ElicitationError;
use crate::polytope::Polytope;
use crate::possibility::{conorm_max, TNorm};

use super::combinations;

/// Strength of answer `index`; positions past the history count as accepted.
fn strength(polytope: &Polytope, index: usize) -> f64 {
    polytope.answers().get(index).copied().unwrap_or(1.0)
}

/// Per polytope, how many answers were weakened or rejected (strength < 1).
/// The minimum is the best-case count of wrong answers.
pub fn find_incorrect_answers(polytopes: &[Polytope]) -> Vec<usize> {
    polytopes
        .iter()
        .map(|p| p.answers().iter().filter(|&&a| a < 1.0).count())
        .collect()
}

/// One possibility per polytope: the t-conorm over every size-`k` subset of
/// the `n` answers of the t-norm of its strengths on that subset. `k` is the
/// number of answers kept.
pub fn k_among_n_possibilities(
    polytopes: &[Polytope],
    k: usize,
    n: usize,
    t_norm: TNorm,
) -> Result<Vec<f64>, ElicitationError> {
    let subsets = combinations(n, k)?;
    Ok(polytopes
        .iter()
        .map(|p| {
            conorm_max(
                subsets
                    .iter()
                    .map(|s| t_norm.fold(s.iter().map(|&i| strength(p, i)))),
            )
        })
        .collect())
}

/// One confidence per size-`k` subset (in `combinations` order): the
/// t-conorm across polytopes of the t-norm of their strengths on it.
pub fn k_among_n_fusion(
    polytopes: &[Polytope],
    k: usize,
    n: usize,
    t_norm: TNorm,
) -> Result<Vec<f64>, ElicitationError> {
    let subsets = combinations(n, k)?;
    Ok(subsets
        .iter()
        .map(|s| {
            conorm_max(
                polytopes
                    .iter()
                    .map(|p| t_norm.fold(s.iter().map(|&i| strength(p, i)))),
            )
        })
        .collect())
}
