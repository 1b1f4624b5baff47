//! Fault-tolerant fusion over the terminal live set.
//!
//! Both schemes read the answer-strength histories of the polytopes an
//! elicitation run ended with:
//! - `l_out_n`: assume a fixed number of answers are wrong and re-weight
//!   every branch by its best way of discounting them.
//! - `mcs`: find subsets of answers some branch accepted in full and
//!   condition the recommendation on one of them.

pub mod l_out_n;
pub mod mcs;

pub use l_out_n::{find_incorrect_answers, k_among_n_fusion, k_among_n_possibilities};
pub use mcs::{
    answer_confidence, answers_matrix, find_all_maximum_coherent_subsets,
    find_best_coherent_subset, find_coherent_subsets, restrict_polytopes,
    update_possibility_list,
};

use crate::error::ElicitationError;

/// Upper bound on subsets enumerated by a single call.
pub const MAX_SUBSETS: u128 = 1_000_000;

/// `C(n, k)`, saturating at `u128::MAX`.
pub fn binomial(n: usize, k: usize) -> u128 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut acc: u128 = 1;
    for i in 0..k {
        // Exact at every step: acc * (n - i) is divisible by (i + 1).
        acc = match acc.checked_mul((n - i) as u128) {
            Some(v) => v / (i as u128 + 1),
            None => return u128::MAX,
        };
    }
    acc
}

/// All size-`k` index subsets of `0..n` in lexicographic order.
pub fn combinations(n: usize, k: usize) -> Result<Vec<Vec<usize>>, ElicitationError> {
    if k > n {
        return Err(ElicitationError::invalid(format!(
            "cannot pick {k} answers out of {n}"
        )));
    }
    let requested = binomial(n, k);
    if requested > MAX_SUBSETS {
        return Err(ElicitationError::TooManySubsets {
            requested,
            limit: MAX_SUBSETS,
        });
    }

    let mut out = Vec::with_capacity(requested as usize);
    let mut current: Vec<usize> = (0..k).collect();
    loop {
        out.push(current.clone());
        // Rightmost position that can still move.
        let Some(pos) = (0..k).rev().find(|&i| current[i] < n - k + i) else {
            break;
        };
        current[pos] += 1;
        for i in pos + 1..k {
            current[i] = current[i - 1] + 1;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combinations_are_lexicographic() {
        let c = combinations(4, 2).unwrap();
        assert_eq!(c.len(), 6);
        assert_eq!(c[0], vec![0, 1]);
        assert_eq!(c[5], vec![2, 3]);
        assert_eq!(combinations(3, 0).unwrap(), vec![Vec::<usize>::new()]);
        assert_eq!(combinations(3, 3).unwrap(), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn enumeration_guard_trips() {
        assert_eq!(binomial(10, 3), 120);
        assert!(matches!(
            combinations(60, 30),
            Err(ElicitationError::TooManySubsets { .. })
        ));
        assert!(combinations(2, 3).is_err());
    }
}
