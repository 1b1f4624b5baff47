//! Alternative sets and the Pareto filter applied once per run.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::ElicitationError;

/// Immutable, Pareto-efficient alternative set.
///
/// Indices used everywhere else in the crate refer to positions in this
/// filtered set; `original_index` maps back to the caller's input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternatives {
    rows: Vec<DVector<f64>>,
    original: Vec<usize>,
}

fn validate_rows(rows: &[Vec<f64>]) -> Result<usize, ElicitationError> {
    let Some(first) = rows.first() else {
        return Err(ElicitationError::invalid("alternative set is empty"));
    };
    let criteria = first.len();
    if criteria == 0 {
        return Err(ElicitationError::invalid("alternatives have no criteria"));
    }
    for (i, row) in rows.iter().enumerate() {
        if row.len() != criteria {
            return Err(ElicitationError::invalid(format!(
                "alternative {i} has {} criteria, expected {criteria}",
                row.len()
            )));
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(ElicitationError::invalid(format!(
                "alternative {i} has a non-finite score"
            )));
        }
    }
    Ok(criteria)
}

/// `a` dominates `b`: at least as good everywhere, strictly better somewhere.
fn dominates(a: &[f64], b: &[f64]) -> bool {
    a.iter().zip(b).all(|(x, y)| x >= y) && a.iter().zip(b).any(|(x, y)| x > y)
}

impl Alternatives {
    /// Keeps every row as given (no filtering).
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self, ElicitationError> {
        validate_rows(&rows)?;
        let original = (0..rows.len()).collect();
        Ok(Self {
            rows: rows.into_iter().map(DVector::from_vec).collect(),
            original,
        })
    }

    /// Keeps only non-dominated rows; exact duplicates keep their first occurrence.
    pub fn pareto_efficient(rows: Vec<Vec<f64>>) -> Result<Self, ElicitationError> {
        validate_rows(&rows)?;
        let mut kept = Vec::new();
        let mut original = Vec::new();
        for (i, row) in rows.iter().enumerate() {
            let dominated = rows.iter().any(|other| dominates(other, row));
            let duplicate = rows[..i].iter().any(|other| other == row);
            if !dominated && !duplicate {
                kept.push(DVector::from_column_slice(row));
                original.push(i);
            }
        }
        Ok(Self {
            rows: kept,
            original,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn criteria(&self) -> usize {
        self.rows.first().map_or(0, |r| r.len())
    }

    pub fn get(&self, index: usize) -> Option<&DVector<f64>> {
        self.rows.get(index)
    }

    pub fn rows(&self) -> &[DVector<f64>] {
        &self.rows
    }

    pub fn original_index(&self, index: usize) -> Option<usize> {
        self.original.get(index).copied()
    }

    /// Number of distinct unordered pairs.
    pub fn pair_count(&self) -> usize {
        let n = self.len();
        n * n.saturating_sub(1) / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pareto_filter_drops_dominated_and_duplicates() {
        let alts = Alternatives::pareto_efficient(vec![
            vec![3.0, 1.0],
            vec![1.0, 3.0],
            vec![2.0, 2.0],
            vec![0.0, 0.0],
            vec![3.0, 1.0],
        ])
        .unwrap();
        assert_eq!(alts.len(), 3);
        assert_eq!(alts.original_index(2), Some(2));
        assert_eq!(alts.pair_count(), 3);
    }

    #[test]
    fn rejects_ragged_and_empty_input() {
        assert!(Alternatives::pareto_efficient(vec![]).is_err());
        assert!(Alternatives::new(vec![vec![1.0, 2.0], vec![1.0]]).is_err());
        assert!(Alternatives::new(vec![vec![f64::NAN]]).is_err());
    }
}
