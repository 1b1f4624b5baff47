//! Linear programming primitive used by every region query.
//!
//! All programs are minimizations: `min c·x` subject to `A_ub x ≤ b_ub`,
//! `A_eq x = b_eq` and per-variable bounds. Maximizing `c·x` is done by
//! minimizing `-c·x` and negating the optimum.
//!
//! Implementation notes:
//! - Dense two-phase tableau simplex on `nalgebra::DMatrix`; problem sizes
//!   here are a handful of parameters and at most a few dozen rows.
//! - Bounds are removed by substitution (shift, mirror, or free split) and
//!   finite upper bounds become ordinary rows.
//! - Bland's rule on both phases, so degenerate regions cannot cycle.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Guards against runaway pivoting on ill-conditioned input.
const DEFAULT_MAX_ITERATIONS: usize = 50_000;

const DEFAULT_TOLERANCE: f64 = 1e-9;

/// Smallest tableau entry accepted as a pivot.
const PIVOT_EPS: f64 = 1e-12;

// ---------------------------------------------------------------------
//  Problem description
// ---------------------------------------------------------------------

/// Box bounds for one variable; `None` means unbounded on that side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VarBounds {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl VarBounds {
    pub fn non_negative() -> Self {
        Self {
            lower: Some(0.0),
            upper: None,
        }
    }

    pub fn between(lower: f64, upper: f64) -> Self {
        Self {
            lower: Some(lower),
            upper: Some(upper),
        }
    }

    pub fn free() -> Self {
        Self {
            lower: None,
            upper: None,
        }
    }

    pub fn contains(&self, value: f64, tol: f64) -> bool {
        self.lower.map_or(true, |l| value >= l - tol) && self.upper.map_or(true, |u| value <= u + tol)
    }
}

/// `coefficients · x ≤ rhs` in an inequality set, `= rhs` in an equality set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearConstraint {
    pub coefficients: DVector<f64>,
    pub rhs: f64,
}

impl LinearConstraint {
    pub fn new(coefficients: DVector<f64>, rhs: f64) -> Self {
        Self { coefficients, rhs }
    }

    /// The complementary half-space `-a·x ≤ -b`.
    pub fn negated(&self) -> Self {
        Self {
            coefficients: -&self.coefficients,
            rhs: -self.rhs,
        }
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            coefficients: &self.coefficients * factor,
            rhs: self.rhs * factor,
        }
    }

    pub fn lhs(&self, x: &DVector<f64>) -> f64 {
        self.coefficients.dot(x)
    }

    pub fn dimension(&self) -> usize {
        self.coefficients.len()
    }
}

/// Borrowed view of one minimization problem.
#[derive(Debug, Clone, Copy)]
pub struct LinearProgram<'a> {
    pub objective: &'a DVector<f64>,
    pub inequalities: &'a [LinearConstraint],
    pub equalities: &'a [LinearConstraint],
    pub bounds: &'a [VarBounds],
}

impl<'a> LinearProgram<'a> {
    pub fn dimension(&self) -> usize {
        self.objective.len()
    }

    fn validate(&self) -> Result<(), LpError> {
        let p = self.dimension();
        if self.bounds.len() != p {
            return Err(LpError::DimensionMismatch {
                what: "bounds",
                expected: p,
                got: self.bounds.len(),
            });
        }
        if self.objective.iter().any(|v| !v.is_finite()) {
            return Err(LpError::NonFinite { what: "objective" });
        }
        for (what, set) in [("inequality", self.inequalities), ("equality", self.equalities)] {
            for c in set {
                if c.dimension() != p {
                    return Err(LpError::DimensionMismatch {
                        what,
                        expected: p,
                        got: c.dimension(),
                    });
                }
                if !c.rhs.is_finite() || c.coefficients.iter().any(|v| !v.is_finite()) {
                    return Err(LpError::NonFinite { what });
                }
            }
        }
        for (index, b) in self.bounds.iter().enumerate() {
            if let (Some(lower), Some(upper)) = (b.lower, b.upper) {
                if lower > upper {
                    return Err(LpError::InvalidBounds {
                        index,
                        lower,
                        upper,
                    });
                }
            }
            if b.lower.is_some_and(|v| !v.is_finite()) || b.upper.is_some_and(|v| !v.is_finite()) {
                return Err(LpError::NonFinite { what: "bounds" });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LpOutcome {
    Optimal { value: f64, x: DVector<f64> },
    Infeasible,
    Unbounded,
}

impl LpOutcome {
    /// Optimal objective value, `None` when infeasible or unbounded.
    pub fn optimum(&self) -> Option<f64> {
        match self {
            Self::Optimal { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn is_infeasible(&self) -> bool {
        matches!(self, Self::Infeasible)
    }
}

#[derive(Debug, Error)]
pub enum LpError {
    #[error("dimension mismatch in {what}: expected {expected} entries, got {got}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("invalid bounds for variable {index}: lower {lower} > upper {upper}")]
    InvalidBounds { index: usize, lower: f64, upper: f64 },
    #[error("non-finite value in {what}")]
    NonFinite { what: &'static str },
    #[error("simplex did not converge within {0} iterations")]
    IterationLimit(usize),
}

/// Solver seam: anything that can minimize a linear program.
pub trait LpSolver: Send + Sync {
    fn solve(&self, lp: &LinearProgram<'_>) -> Result<LpOutcome, LpError>;
}

// ---------------------------------------------------------------------
//  Standard form
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
enum Substitution {
    /// x = lower + y
    Shift { col: usize, lower: f64 },
    /// x = upper - y
    Mirror { col: usize, upper: f64 },
    /// x = y_pos - y_neg
    Split { pos: usize, neg: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowKind {
    Le,
    Eq,
}

#[derive(Debug, Clone)]
struct Row {
    coefficients: Vec<f64>,
    kind: RowKind,
    rhs: f64,
}

#[derive(Debug, Clone)]
struct StandardForm {
    n_cols: usize,
    subs: Vec<Substitution>,
    rows: Vec<Row>,
    cost: Vec<f64>,
}

/// Rewrites `a·x` in terms of the non-negative standard-form variables.
/// Returns the row over `y` and the constant that moves to the right side.
fn translate(subs: &[Substitution], n_cols: usize, a: &DVector<f64>) -> (Vec<f64>, f64) {
    let mut row = vec![0.0; n_cols];
    let mut constant = 0.0;
    for (k, s) in subs.iter().enumerate() {
        let coef = a[k];
        match *s {
            Substitution::Shift { col, lower } => {
                row[col] += coef;
                constant += coef * lower;
            }
            Substitution::Mirror { col, upper } => {
                row[col] -= coef;
                constant += coef * upper;
            }
            Substitution::Split { pos, neg } => {
                row[pos] += coef;
                row[neg] -= coef;
            }
        }
    }
    (row, constant)
}

fn standardize(lp: &LinearProgram<'_>) -> StandardForm {
    let mut subs = Vec::with_capacity(lp.bounds.len());
    let mut n_cols = 0usize;
    for b in lp.bounds {
        match (b.lower, b.upper) {
            (Some(lower), _) => {
                subs.push(Substitution::Shift { col: n_cols, lower });
                n_cols += 1;
            }
            (None, Some(upper)) => {
                subs.push(Substitution::Mirror { col: n_cols, upper });
                n_cols += 1;
            }
            (None, None) => {
                subs.push(Substitution::Split {
                    pos: n_cols,
                    neg: n_cols + 1,
                });
                n_cols += 2;
            }
        }
    }

    let mut rows = Vec::with_capacity(lp.inequalities.len() + lp.equalities.len() + subs.len());
    for c in lp.inequalities {
        let (coefficients, constant) = translate(&subs, n_cols, &c.coefficients);
        rows.push(Row {
            coefficients,
            kind: RowKind::Le,
            rhs: c.rhs - constant,
        });
    }
    for c in lp.equalities {
        let (coefficients, constant) = translate(&subs, n_cols, &c.coefficients);
        rows.push(Row {
            coefficients,
            kind: RowKind::Eq,
            rhs: c.rhs - constant,
        });
    }
    for (s, b) in subs.iter().zip(lp.bounds) {
        if let (Substitution::Shift { col, lower }, Some(upper)) = (*s, b.upper) {
            let mut coefficients = vec![0.0; n_cols];
            coefficients[col] = 1.0;
            rows.push(Row {
                coefficients,
                kind: RowKind::Le,
                rhs: upper - lower,
            });
        }
    }

    let (cost, _) = translate(&subs, n_cols, lp.objective);
    StandardForm {
        n_cols,
        subs,
        rows,
        cost,
    }
}

fn recover(subs: &[Substitution], y: &[f64]) -> DVector<f64> {
    DVector::from_iterator(
        subs.len(),
        subs.iter().map(|s| match *s {
            Substitution::Shift { col, lower } => lower + y[col],
            Substitution::Mirror { col, upper } => upper - y[col],
            Substitution::Split { pos, neg } => y[pos] - y[neg],
        }),
    )
}

// ---------------------------------------------------------------------
//  Tableau simplex
// ---------------------------------------------------------------------

/// Dense two-phase simplex.
#[derive(Debug, Clone)]
pub struct DenseSimplex {
    pub max_iterations: usize,
    /// Reduced-cost and phase-1 feasibility tolerance.
    pub tolerance: f64,
}

impl Default for DenseSimplex {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

fn pivot(t: &mut DMatrix<f64>, r: usize, c: usize) {
    let width = t.ncols();
    let p = t[(r, c)];
    for j in 0..width {
        t[(r, j)] /= p;
    }
    for i in 0..t.nrows() {
        if i == r {
            continue;
        }
        let f = t[(i, c)];
        if f == 0.0 {
            continue;
        }
        for j in 0..width {
            let v = t[(r, j)];
            t[(i, j)] -= f * v;
        }
    }
}

enum PhaseResult {
    Optimal,
    Unbounded,
}

impl DenseSimplex {
    /// Minimizes the cost row in place. Only columns `< allowed` may enter.
    /// The last row holds reduced costs, the last column the basic values.
    fn optimize(
        &self,
        t: &mut DMatrix<f64>,
        basis: &mut [usize],
        allowed: usize,
        iterations: &mut usize,
    ) -> Result<PhaseResult, LpError> {
        let m = t.nrows() - 1;
        let rhs = t.ncols() - 1;
        loop {
            if *iterations >= self.max_iterations {
                return Err(LpError::IterationLimit(self.max_iterations));
            }
            *iterations += 1;

            let Some(entering) = (0..allowed).find(|&j| t[(m, j)] < -self.tolerance) else {
                return Ok(PhaseResult::Optimal);
            };

            let mut leaving: Option<(usize, f64)> = None;
            for i in 0..m {
                let a = t[(i, entering)];
                if a <= PIVOT_EPS {
                    continue;
                }
                let ratio = t[(i, rhs)].max(0.0) / a;
                leaving = match leaving {
                    None => Some((i, ratio)),
                    Some((best, best_ratio)) => {
                        if ratio < best_ratio - PIVOT_EPS
                            || (ratio <= best_ratio + PIVOT_EPS && basis[i] < basis[best])
                        {
                            Some((i, ratio))
                        } else {
                            Some((best, best_ratio))
                        }
                    }
                };
            }
            let Some((row, _)) = leaving else {
                return Ok(PhaseResult::Unbounded);
            };
            pivot(t, row, entering);
            basis[row] = entering;
        }
    }
}

impl LpSolver for DenseSimplex {
    fn solve(&self, lp: &LinearProgram<'_>) -> Result<LpOutcome, LpError> {
        lp.validate()?;
        let form = standardize(lp);
        let m = form.rows.len();
        let n_slack = form.rows.iter().filter(|r| r.kind == RowKind::Le).count();
        let art_start = form.n_cols + n_slack;
        let rhs = art_start + m;

        let mut t = DMatrix::<f64>::zeros(m + 1, rhs + 1);
        let mut slack = form.n_cols;
        let mut rhs_scale = 1.0;
        for (i, row) in form.rows.iter().enumerate() {
            let sign = if row.rhs < 0.0 { -1.0 } else { 1.0 };
            for (j, &a) in row.coefficients.iter().enumerate() {
                t[(i, j)] = sign * a;
            }
            if row.kind == RowKind::Le {
                t[(i, slack)] = sign;
                slack += 1;
            }
            t[(i, art_start + i)] = 1.0;
            t[(i, rhs)] = sign * row.rhs;
            rhs_scale += row.rhs.abs();
        }
        let mut basis: Vec<usize> = (0..m).map(|i| art_start + i).collect();

        // Phase 1: minimize the artificial mass.
        for j in 0..art_start {
            t[(m, j)] = -(0..m).map(|i| t[(i, j)]).sum::<f64>();
        }
        t[(m, rhs)] = -(0..m).map(|i| t[(i, rhs)]).sum::<f64>();

        let mut iterations = 0usize;
        // Phase 1 is bounded below by zero, so it cannot report unbounded.
        self.optimize(&mut t, &mut basis, art_start, &mut iterations)?;
        let infeasibility = -t[(m, rhs)];
        if infeasibility > self.tolerance * rhs_scale {
            return Ok(LpOutcome::Infeasible);
        }

        // Drive remaining artificials out; rows with nothing to pivot on are redundant.
        for r in 0..m {
            if basis[r] < art_start {
                continue;
            }
            if let Some(j) = (0..art_start).find(|&j| t[(r, j)].abs() > self.tolerance) {
                pivot(&mut t, r, j);
                basis[r] = j;
            }
        }

        // Phase 2: real costs.
        let mut cost = vec![0.0; rhs];
        cost[..form.n_cols].copy_from_slice(&form.cost);
        for j in 0..rhs {
            t[(m, j)] = cost[j] - (0..m).map(|i| cost[basis[i]] * t[(i, j)]).sum::<f64>();
        }
        t[(m, rhs)] = -(0..m).map(|i| cost[basis[i]] * t[(i, rhs)]).sum::<f64>();

        match self.optimize(&mut t, &mut basis, art_start, &mut iterations)? {
            PhaseResult::Unbounded => Ok(LpOutcome::Unbounded),
            PhaseResult::Optimal => {
                let mut y = vec![0.0; form.n_cols];
                for (i, &b) in basis.iter().enumerate() {
                    if b < form.n_cols {
                        y[b] = t[(i, rhs)].max(0.0);
                    }
                }
                let x = recover(&form.subs, &y);
                let value = lp.objective.dot(&x);
                Ok(LpOutcome::Optimal { value, x })
            }
        }
    }
}
