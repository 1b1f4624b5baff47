use nalgebra::DVector;
use possibilist_harness::lp::{
    DenseSimplex, LinearConstraint, LinearProgram, LpError, LpOutcome, LpSolver, VarBounds,
};

fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

fn row(coefficients: &[f64], rhs: f64) -> LinearConstraint {
    LinearConstraint::new(DVector::from_row_slice(coefficients), rhs)
}

fn solve(
    objective: &[f64],
    inequalities: &[LinearConstraint],
    equalities: &[LinearConstraint],
    bounds: &[VarBounds],
) -> Result<LpOutcome, LpError> {
    let objective = DVector::from_row_slice(objective);
    DenseSimplex::default().solve(&LinearProgram {
        objective: &objective,
        inequalities,
        equalities,
        bounds,
    })
}

#[test]
fn bounded_maximization_hits_vertex() {
    // max x + 2y  s.t. x + y <= 4, y <= 2, 0 <= x <= 3
    let out = solve(
        &[-1.0, -2.0],
        &[row(&[1.0, 1.0], 4.0), row(&[0.0, 1.0], 2.0)],
        &[],
        &[VarBounds::between(0.0, 3.0), VarBounds::non_negative()],
    )
    .unwrap();
    let LpOutcome::Optimal { value, x } = out else {
        panic!("expected optimum, got {out:?}");
    };
    assert!(approx_eq(value, -6.0, 1e-9));
    assert!(approx_eq(x[0], 2.0, 1e-9));
    assert!(approx_eq(x[1], 2.0, 1e-9));
}

#[test]
fn negative_rhs_rows_are_handled() {
    // min x + 2y  s.t. x + y >= 1
    let out = solve(
        &[1.0, 2.0],
        &[row(&[-1.0, -1.0], -1.0)],
        &[],
        &[VarBounds::non_negative(); 2],
    )
    .unwrap();
    assert!(approx_eq(out.optimum().unwrap(), 1.0, 1e-9));
}

#[test]
fn free_and_mirrored_variables() {
    // min x  s.t. -x <= 3, x free
    let out = solve(&[1.0], &[row(&[-1.0], 3.0)], &[], &[VarBounds::free()]).unwrap();
    assert!(approx_eq(out.optimum().unwrap(), -3.0, 1e-9));

    // max x  s.t. x <= 2.5 as an upper bound only
    let bounds = [VarBounds {
        lower: None,
        upper: Some(2.5),
    }];
    let out = solve(&[-1.0], &[], &[], &bounds).unwrap();
    assert!(approx_eq(out.optimum().unwrap(), -2.5, 1e-9));
}

#[test]
fn infeasible_and_unbounded_are_reported() {
    let infeasible = solve(
        &[1.0, 1.0],
        &[],
        &[row(&[1.0, 1.0], 1.0)],
        &[VarBounds::between(2.0, 5.0), VarBounds::non_negative()],
    )
    .unwrap();
    assert!(infeasible.is_infeasible());
    assert_eq!(infeasible.optimum(), None);

    let unbounded = solve(&[-1.0, 0.0], &[], &[], &[VarBounds::non_negative(); 2]).unwrap();
    assert_eq!(unbounded, LpOutcome::Unbounded);
}

#[test]
fn redundant_equalities_do_not_break_phase_two() {
    let out = solve(
        &[1.0, 0.0],
        &[],
        &[row(&[1.0, 1.0], 1.0), row(&[2.0, 2.0], 2.0)],
        &[VarBounds::non_negative(); 2],
    )
    .unwrap();
    let LpOutcome::Optimal { value, x } = out else {
        panic!("expected optimum");
    };
    assert!(approx_eq(value, 0.0, 1e-9));
    assert!(approx_eq(x[1], 1.0, 1e-9));
}

#[test]
fn degenerate_point_region() {
    // w1 + w2 = 1 and w1 = w2 written as two opposite inequalities.
    let out = solve(
        &[1.0, 0.0],
        &[row(&[-2.0, 2.0], 0.0), row(&[2.0, -2.0], 0.0)],
        &[row(&[1.0, 1.0], 1.0)],
        &[VarBounds::non_negative(); 2],
    )
    .unwrap();
    assert!(approx_eq(out.optimum().unwrap(), 0.5, 1e-9));
}

#[test]
fn shape_errors_are_rejected_up_front() {
    let err = solve(&[1.0, 1.0], &[row(&[1.0], 1.0)], &[], &[VarBounds::non_negative(); 2]);
    assert!(matches!(err, Err(LpError::DimensionMismatch { .. })));

    let err = solve(&[1.0], &[], &[], &[VarBounds::between(2.0, 1.0)]);
    assert!(matches!(err, Err(LpError::InvalidBounds { index: 0, .. })));

    let err = solve(&[1.0], &[], &[], &[]);
    assert!(matches!(err, Err(LpError::DimensionMismatch { .. })));
}
