use nalgebra::{DMatrix, DVector};
use possibilist_harness::focal_set::{
    aggregate, compute_epmr_emr, compute_max_values_level, InconsistencyType,
};
use possibilist_harness::ElicitationError;

fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

fn pmr(values: &[f64]) -> DMatrix<f64> {
    DMatrix::from_row_slice(3, 3, values)
}

#[test]
fn single_fully_possible_polytope_is_returned_unchanged() {
    let m = pmr(&[0.0, 2.0, 1.0, 2.0, 0.0, 1.0, 1.0, 1.0, 0.0]);
    for inconsistency in [InconsistencyType::Zero, InconsistencyType::Maximum] {
        let (epmr, emr) = compute_epmr_emr(&[m.clone()], &[1.0], inconsistency).unwrap();
        assert_eq!(epmr, m);
        assert_eq!(emr.as_slice(), &[2.0, 2.0, 1.0]);
    }
}

#[test]
fn two_branches_blend_by_level_gaps() {
    // MR vectors [0, 2, 1] at possibility 1 and [2, 0, 1] at 0.1.
    let accept = pmr(&[0.0, 0.0, 0.0, 2.0, 0.0, 1.0, 1.0, 0.0, 0.0]);
    let reject = pmr(&[0.0, 2.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    let (_, emr) =
        compute_epmr_emr(&[accept, reject], &[1.0, 1.0 - 0.9], InconsistencyType::Zero).unwrap();
    assert!(approx_eq(emr[0], 0.2, 1e-12));
    assert!(approx_eq(emr[1], 1.8, 1e-12));
    assert!(approx_eq(emr[2], 1.0, 1e-12));
}

#[test]
fn closures_fill_missing_mass() {
    let values = [DVector::from_vec(vec![2.0, 4.0])];
    let zero = aggregate(&values, &[0.5], InconsistencyType::Zero).unwrap();
    let max = aggregate(&values, &[0.5], InconsistencyType::Maximum).unwrap();
    assert_eq!(zero.as_slice(), &[1.0, 2.0]);
    assert_eq!(max.as_slice(), &[2.0, 4.0]);
}

#[test]
fn zero_closure_never_exceeds_maximum_closure() {
    let list = vec![
        pmr(&[0.0, 3.0, 1.0, 0.5, 0.0, 2.0, 1.0, 4.0, 0.0]),
        pmr(&[0.0, 1.0, 2.0, 3.0, 0.0, 0.5, 2.0, 1.0, 0.0]),
    ];
    let possibilities = [0.6, 0.3];
    let (_, zero) = compute_epmr_emr(&list, &possibilities, InconsistencyType::Zero).unwrap();
    let (_, max) = compute_epmr_emr(&list, &possibilities, InconsistencyType::Maximum).unwrap();
    for (z, m) in zero.iter().zip(max.iter()) {
        assert!(z <= m);
    }
}

#[test]
fn expected_max_scores_and_bad_input() {
    let maxes = [DVector::from_vec(vec![3.0, 1.0]), DVector::from_vec(vec![1.0, 3.0])];
    let out = compute_max_values_level(&maxes, &[1.0, 0.25], InconsistencyType::Zero).unwrap();
    assert!(approx_eq(out[0], 0.75 * 3.0 + 0.25 * 1.0, 1e-12));

    assert!(matches!(
        aggregate(&maxes, &[1.0], InconsistencyType::Zero),
        Err(ElicitationError::InvalidInput(_))
    ));
    assert!(aggregate::<DVector<f64>>(&[], &[], InconsistencyType::Zero).is_err());
    assert!(aggregate(&maxes, &[1.0, 1.5], InconsistencyType::Zero).is_err());
}
