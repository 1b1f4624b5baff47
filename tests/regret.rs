use nalgebra::DVector;
use possibilist_harness::lp::{DenseSimplex, LinearConstraint};
use possibilist_harness::model::{Model, WeightedSumModel};
use possibilist_harness::polytope::Polytope;
use possibilist_harness::possibility::TNorm;
use possibilist_harness::regret::{argmin, max_score, max_score_list, mr, pmr, pmr_list};
use possibilist_harness::Alternatives;

fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

fn fixture() -> (Alternatives, WeightedSumModel, DenseSimplex) {
    let alts = Alternatives::pareto_efficient(vec![
        vec![3.0, 1.0],
        vec![1.0, 3.0],
        vec![2.0, 2.0],
        vec![0.0, 0.0],
    ])
    .unwrap();
    (alts, WeightedSumModel::new(2).unwrap(), DenseSimplex::default())
}

#[test]
fn root_region_regrets() {
    let (alts, model, solver) = fixture();
    assert_eq!(alts.len(), 3);
    let root = Polytope::root(&model.base_constraints());

    let m = pmr(&alts, &root, &model, &solver).unwrap();
    let expected = [[0.0, 2.0, 1.0], [2.0, 0.0, 1.0], [1.0, 1.0, 0.0]];
    for i in 0..3 {
        for j in 0..3 {
            assert!(approx_eq(m[(i, j)], expected[i][j], 1e-9), "pmr[{i},{j}] = {}", m[(i, j)]);
        }
    }
    let r = mr(&m);
    assert!(approx_eq(r[0], 2.0, 1e-9) && approx_eq(r[2], 1.0, 1e-9));
    assert_eq!(argmin(&r), Some(2));

    let best = max_score(&alts, &root, &model, &solver).unwrap();
    assert!(approx_eq(best[0], 3.0, 1e-9));
    assert!(approx_eq(best[1], 3.0, 1e-9));
    assert!(approx_eq(best[2], 2.0, 1e-9));
}

#[test]
fn restricted_region_isolates_the_first_alternative() {
    let (alts, model, solver) = fixture();
    let mut p = Polytope::root(&model.base_constraints());
    // w1 >= 0.5
    p.add_constraint(
        &LinearConstraint::new(DVector::from_vec(vec![-2.0, 2.0]), 0.0),
        1.0,
        TNorm::Product,
    );
    let r = mr(&pmr(&alts, &p, &model, &solver).unwrap());
    assert!(approx_eq(r[0], 0.0, 1e-9));
    assert!(approx_eq(r[1], 2.0, 1e-9));
    assert!(approx_eq(r[2], 1.0, 1e-9));
}

#[test]
fn empty_region_gives_infinite_regret() {
    let (alts, model, solver) = fixture();
    let mut p = Polytope::root(&model.base_constraints());
    p.add_constraint(
        &LinearConstraint::new(DVector::from_vec(vec![1.0, 1.0]), 0.5),
        1.0,
        TNorm::Product,
    );
    let list = pmr_list(&alts, &[p.clone()], &model, &solver).unwrap();
    let m = &list[0];
    assert_eq!(m[(0, 0)], 0.0);
    assert!(m[(0, 1)].is_infinite() && m[(0, 1)] > 0.0);
    assert!(mr(m).iter().all(|v| v.is_infinite()));

    let scores = max_score(&alts, &p, &model, &solver).unwrap();
    assert!(scores.iter().all(|v| *v == f64::NEG_INFINITY));

    let root = Polytope::root(&model.base_constraints());
    let per_polytope = max_score_list(&alts, &[root, p], &model, &solver).unwrap();
    assert_eq!(per_polytope.len(), 2);
    assert!(approx_eq(per_polytope[0][2], 2.0, 1e-9));
    assert_eq!(per_polytope[1][0], f64::NEG_INFINITY);
}
