use nalgebra::DVector;
use possibilist_harness::lp::{DenseSimplex, LinearConstraint};
use possibilist_harness::model::{answer_constraint, Model, WeightedSumModel};
use possibilist_harness::polytope::{Polytope, Side};
use possibilist_harness::possibility::TNorm;
use possibilist_harness::regret;
use possibilist_harness::Alternatives;

const TOL: f64 = 1e-9;

fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

fn w1_range(p: &Polytope, solver: &DenseSimplex) -> (f64, f64) {
    let e1 = DVector::from_vec(vec![1.0, 0.0]);
    let low = p.minimize(&e1, solver).unwrap().optimum().unwrap();
    let high = -p.minimize(&-&e1, solver).unwrap().optimum().unwrap();
    (low, high)
}

fn zero_over_one(model: &WeightedSumModel) -> LinearConstraint {
    answer_constraint(
        model,
        &DVector::from_vec(vec![3.0, 1.0]),
        &DVector::from_vec(vec![1.0, 3.0]),
    )
}

#[test]
fn crossing_answer_splits_into_weighted_children() {
    let model = WeightedSumModel::new(2).unwrap();
    let solver = DenseSimplex::default();
    let root = Polytope::root(&model.base_constraints());
    let c = zero_over_one(&model);

    assert_eq!(root.intersection_test(&c, &solver, TOL).unwrap(), Some(Side::Crossing));

    let (accept, reject) = root.cut(&c, 0.9, TNorm::Product);
    assert_eq!(accept.possibility(), 1.0);
    assert!(approx_eq(reject.possibility(), 0.1, 1e-12));
    assert_eq!(accept.answers(), &[1.0]);
    assert!(approx_eq(reject.answers()[0], 0.1, 1e-12));

    let (lo, hi) = w1_range(&accept, &solver);
    assert!(approx_eq(lo, 0.5, 1e-9) && approx_eq(hi, 1.0, 1e-9));
    let (lo, hi) = w1_range(&reject, &solver);
    assert!(approx_eq(lo, 0.0, 1e-9) && approx_eq(hi, 0.5, 1e-9));
}

#[test]
fn children_cover_the_parent_and_overlap_only_on_the_boundary() {
    let model = WeightedSumModel::new(2).unwrap();
    let root = Polytope::root(&model.base_constraints());
    let c = zero_over_one(&model);
    let (accept, reject) = root.cut(&c, 0.6, TNorm::Product);

    for step in 0..=40 {
        let w1 = step as f64 / 40.0;
        let x = DVector::from_vec(vec![w1, 1.0 - w1]);
        assert!(root.contains(&x, TOL));
        let in_accept = accept.contains(&x, TOL);
        let in_reject = reject.contains(&x, TOL);
        assert!(in_accept || in_reject, "w1 = {w1} lost by the cut");
        if in_accept && in_reject {
            assert!(approx_eq(w1, 0.5, 1e-9));
        }
    }
}

#[test]
fn inside_and_outside_after_a_cut() {
    let model = WeightedSumModel::new(2).unwrap();
    let solver = DenseSimplex::default();
    let c = zero_over_one(&model);
    let (accept, _) = Polytope::root(&model.base_constraints()).cut(&c, 0.9, TNorm::Product);

    assert_eq!(accept.intersection_test(&c, &solver, TOL).unwrap(), Some(Side::Inside));
    assert_eq!(
        accept.intersection_test(&c.negated(), &solver, TOL).unwrap(),
        Some(Side::Outside)
    );

    let updated = accept.clone().apply(Side::Outside, &c.negated(), 0.7, TNorm::Product);
    assert_eq!(updated.len(), 1);
    assert!(approx_eq(updated[0].possibility(), 0.3, 1e-12));
    assert_eq!(updated[0].answers().len(), 2);
}

#[test]
fn empty_region_reports_none() {
    let model = WeightedSumModel::new(2).unwrap();
    let solver = DenseSimplex::default();
    let mut p = Polytope::root(&model.base_constraints());
    assert!(p.is_feasible(&solver).unwrap());
    p.add_constraint(
        &LinearConstraint::new(DVector::from_vec(vec![-1.0, 0.0]), -0.8),
        1.0,
        TNorm::Minimum,
    );
    p.add_constraint(
        &LinearConstraint::new(DVector::from_vec(vec![1.0, 0.0]), 0.2),
        1.0,
        TNorm::Minimum,
    );
    assert_eq!(p.intersection_test(&zero_over_one(&model), &solver, TOL).unwrap(), None);
    assert!(!p.is_feasible(&solver).unwrap());
}

#[test]
fn tightening_never_raises_pairwise_regret() {
    let model = WeightedSumModel::new(2).unwrap();
    let solver = DenseSimplex::default();
    let alts = Alternatives::pareto_efficient(vec![
        vec![3.0, 1.0],
        vec![1.0, 3.0],
        vec![2.0, 2.0],
    ])
    .unwrap();
    let mut p = Polytope::root(&model.base_constraints());
    let before = regret::pmr(&alts, &p, &model, &solver).unwrap();
    p.add_constraint(&zero_over_one(&model), 1.0, TNorm::Product);
    let after = regret::pmr(&alts, &p, &model, &solver).unwrap();

    for (b, a) in before.iter().zip(after.iter()) {
        assert!(*a <= *b + 1e-9);
    }
    assert!(p.possibility() <= 1.0 && p.possibility() >= 0.0);
}
