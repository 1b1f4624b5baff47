use possibilist_harness::fusion::{
    answer_confidence, answers_matrix, binomial, combinations, find_all_maximum_coherent_subsets,
    find_best_coherent_subset, find_coherent_subsets, find_incorrect_answers, k_among_n_fusion,
    k_among_n_possibilities, restrict_polytopes, update_possibility_list, MAX_SUBSETS,
};
use possibilist_harness::{ElicitationError, Polytope, TNorm};

fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

fn branch(answers: &[f64]) -> Polytope {
    let possibility = TNorm::Product.fold(answers.iter().copied());
    Polytope::with_constraints(Vec::new(), Vec::new(), Vec::new(), possibility, answers.to_vec())
}

fn branches() -> Vec<Polytope> {
    vec![branch(&[1.0, 1.0, 0.2]), branch(&[0.4, 1.0, 1.0])]
}

#[test]
fn l_out_of_n_reweights_by_best_subset() {
    let polys = branches();
    assert_eq!(find_incorrect_answers(&polys), vec![1, 1]);

    let all = k_among_n_possibilities(&polys, 3, 3, TNorm::Product).unwrap();
    assert!(approx_eq(all[0], 0.2, 1e-12) && approx_eq(all[1], 0.4, 1e-12));

    // Dropping one answer lets either branch become fully possible.
    let two = k_among_n_possibilities(&polys, 2, 3, TNorm::Product).unwrap();
    assert_eq!(two, vec![1.0, 1.0]);

    let per_subset = k_among_n_fusion(&polys, 2, 3, TNorm::Product).unwrap();
    assert_eq!(per_subset.len(), 3);
    assert!(approx_eq(per_subset[0], 1.0, 1e-12));
    assert!(approx_eq(per_subset[1], 0.4, 1e-12));
    assert!(approx_eq(per_subset[2], 1.0, 1e-12));
}

#[test]
fn missing_history_entries_count_as_accepted() {
    let polys = vec![branch(&[0.5]), branch(&[1.0, 0.3])];
    let m = answers_matrix(&polys, 2);
    assert_eq!(m[(0, 1)], 1.0);
    let out = k_among_n_possibilities(&polys, 2, 2, TNorm::Minimum).unwrap();
    assert!(approx_eq(out[0], 0.5, 1e-12) && approx_eq(out[1], 0.3, 1e-12));
}

#[test]
fn coherent_subsets_and_restriction() {
    let polys = branches();
    let answers = answers_matrix(&polys, 3);

    let coherent = find_coherent_subsets(&answers, 2, 3).unwrap();
    assert_eq!(coherent, vec![vec![0, 1], vec![1, 2]]);

    let confidence = answer_confidence(&answers);
    assert_eq!(confidence.as_slice(), &[0.4, 1.0, 0.2]);
    let best = find_best_coherent_subset(&coherent, &confidence).unwrap();
    assert_eq!(best, &[0, 1]);

    let updated = update_possibility_list(&answers, best, TNorm::Product).unwrap();
    assert!(approx_eq(updated[0], 1.0, 1e-12) && approx_eq(updated[1], 0.4, 1e-12));
    assert!(update_possibility_list(&answers, &[3], TNorm::Product).is_err());

    let mcs = find_all_maximum_coherent_subsets(&answers, 3).unwrap();
    assert_eq!(mcs, vec![vec![0, 1], vec![1, 2]]);

    // Both branches accepted question 1, so restricting to it merges them.
    let (restricted, possibilities) = restrict_polytopes(&polys, &[1], TNorm::Product);
    assert_eq!(restricted.len(), 1);
    assert_eq!(possibilities, vec![1.0]);
    assert_eq!(restricted[0].answers(), &[1.0]);
}

#[test]
fn subset_enumeration_is_capped() {
    assert_eq!(binomial(5, 2), 10);
    assert_eq!(binomial(2, 5), 0);
    assert_eq!(combinations(3, 0).unwrap(), vec![Vec::<usize>::new()]);
    assert!(matches!(combinations(2, 3), Err(ElicitationError::InvalidInput(_))));

    let err = combinations(200, 100).unwrap_err();
    match err {
        ElicitationError::TooManySubsets { requested, limit } => {
            assert!(requested > limit);
            assert_eq!(limit, MAX_SUBSETS);
        }
        other => panic!("expected TooManySubsets, got {other:?}"),
    }
}
