use std::sync::Arc;
use std::time::Duration;

use super::{solve, solve_with_timeout, SolveError, Violation};
use crate::matrix::PreferenceMatrix;
use crate::{BoundMode, Entity, Person};

/// Build a validated matrix from (name, capacity) entities and (name, requested, scores) persons
fn matrix(entities: &[(&str, u32)], persons: &[(&str, u32, Vec<u8>)]) -> PreferenceMatrix {
    let entities = entities
        .iter()
        .enumerate()
        .map(|(index, (name, capacity))| Entity {
            index,
            name: (*name).to_owned(),
            capacity: *capacity,
        })
        .collect();
    let (persons, scores) = persons
        .iter()
        .enumerate()
        .map(|(index, (name, requested, scores))| {
            (
                Person {
                    index,
                    name: (*name).to_owned(),
                    requested: *requested,
                },
                scores.clone(),
            )
        })
        .unzip();
    PreferenceMatrix::from_parts(entities, persons, scores).unwrap()
}

#[test]
fn best_choices_are_matched() {
    let matrix = matrix(
        &[("Entity 1", 1), ("Entity 2", 1)],
        &[
            ("Person 1", 1, vec![1, 4]),
            ("Person 2", 1, vec![4, 1]),
        ],
    );

    let result = solve(&matrix, BoundMode::Exact).unwrap();
    assert_eq!(result.assigned, vec![vec![0], vec![1]]);
    assert_eq!(result.entity_counts, vec![1, 1]);
    // Two best-preference matches at weight 1 each
    assert_eq!(result.total_cost, 2);
}

#[test]
fn every_person_gets_their_full_requested_count() {
    let matrix = matrix(
        &[("A", 1), ("B", 1), ("C", 1)],
        &[
            ("Person 1", 2, vec![1, 2, 4]),
            ("Person 2", 1, vec![4, 4, 1]),
        ],
    );

    let result = solve(&matrix, BoundMode::Exact).unwrap();
    assert_eq!(result.assigned[0], vec![0, 1]);
    assert_eq!(result.assigned[1], vec![2]);
    assert_eq!(result.entity_counts, vec![1, 1, 1]);
    assert_eq!(result.total_cost, 1 + 4 + 1);
}

#[test]
fn exact_bounds_are_met_exactly() {
    let matrix = matrix(
        &[("A", 2), ("B", 1), ("C", 1)],
        &[
            ("Person 1", 1, vec![1, 2, 3]),
            ("Person 2", 1, vec![1, 2, 3]),
            ("Person 3", 1, vec![1, 2, 3]),
            ("Person 4", 1, vec![1, 2, 3]),
        ],
    );

    let result = solve(&matrix, BoundMode::Exact).unwrap();
    assert_eq!(result.entity_counts, vec![2, 1, 1]);
    for (person, assigned) in matrix.persons().iter().zip(&result.assigned) {
        assert_eq!(assigned.len(), person.requested as usize);
    }
}

#[test]
fn lower_bound_allows_exceeding_capacity() {
    // One entity with capacity 2 in lower mode and three persons: the solver must assign all
    // three and not reject the run for exceeding the capacity.
    let matrix = matrix(
        &[("A", 2)],
        &[
            ("Person 1", 1, vec![1]),
            ("Person 2", 1, vec![1]),
            ("Person 3", 1, vec![1]),
        ],
    );

    let result = solve(&matrix, BoundMode::Lower).unwrap();
    assert_eq!(result.entity_counts, vec![3]);
    assert_eq!(result.total_cost, 3);
}

#[test]
fn upper_bound_leaves_capacity_unused() {
    let matrix = matrix(
        &[("A", 2), ("B", 2)],
        &[
            ("Person 1", 1, vec![1, 2]),
            ("Person 2", 1, vec![1, 2]),
        ],
    );

    let result = solve(&matrix, BoundMode::Upper).unwrap();
    assert_eq!(result.assigned, vec![vec![0], vec![0]]);
    assert_eq!(result.entity_counts, vec![2, 0]);
    assert_eq!(result.total_cost, 2);
}

#[test]
fn precheck_rejects_exact_mismatch_without_solving() {
    // 10 requested assignments vs. a capacity sum of 8 must be reported as infeasible by the
    // arithmetic pre-check.
    let matrix = matrix(
        &[("A", 8)],
        &[
            ("Person 1", 5, vec![1]),
            ("Person 2", 5, vec![1]),
        ],
    );

    let error = solve(&matrix, BoundMode::Exact).unwrap_err();
    match error {
        SolveError::Infeasible(report) => {
            assert_eq!(
                report.violations,
                vec![Violation::DemandCapacityMismatch {
                    mode: BoundMode::Exact,
                    total_demand: 10,
                    total_capacity: 8,
                }]
            );
            assert!(report
                .to_string()
                .contains("capacity sum does not equal demand sum"));
        }
        other => panic!("expected an infeasibility report, got {:?}", other),
    }
}

#[test]
fn precheck_rejects_unfillable_lower_bounds() {
    let matrix = matrix(&[("A", 2)], &[("Person 1", 1, vec![1])]);

    let error = solve(&matrix, BoundMode::Lower).unwrap_err();
    assert!(matches!(
        error,
        SolveError::Infeasible(ref report)
            if report.violations == vec![Violation::DemandCapacityMismatch {
                mode: BoundMode::Lower,
                total_demand: 1,
                total_capacity: 2,
            }]
    ));
}

#[test]
fn precheck_rejects_exceeded_upper_bounds() {
    let matrix = matrix(
        &[("A", 2)],
        &[
            ("Person 1", 1, vec![1]),
            ("Person 2", 1, vec![1]),
            ("Person 3", 1, vec![1]),
        ],
    );

    let error = solve(&matrix, BoundMode::Upper).unwrap_err();
    assert!(matches!(
        error,
        SolveError::Infeasible(ref report)
            if report.violations == vec![Violation::DemandCapacityMismatch {
                mode: BoundMode::Upper,
                total_demand: 3,
                total_capacity: 2,
            }]
    ));
}

#[test]
fn cannot_accept_is_never_traded_for_cheap_aggregates() {
    // With naively linear weights 1..4, assigning person a to entity E3 (score 4) would be
    // "cheaper" (4+1+1) than the score-4-free alternative (3+3+1). The dominant score-4 weight
    // must make the solver pick the alternative: a->E2, b->E3, c->E1.
    let matrix = matrix(
        &[("E1", 1), ("E2", 1), ("E3", 1)],
        &[
            ("a", 1, vec![4, 3, 4]),
            ("b", 1, vec![4, 1, 3]),
            ("c", 1, vec![1, 4, 4]),
        ],
    );

    let result = solve(&matrix, BoundMode::Exact).unwrap();
    assert_eq!(result.assigned, vec![vec![1], vec![2], vec![0]]);
    for (person, assigned) in matrix.persons().iter().zip(&result.assigned) {
        for entity in assigned {
            assert_ne!(matrix.score(person.index, *entity), 4);
        }
    }
    assert_eq!(result.total_cost, 100 + 100 + 1);
}

#[test]
fn optimum_cost_is_idempotent() {
    let matrix = matrix(
        &[("A", 2), ("B", 2)],
        &[
            ("Person 1", 1, vec![1, 1]),
            ("Person 2", 1, vec![2, 2]),
            ("Person 3", 1, vec![1, 3]),
            ("Person 4", 1, vec![3, 1]),
        ],
    );

    let first = solve(&matrix, BoundMode::Exact).unwrap();
    let second = solve(&matrix, BoundMode::Exact).unwrap();
    assert_eq!(first.total_cost, second.total_cost);
}

#[test]
fn improving_a_preference_never_raises_the_optimum() {
    let worse = matrix(
        &[("A", 1), ("B", 1)],
        &[
            ("Person 1", 1, vec![2, 2]),
            ("Person 2", 1, vec![2, 2]),
        ],
    );
    let better = matrix(
        &[("A", 1), ("B", 1)],
        &[
            ("Person 1", 1, vec![1, 2]),
            ("Person 2", 1, vec![2, 2]),
        ],
    );

    let worse_cost = solve(&worse, BoundMode::Exact).unwrap().total_cost;
    let better_cost = solve(&better, BoundMode::Exact).unwrap().total_cost;
    assert!(better_cost <= worse_cost);
}

#[test]
fn generous_timeout_does_not_disturb_the_result() {
    let matrix = Arc::new(matrix(
        &[("A", 1), ("B", 1)],
        &[
            ("Person 1", 1, vec![1, 4]),
            ("Person 2", 1, vec![4, 1]),
        ],
    ));

    let direct = solve(&matrix, BoundMode::Exact).unwrap();
    let with_timeout =
        solve_with_timeout(matrix.clone(), BoundMode::Exact, Duration::from_secs(60)).unwrap();
    assert_eq!(with_timeout.total_cost, direct.total_cost);
}

#[test]
fn timeout_error_is_distinct_from_infeasibility() {
    let timeout = SolveError::Timeout(Duration::from_secs(5));
    assert!(timeout.to_string().contains("did not finish"));
    assert!(!matches!(timeout, SolveError::Infeasible(_)));
}
