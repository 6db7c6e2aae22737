pub mod simple;
pub mod table;

use crate::matrix::PreferenceMatrix;
use crate::AssignmentResult;
use std::fmt::Write;

/// Format the calculated assignment into a human readable String (e.g. to print it to stdout).
///
/// The output format will look like
/// ```text
/// ===== Bridge (2/2) =====
/// Anton Administrator
/// Bertalotta Beispiel
///
/// ===== Tutoring (0/1) =====
/// ```
/// with the assigned and requested count of each entity in parentheses. Persons requesting
/// several assignments appear once under every entity they are assigned to.
pub fn format_assignment(result: &AssignmentResult, matrix: &PreferenceMatrix) -> String {
    let mut out = String::new();
    for entity in matrix.entities() {
        write!(
            out,
            "\n===== {} ({}/{}) =====\n",
            entity.name, result.entity_counts[entity.index], entity.capacity
        )
        .unwrap();
        for person in matrix.persons() {
            let units = result.assigned[person.index]
                .iter()
                .filter(|e| **e == entity.index)
                .count();
            for _ in 0..units {
                write!(out, "{}\n", person.name).unwrap();
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use crate::matrix::PreferenceMatrix;
    use crate::{AssignmentResult, Entity, Person};

    #[test]
    fn format_lists_persons_under_their_entities() {
        let matrix = PreferenceMatrix::from_parts(
            vec![
                Entity {
                    index: 0,
                    name: "Bridge".into(),
                    capacity: 2,
                },
                Entity {
                    index: 1,
                    name: "Tutoring".into(),
                    capacity: 1,
                },
            ],
            vec![
                Person {
                    index: 0,
                    name: "Anton".into(),
                    requested: 2,
                },
                Person {
                    index: 1,
                    name: "Berta".into(),
                    requested: 1,
                },
            ],
            vec![vec![1, 2], vec![1, 3]],
        )
        .unwrap();
        let result = AssignmentResult {
            assigned: vec![vec![0, 1], vec![0]],
            entity_counts: vec![2, 1],
            total_cost: 6,
        };

        let formatted = super::format_assignment(&result, &matrix);
        assert_eq!(
            formatted,
            "\n===== Bridge (2/2) =====\nAnton\nBerta\n\n===== Tutoring (1/1) =====\nAnton\n"
        );
    }
}
