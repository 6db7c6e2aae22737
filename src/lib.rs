//! Core data model of the committee assignment solver.
//!
//! The crate is organized in three layers: `matrix` turns raw tabular input into a validated
//! [`matrix::PreferenceMatrix`], `solver` turns a matrix and a [`BoundMode`] into an
//! [`AssignmentResult`] (or a structured infeasibility report), and `io` converts between these
//! types and the external file formats. The types in this module are shared by all three layers
//! and are immutable once constructed.

pub mod io;
pub mod matrix;
pub mod solver;

use serde::{Deserialize, Serialize};

/// Representation of an assignable slot's data (a committee, section or time-block)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// id/index of the Entity in the list of entities
    #[serde(default)]
    pub index: usize,
    /// Entity's name. Unique within a run, also used for info/debug output
    pub name: String,
    /// Number of persons to be assigned to this entity. How strictly this number constrains the
    /// solution is governed by the run's `BoundMode`
    pub capacity: u32,
}

/// Representation of a person's data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// id/index of the Person in the list of persons
    #[serde(default)]
    pub index: usize,
    /// Person's name. Unique within a run, also used for info/debug output
    pub name: String,
    /// Number of entities this person must be assigned to
    #[serde(default = "default_requested")]
    pub requested: u32,
}

fn default_requested() -> u32 {
    1
}

/// Global policy governing how strictly an entity's stated capacity constrains the number of
/// persons assigned to it. Selected once at invocation and applied uniformly to all entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundMode {
    /// The assigned count must equal the entity's capacity
    Exact,
    /// The capacity is a minimum; excess persons are assignable freely
    Lower,
    /// The capacity is a maximum
    Upper,
}

impl std::fmt::Display for BoundMode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(match self {
            BoundMode::Exact => "exact",
            BoundMode::Lower => "lower",
            BoundMode::Upper => "upper",
        })
    }
}

impl std::str::FromStr for BoundMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact" => Ok(BoundMode::Exact),
            "lower" => Ok(BoundMode::Lower),
            "upper" => Ok(BoundMode::Upper),
            _ => Err(format!(
                "unknown bound mode '{}' (expected exact, lower or upper)",
                s
            )),
        }
    }
}

/// The calculated assignment, as returned by the solver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentResult {
    /// For each person (indexed like the matrix's person list) the assigned entity indices in
    /// ascending order. The length of each inner Vec equals that person's requested count; an
    /// entity index appears once per assigned unit.
    pub assigned: Vec<Vec<usize>>,
    /// Number of assigned units per entity (indexed like the matrix's entity list)
    pub entity_counts: Vec<u32>,
    /// Total cost of the assignment under the solver's preference-to-cost mapping
    pub total_cost: u64,
}

/// Helper function for testing purposes, to check the index consistency of a list of persons and
/// entities
pub fn assert_data_consistency(persons: &[Person], entities: &[Entity]) {
    for (i, p) in persons.iter().enumerate() {
        assert_eq!(p.index, i, "person '{}' has index {}, expected {}", p.name, p.index, i);
    }
    for (i, e) in entities.iter().enumerate() {
        assert_eq!(e.index, i, "entity '{}' has index {}, expected {}", e.name, e.index, i);
    }
}

#[cfg(test)]
mod tests {
    use super::BoundMode;

    #[test]
    fn bound_mode_string_round_trip() {
        for mode in [BoundMode::Exact, BoundMode::Lower, BoundMode::Upper] {
            let parsed: BoundMode = mode.to_string().parse().unwrap();
            assert_eq!(parsed, mode);
        }
        assert!("tight".parse::<BoundMode>().is_err());
    }
}
