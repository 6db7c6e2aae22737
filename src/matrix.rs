//! Construction and validation of the preference matrix.
//!
//! The ingestion layer (`io::table`, `io::simple`) only splits its input into rows and columns;
//! all value-level validation happens here, so that every error can name the offending person,
//! entity or cell. The resulting `PreferenceMatrix` is immutable and owns everything the solver
//! needs: the entity and person lists plus one preference score per (person, entity) pair.

use std::collections::HashSet;

use log::debug;
use ndarray::Array2;
use thiserror::Error;

use crate::{Entity, Person};

/// Error cases of the matrix builder. All of them are fatal to the run and identify the offending
/// input record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error(
        "preference score of person '{person}' for entity '{entity}' must be an integer in 1..=4, \
         got '{value}'"
    )]
    BadScore {
        person: String,
        entity: String,
        value: String,
    },
    #[error("capacity of entity '{entity}' must be a non-negative integer, got '{value}'")]
    BadCapacity { entity: String, value: String },
    #[error(
        "requested assignment count of person '{person}' must be a positive integer, got '{value}'"
    )]
    BadRequestedCount { person: String, value: String },
    #[error("duplicate entity name '{0}'")]
    DuplicateEntity(String),
    #[error("duplicate person name '{0}'")]
    DuplicatePerson(String),
    #[error("person '{person}' has {got} preference scores, expected one per entity ({expected})")]
    ScoreCountMismatch {
        person: String,
        got: usize,
        expected: usize,
    },
    #[error("score matrix has {got} rows, expected one per person ({expected})")]
    ScoreRowCountMismatch { got: usize, expected: usize },
    #[error("input table contains no {0}")]
    EmptyTable(&'static str),
}

/// One unvalidated entity row of the input table: the entity's name and its capacity cell.
/// `capacity` is `None` in the degenerate table layout without counts, which defaults it to 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntity {
    pub name: String,
    pub capacity: Option<String>,
}

/// One unvalidated person column of the input table: the person's name, their requested-count
/// cell (`None` in the degenerate layout, defaulting to 1) and their preference score cells in
/// entity order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPerson {
    pub name: String,
    pub requested: Option<String>,
    pub scores: Vec<String>,
}

/// Raw rows/columns of an input table, as handed over by the ingestion layer. Cells are kept as
/// strings; parsing and validating them is the matrix builder's job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub entities: Vec<RawEntity>,
    pub persons: Vec<RawPerson>,
}

/// The validated aggregate of all entities, persons and preference scores. Owned by the run and
/// never mutated after construction; the solver is a pure function of this type.
#[derive(Debug, Clone, PartialEq)]
pub struct PreferenceMatrix {
    entities: Vec<Entity>,
    persons: Vec<Person>,
    /// Preference scores in {1,2,3,4}, indexed `[person, entity]`
    scores: Array2<u8>,
}

impl PreferenceMatrix {
    /// Build and validate a `PreferenceMatrix` from a raw input table.
    ///
    /// Person insertion order is preserved, so identical input rows always yield an identical
    /// matrix and reproducible tie-breaking downstream.
    pub fn build(table: RawTable) -> Result<Self, ValidationError> {
        if table.entities.is_empty() {
            return Err(ValidationError::EmptyTable("entities"));
        }
        if table.persons.is_empty() {
            return Err(ValidationError::EmptyTable("persons"));
        }

        let mut entities = Vec::with_capacity(table.entities.len());
        for (index, raw) in table.entities.into_iter().enumerate() {
            let capacity = match raw.capacity {
                None => 1,
                Some(cell) => {
                    cell.trim()
                        .parse::<u32>()
                        .map_err(|_| ValidationError::BadCapacity {
                            entity: raw.name.clone(),
                            value: cell.clone(),
                        })?
                }
            };
            entities.push(Entity {
                index,
                name: raw.name,
                capacity,
            });
        }

        let mut persons = Vec::with_capacity(table.persons.len());
        let mut scores = Array2::<u8>::zeros((table.persons.len(), entities.len()));
        for (index, raw) in table.persons.into_iter().enumerate() {
            let requested = match raw.requested {
                None => 1,
                Some(cell) => match cell.trim().parse::<u32>() {
                    Ok(count) if count > 0 => count,
                    _ => {
                        return Err(ValidationError::BadRequestedCount {
                            person: raw.name.clone(),
                            value: cell.clone(),
                        })
                    }
                },
            };
            if raw.scores.len() != entities.len() {
                return Err(ValidationError::ScoreCountMismatch {
                    person: raw.name.clone(),
                    got: raw.scores.len(),
                    expected: entities.len(),
                });
            }
            for (e, cell) in raw.scores.iter().enumerate() {
                scores[[index, e]] = parse_score(cell, &raw.name, &entities[e].name)?;
            }
            persons.push(Person {
                index,
                name: raw.name,
                requested,
            });
        }

        check_unique_names(&entities, &persons)?;
        debug!(
            "Validated preference matrix with {} persons and {} entities",
            persons.len(),
            entities.len()
        );
        Ok(PreferenceMatrix {
            entities,
            persons,
            scores,
        })
    }

    /// Build a `PreferenceMatrix` from already-typed entity/person lists and per-person score
    /// rows (used by the JSON interchange format and by tests). The same validation rules apply
    /// as in `build()`; `index` fields are renumbered to match the list positions.
    pub fn from_parts(
        mut entities: Vec<Entity>,
        mut persons: Vec<Person>,
        score_rows: Vec<Vec<u8>>,
    ) -> Result<Self, ValidationError> {
        if entities.is_empty() {
            return Err(ValidationError::EmptyTable("entities"));
        }
        if persons.is_empty() {
            return Err(ValidationError::EmptyTable("persons"));
        }
        for (i, e) in entities.iter_mut().enumerate() {
            e.index = i;
        }
        for (i, p) in persons.iter_mut().enumerate() {
            p.index = i;
        }
        for p in persons.iter() {
            if p.requested == 0 {
                return Err(ValidationError::BadRequestedCount {
                    person: p.name.clone(),
                    value: p.requested.to_string(),
                });
            }
        }

        if score_rows.len() != persons.len() {
            return Err(ValidationError::ScoreRowCountMismatch {
                got: score_rows.len(),
                expected: persons.len(),
            });
        }
        let mut scores = Array2::<u8>::zeros((persons.len(), entities.len()));
        for (p, row) in score_rows.iter().enumerate() {
            if row.len() != entities.len() {
                return Err(ValidationError::ScoreCountMismatch {
                    person: persons[p].name.clone(),
                    got: row.len(),
                    expected: entities.len(),
                });
            }
            for (e, score) in row.iter().enumerate() {
                if !(1..=4).contains(score) {
                    return Err(ValidationError::BadScore {
                        person: persons[p].name.clone(),
                        entity: entities[e].name.clone(),
                        value: score.to_string(),
                    });
                }
                scores[[p, e]] = *score;
            }
        }

        check_unique_names(&entities, &persons)?;
        Ok(PreferenceMatrix {
            entities,
            persons,
            scores,
        })
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn persons(&self) -> &[Person] {
        &self.persons
    }

    /// Preference score of a person for an entity, guaranteed to be in {1,2,3,4}
    pub fn score(&self, person: usize, entity: usize) -> u8 {
        self.scores[[person, entity]]
    }

    /// Sum of all persons' requested assignment counts
    pub fn total_demand(&self) -> u32 {
        self.persons.iter().map(|p| p.requested).sum()
    }

    /// Sum of all entities' capacities
    pub fn total_capacity(&self) -> u32 {
        self.entities.iter().map(|e| e.capacity).sum()
    }
}

fn parse_score(cell: &str, person: &str, entity: &str) -> Result<u8, ValidationError> {
    match cell.trim().parse::<u8>() {
        Ok(score) if (1..=4).contains(&score) => Ok(score),
        _ => Err(ValidationError::BadScore {
            person: person.to_owned(),
            entity: entity.to_owned(),
            value: cell.to_owned(),
        }),
    }
}

fn check_unique_names(entities: &[Entity], persons: &[Person]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for e in entities {
        if !seen.insert(e.name.as_str()) {
            return Err(ValidationError::DuplicateEntity(e.name.clone()));
        }
    }
    let mut seen = HashSet::new();
    for p in persons {
        if !seen.insert(p.name.as_str()) {
            return Err(ValidationError::DuplicatePerson(p.name.clone()));
        }
    }
    Ok(())
}
