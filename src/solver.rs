//! The assignment optimizer.
//!
//! The module formulates the preference matrix and capacity bounds as a bipartite transportation
//! problem over non-negative integer variables `x[p][e]` (units of person `p` assigned to entity
//! `e`) and solves it with the CBC solver through `good_lp`. A cheap arithmetic feasibility
//! pre-check short-circuits structurally impossible demand/capacity combinations before any model
//! is built. The solver's fractional output is decoded back to an integral `AssignmentResult`;
//! the transportation structure is totally unimodular, so the integral optimum always exists.

use std::fmt;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use good_lp::{
    coin_cbc, constraint, variable, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel, Variable,
};
use log::{debug, info};
use thiserror::Error;

use crate::matrix::PreferenceMatrix;
use crate::{AssignmentResult, BoundMode};

/// Cost of one assigned unit at preference scores 1, 2 and 3. The escalation keeps a single
/// score-3 assignment more expensive than any realistic number of score-2 assignments.
const SCORE_WEIGHTS: [u64; 3] = [1, 4, 100];

/// Maximum tolerated distance of a solver value from the nearest integer
const INTEGRALITY_EPS: f64 = 1e-6;

/// Error cases of the optimizer
#[derive(Debug, Error)]
pub enum SolveError {
    /// The constraints cannot all be satisfied. Not a programming error; the report names the
    /// violated constraints.
    #[error("infeasible assignment: {0}")]
    Infeasible(FeasibilityReport),
    /// The solver did not finish within the configured wall-clock budget. Distinct from
    /// infeasibility, so callers can retry with relaxed bounds.
    #[error("solver did not finish within {0:?}")]
    Timeout(Duration),
    /// A condition that must never occur with a validated matrix (unbounded solve, non-integral
    /// optimum, solver backend failure). Always indicates a bug.
    #[error("internal invariant violation: {0}")]
    Internal(String),
}

/// Structured description of why no assignment exists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeasibilityReport {
    pub violations: Vec<Violation>,
}

/// A single violated constraint (or constraint group) of an infeasible run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// The demand and capacity sums are incompatible with the bound mode. Detected by the
    /// pre-check, without invoking the solver.
    DemandCapacityMismatch {
        mode: BoundMode,
        total_demand: u32,
        total_capacity: u32,
    },
    /// The solver proved the constraint system infeasible. The per-entity bounds under the
    /// active mode are listed together with the demand they conflict with.
    NoSolution {
        mode: BoundMode,
        total_demand: u32,
        entity_bounds: Vec<(String, u32)>,
    },
}

impl fmt::Display for FeasibilityReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", violation)?;
        }
        Ok(())
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Violation::DemandCapacityMismatch {
                mode: BoundMode::Exact,
                total_demand,
                total_capacity,
            } => write!(
                f,
                "capacity sum does not equal demand sum ({} requested assignments, total \
                 capacity {})",
                total_demand, total_capacity
            ),
            Violation::DemandCapacityMismatch {
                mode: BoundMode::Lower,
                total_demand,
                total_capacity,
            } => write!(
                f,
                "{} requested assignments cannot fill the lower capacity bounds summing to {}",
                total_demand, total_capacity
            ),
            Violation::DemandCapacityMismatch {
                mode: BoundMode::Upper,
                total_demand,
                total_capacity,
            } => write!(
                f,
                "{} requested assignments exceed the upper capacity bounds summing to {}",
                total_demand, total_capacity
            ),
            Violation::NoSolution {
                mode,
                total_demand,
                entity_bounds,
            } => {
                write!(
                    f,
                    "no solution found: the {} bounds of entities ",
                    mode
                )?;
                for (i, (name, capacity)) in entity_bounds.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{} ({})", name, capacity)?;
                }
                write!(
                    f,
                    " cannot all be met by {} requested assignments",
                    total_demand
                )
            }
        }
    }
}

/// Calculate an optimal assignment for the given preference matrix and bound mode.
///
/// Returns the cost-minimal feasible assignment, a `SolveError::Infeasible` with a structured
/// report if no feasible assignment exists, or `SolveError::Internal` on conditions that cannot
/// occur with a validated matrix. The function is pure: identical inputs always yield an
/// assignment with the identical total cost (tie-broken assignments may differ).
pub fn solve(matrix: &PreferenceMatrix, mode: BoundMode) -> Result<AssignmentResult, SolveError> {
    precheck(matrix, mode)?;
    solve_transportation(matrix, mode)
}

/// Like `solve()`, but abort with `SolveError::Timeout` if the solver does not finish within the
/// given wall-clock time.
///
/// The solve runs on a worker thread; CBC offers no cooperative cancellation, so on timeout the
/// worker keeps running until its solve returns and is then discarded together with its result.
pub fn solve_with_timeout(
    matrix: Arc<PreferenceMatrix>,
    mode: BoundMode,
    timeout: Duration,
) -> Result<AssignmentResult, SolveError> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(solve(&matrix, mode));
    });
    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(SolveError::Timeout(timeout)),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(SolveError::Internal(String::from(
            "solver thread terminated without sending a result",
        ))),
    }
}

/// Check the demand/capacity sums against the bound mode before building any model. Violations
/// are reported as infeasible without invoking the solver.
fn precheck(matrix: &PreferenceMatrix, mode: BoundMode) -> Result<(), SolveError> {
    let total_demand = matrix.total_demand();
    let total_capacity = matrix.total_capacity();
    let compatible = match mode {
        BoundMode::Exact => total_demand == total_capacity,
        BoundMode::Lower => total_demand >= total_capacity,
        BoundMode::Upper => total_demand <= total_capacity,
    };
    if !compatible {
        debug!(
            "Feasibility pre-check failed: demand {} vs. capacity {} in {} mode",
            total_demand, total_capacity, mode
        );
        return Err(SolveError::Infeasible(FeasibilityReport {
            violations: vec![Violation::DemandCapacityMismatch {
                mode,
                total_demand,
                total_capacity,
            }],
        }));
    }
    Ok(())
}

/// Cost of one assigned unit at the given preference score. Score 4 ("cannot accept") is weighted
/// so that it strictly exceeds the maximum possible aggregate cost of all other assignments: the
/// solver never trades a single score-4 unit for any combination of score-1..3 units when a
/// feasible alternative exists.
fn score_weight(score: u8, total_demand: u32) -> u64 {
    match score {
        1..=3 => SCORE_WEIGHTS[(score - 1) as usize],
        _ => u64::from(total_demand) * SCORE_WEIGHTS[2] + 1,
    }
}

/// Build the transportation model, run CBC and decode the solution.
fn solve_transportation(
    matrix: &PreferenceMatrix,
    mode: BoundMode,
) -> Result<AssignmentResult, SolveError> {
    let num_persons = matrix.persons().len();
    let num_entities = matrix.entities().len();
    let total_demand = matrix.total_demand();

    // x[p][e] = number of units of person p assigned to entity e
    let mut vars = ProblemVariables::new();
    let x: Vec<Vec<Variable>> = (0..num_persons)
        .map(|_| {
            (0..num_entities)
                .map(|_| vars.add(variable().integer().min(0)))
                .collect()
        })
        .collect();

    let mut objective = Expression::from(0);
    for p in 0..num_persons {
        for e in 0..num_entities {
            objective += score_weight(matrix.score(p, e), total_demand) as f64 * x[p][e];
        }
    }

    debug!(
        "Building transportation model with {} variables in {} mode",
        num_persons * num_entities,
        mode
    );
    let mut model = vars.minimise(objective).using(coin_cbc);
    model.set_parameter("log", "0");

    // Every person must receive their full requested number of assignments.
    for person in matrix.persons() {
        let units: Expression = x[person.index].iter().copied().sum();
        model.add_constraint(constraint!(units == f64::from(person.requested)));
    }
    // Every entity's assigned count is bound by its capacity according to the bound mode.
    for entity in matrix.entities() {
        let occupied: Expression = (0..num_persons).map(|p| x[p][entity.index]).sum();
        let capacity = f64::from(entity.capacity);
        model.add_constraint(match mode {
            BoundMode::Exact => constraint!(occupied == capacity),
            BoundMode::Lower => constraint!(occupied >= capacity),
            BoundMode::Upper => constraint!(occupied <= capacity),
        });
    }

    let solution = match model.solve() {
        Ok(solution) => solution,
        Err(ResolutionError::Infeasible) => {
            return Err(SolveError::Infeasible(FeasibilityReport {
                violations: vec![Violation::NoSolution {
                    mode,
                    total_demand,
                    entity_bounds: matrix
                        .entities()
                        .iter()
                        .map(|e| (e.name.clone(), e.capacity))
                        .collect(),
                }],
            }))
        }
        Err(ResolutionError::Unbounded) => {
            return Err(SolveError::Internal(String::from(
                "solver reported the problem as unbounded, which the transportation constraints \
                 forbid",
            )))
        }
        Err(e) => return Err(SolveError::Internal(format!("solver failure: {}", e))),
    };

    decode_solution(matrix, &solution, &x).map(|result| {
        info!(
            "Found assignment with total cost {} for {} persons",
            result.total_cost, num_persons
        );
        result
    })
}

/// Convert the solver's floating point variable values back into an integral assignment,
/// guarding against floating-point residue, and re-derive the per-entity counts and the total
/// cost from the decoded integers.
fn decode_solution(
    matrix: &PreferenceMatrix,
    solution: &impl Solution,
    x: &[Vec<Variable>],
) -> Result<AssignmentResult, SolveError> {
    let total_demand = matrix.total_demand();
    let mut assigned = vec![Vec::new(); matrix.persons().len()];
    let mut entity_counts = vec![0u32; matrix.entities().len()];
    let mut total_cost = 0u64;

    for person in matrix.persons() {
        for entity in matrix.entities() {
            let value = solution.value(x[person.index][entity.index]);
            let units = decode_units(value)?;
            if units == 0 {
                continue;
            }
            for _ in 0..units {
                assigned[person.index].push(entity.index);
            }
            entity_counts[entity.index] += units;
            total_cost += u64::from(units)
                * score_weight(matrix.score(person.index, entity.index), total_demand);
        }
        if assigned[person.index].len() != person.requested as usize {
            return Err(SolveError::Internal(format!(
                "person '{}' was assigned {} units instead of the requested {}",
                person.name,
                assigned[person.index].len(),
                person.requested
            )));
        }
    }

    Ok(AssignmentResult {
        assigned,
        entity_counts,
        total_cost,
    })
}

fn decode_units(value: f64) -> Result<u32, SolveError> {
    let rounded = value.round();
    if (value - rounded).abs() >= INTEGRALITY_EPS || rounded < 0.0 {
        return Err(SolveError::Internal(format!(
            "solver returned the non-integral variable value {}",
            value
        )));
    }
    Ok(rounded as u32)
}

#[cfg(test)]
mod tests;
