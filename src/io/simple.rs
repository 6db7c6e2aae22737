//! IO functionality for the simple JSON interchange format (canonical serde_json serialization
//! of `Entity`, `Person` and `AssignmentResult` objects), for machine consumers.

use serde_json::json;

use crate::matrix::PreferenceMatrix;
use crate::{AssignmentResult, Entity, Person};

/// Read entities, persons and preference scores from the simple JSON representation and build a
/// validated `PreferenceMatrix` from them. Indices are renumbered by list position, so input
/// files do not need to carry `index` fields.
pub fn read<R: std::io::Read>(reader: R) -> Result<PreferenceMatrix, String> {
    let mut data: serde_json::Value =
        serde_json::from_reader(reader).map_err(|err| err.to_string())?;

    let entities: Vec<Entity> =
        serde_json::from_value(data["entities"].take()).map_err(|e| format!("{}", e))?;
    let persons: Vec<Person> =
        serde_json::from_value(data["persons"].take()).map_err(|e| format!("{}", e))?;
    let scores: Vec<Vec<u8>> =
        serde_json::from_value(data["scores"].take()).map_err(|e| format!("{}", e))?;

    PreferenceMatrix::from_parts(entities, persons, scores).map_err(|e| e.to_string())
}

/// Write the calculated assignment as simple JSON representation (canonical serde_json
/// serialization of an `AssignmentResult` object) to a Writer (e.g. an output file).
pub fn write<W: std::io::Write>(writer: W, result: &AssignmentResult) -> Result<(), String> {
    let a: serde_json::Value = serde_json::to_value(result).map_err(|e| format!("{}", e))?;
    let data = json!({
        "format": "X-assignment-simple",
        "version": "1.0",
        "assignment": a
    });
    serde_json::to_writer(writer, &data).map_err(|e| format!("{}", e))?;

    Ok(())
}

/// Write the entities, persons and preference scores of a matrix to the simple JSON
/// representation, e.g. to archive a run's input in a machine-readable form.
pub fn write_input_data<W: std::io::Write>(
    writer: W,
    matrix: &PreferenceMatrix,
) -> Result<(), String> {
    let scores: Vec<Vec<u8>> = matrix
        .persons()
        .iter()
        .map(|p| {
            matrix
                .entities()
                .iter()
                .map(|e| matrix.score(p.index, e.index))
                .collect()
        })
        .collect();
    let data = json!({
        "format": "X-preferencedata-simple",
        "version": "1.0",
        "entities": matrix.entities(),
        "persons": matrix.persons(),
        "scores": scores,
    });
    serde_json::to_writer(writer, &data).map_err(|e| format!("{}", e))?;

    Ok(())
}
