//! IO functionality for the spreadsheet table layout: reading the preference table from a CSV
//! file and writing the calculated assignment as a CSV table.
//!
//! The input layout is the one produced by the usual spreadsheet workflow:
//! - row 1: `Assignment` in column A, `Counts` in column B, then one person name per column
//! - row 2: `Counts` in column A, column B blank, then each person's requested count
//! - rows 3..: entity name in column A, entity capacity in column B, then one preference score
//!   (1-4) per person
//!
//! In the degenerate layout (`no_custom_counts`), column B and row 2 are omitted entirely and
//! all capacities and requested counts default to 1.
//!
//! This module only splits the table into rows and columns; cell values are validated by the
//! matrix builder, so that validation errors name the offending person/entity pair.

use csv::{ReaderBuilder, WriterBuilder};

use crate::matrix::{PreferenceMatrix, RawEntity, RawPerson, RawTable};
use crate::AssignmentResult;

/// Read the preference table from a Reader (e.g. an open CSV file) into a `RawTable`.
pub fn read<R: std::io::Read>(reader: R, no_custom_counts: bool) -> Result<RawTable, String> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let mut records = Vec::new();
    for record in csv_reader.records() {
        let record = record.map_err(|e| e.to_string())?;
        // Spreadsheet exports tend to contain fully blank trailing rows
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        records.push(record);
    }

    let offset = if no_custom_counts { 1 } else { 2 };
    let header = records.first().ok_or("input table is empty")?;
    if header.get(0) != Some("Assignment") {
        return Err(format!(
            "cell A1 must be 'Assignment', got '{}'",
            header.get(0).unwrap_or("")
        ));
    }
    if !no_custom_counts && header.get(1) != Some("Counts") {
        return Err(format!(
            "cell B1 must be 'Counts', got '{}' (use --no-custom-counts for tables without \
             counts)",
            header.get(1).unwrap_or("")
        ));
    }
    let person_names: Vec<String> = header.iter().skip(offset).map(str::to_owned).collect();

    let (requested, entity_records) = if no_custom_counts {
        (vec![None; person_names.len()], &records[1..])
    } else {
        let counts_row = records.get(1).ok_or("missing 'Counts' row (row 2)")?;
        if counts_row.get(0) != Some("Counts") {
            return Err(format!(
                "cell A2 must be 'Counts', got '{}'",
                counts_row.get(0).unwrap_or("")
            ));
        }
        let requested = (0..person_names.len())
            .map(|i| Some(counts_row.get(offset + i).unwrap_or("").to_owned()))
            .collect();
        (requested, &records[2..])
    };

    let mut persons: Vec<RawPerson> = person_names
        .into_iter()
        .zip(requested)
        .map(|(name, requested)| RawPerson {
            name,
            requested,
            scores: Vec::new(),
        })
        .collect();
    let mut entities = Vec::new();
    for record in entity_records {
        let name = record.get(0).unwrap_or("").to_owned();
        let capacity = if no_custom_counts {
            None
        } else {
            Some(record.get(1).unwrap_or("").to_owned())
        };
        for (i, person) in persons.iter_mut().enumerate() {
            person.scores.push(record.get(offset + i).unwrap_or("").to_owned());
        }
        entities.push(RawEntity { name, capacity });
    }

    Ok(RawTable { entities, persons })
}

/// Write the calculated assignment as a CSV table with one row per assigned unit, listing the
/// person, the entity and the person's raw preference score for it.
pub fn write<W: std::io::Write>(
    writer: W,
    result: &AssignmentResult,
    matrix: &PreferenceMatrix,
) -> Result<(), String> {
    let mut csv_writer = WriterBuilder::new().from_writer(writer);
    csv_writer
        .write_record(["Person", "Assignment", "Preference"])
        .map_err(|e| e.to_string())?;
    for person in matrix.persons() {
        for entity_index in &result.assigned[person.index] {
            let score = matrix.score(person.index, *entity_index).to_string();
            csv_writer
                .write_record([
                    person.name.as_str(),
                    matrix.entities()[*entity_index].name.as_str(),
                    score.as_str(),
                ])
                .map_err(|e| e.to_string())?;
        }
    }
    csv_writer.flush().map_err(|e| e.to_string())
}
