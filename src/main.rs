use std::fs::File;
use std::sync::Arc;
use std::time::Duration;

use clap::{arg, crate_name, crate_version, value_parser, ArgAction, Command};
use log::{error, info};

use casol::matrix::PreferenceMatrix;
use casol::solver::{self, SolveError};
use casol::{io, BoundMode};

fn main() {
    env_logger::init();

    let args = Command::new(crate_name!())
        .version(crate_version!())
        .about(
            "Assigns persons to entities (committees, sections, time-blocks) from their ranked \
             preferences, honoring per-entity capacity bounds",
        )
        .arg(arg!(<INPUT> "Input CSV file with the preference table"))
        .arg(arg!(<OUTPUT> "Output file for the calculated assignment"))
        .arg(
            arg!(--bounds <MODE> "How strictly the capacities in the table constrain the \
                 assigned counts")
            .value_parser(["exact", "lower", "upper"])
            .required(false)
            .default_value("exact"),
        )
        .arg(
            arg!(--"no-custom-counts" "The input table has no counts column/row; all capacities \
                 and requested counts are assumed to be 1")
            .action(ArgAction::SetTrue),
        )
        .arg(
            arg!(--json "Write the assignment in the machine-readable JSON format instead of the \
                 CSV table")
            .action(ArgAction::SetTrue),
        )
        .arg(
            arg!(--timeout <SECONDS> "Abort the solver after the given wall-clock time")
                .value_parser(value_parser!(u64))
                .required(false),
        )
        .get_matches();

    let mode: BoundMode = args
        .get_one::<String>("bounds")
        .unwrap()
        .parse()
        .expect("clap restricts --bounds to the known modes");
    let input_path = args.get_one::<String>("INPUT").unwrap();
    let output_path = args.get_one::<String>("OUTPUT").unwrap();

    let input_file = match File::open(input_path) {
        Ok(file) => file,
        Err(e) => {
            error!("Could not open input file {}: {}", input_path, e);
            std::process::exit(exitcode::IOERR);
        }
    };
    let raw_table = match io::table::read(input_file, args.get_flag("no-custom-counts")) {
        Ok(table) => table,
        Err(e) => {
            error!("Could not parse input table {}: {}", input_path, e);
            std::process::exit(exitcode::DATAERR);
        }
    };
    let matrix = match PreferenceMatrix::build(raw_table) {
        Ok(matrix) => Arc::new(matrix),
        Err(e) => {
            error!("Invalid input data: {}", e);
            std::process::exit(exitcode::DATAERR);
        }
    };
    info!(
        "Read {} entities and {} persons",
        matrix.entities().len(),
        matrix.persons().len()
    );

    let result = match args.get_one::<u64>("timeout") {
        Some(seconds) => {
            solver::solve_with_timeout(matrix.clone(), mode, Duration::from_secs(*seconds))
        }
        None => solver::solve(&matrix, mode),
    };
    let result = match result {
        Ok(result) => result,
        Err(SolveError::Infeasible(report)) => {
            error!("No feasible assignment exists: {}", report);
            std::process::exit(exitcode::DATAERR);
        }
        Err(e @ SolveError::Timeout(_)) => {
            error!("{}. Consider retrying with relaxed bounds.", e);
            std::process::exit(exitcode::TEMPFAIL);
        }
        Err(e @ SolveError::Internal(_)) => {
            error!("{}", e);
            std::process::exit(exitcode::SOFTWARE);
        }
    };
    info!("Found an assignment with total cost {}", result.total_cost);
    print!("{}", io::format_assignment(&result, &matrix));

    let output_file = match File::create(output_path) {
        Ok(file) => file,
        Err(e) => {
            error!("Could not create output file {}: {}", output_path, e);
            std::process::exit(exitcode::IOERR);
        }
    };
    let written = if args.get_flag("json") {
        io::simple::write(output_file, &result)
    } else {
        io::table::write(output_file, &result, &matrix)
    };
    if let Err(e) = written {
        error!("Could not write output file {}: {}", output_path, e);
        std::process::exit(exitcode::IOERR);
    }
    std::process::exit(exitcode::OK);
}
