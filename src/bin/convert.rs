//! JSON to CSV converter for evaluation results.
//!
//! Usage:
//!   convert                          # evaluation_results_formatted.json -> evaluation_results.csv
//!   convert -i results.json -o out.csv
//!
//! Problems with the input are reported as messages; the process still
//! exits successfully.

use clap::Parser;
use search_eval::EvalError;
use search_eval::convert::{ConvertOutcome, DEFAULT_INPUT, DEFAULT_OUTPUT, convert_json_to_csv};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "convert")]
#[command(about = "Convert evaluation results JSON to CSV", long_about = None)]
struct Cli {
    /// Path to input JSON file
    #[arg(short, long, default_value = DEFAULT_INPUT)]
    input: PathBuf,

    /// Path to output CSV file
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", "warn")).init();

    let cli = Cli::parse();

    match convert_json_to_csv(&cli.input, &cli.output) {
        Ok(ConvertOutcome::Written { rows }) => {
            log::debug!("Wrote {} rows", rows);
            println!(
                "Successfully converted '{}' to '{}'.",
                cli.input.display(),
                cli.output.display()
            );
        }
        Ok(ConvertOutcome::Empty) => {
            println!("Warning: JSON list is empty. No CSV generated.");
        }
        Err(EvalError::InputNotFound(path)) => {
            println!("Error: Input file '{}' not found.", path.display());
        }
        Err(EvalError::Serialization(_)) => {
            println!("Error: Failed to decode JSON from '{}'.", cli.input.display());
        }
        Err(EvalError::InvalidInput(msg)) => {
            println!("Error: {}", msg);
        }
        Err(e) => {
            println!("An unexpected error occurred: {}", e);
        }
    }
}
