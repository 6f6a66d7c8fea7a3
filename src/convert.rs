//! Conversion of evaluation results from JSON to CSV.
//!
//! Headers come from the first record: the preferred columns it has,
//! then its remaining keys in their original order. Nested values are
//! written as compact JSON.

use crate::error::{EvalError, Result};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Default converter input.
pub const DEFAULT_INPUT: &str = "evaluation_results_formatted.json";

/// Default converter output.
pub const DEFAULT_OUTPUT: &str = "evaluation_results.csv";

/// Columns placed first when present.
pub const PREFERRED_ORDER: &[&str] = &[
    "query",
    "score",
    "reason",
    "retrieved_context_preview",
    "full_retrieved_context",
    "retrieved_chunks",
];

/// What a conversion produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertOutcome {
    /// The CSV was written with this many data rows.
    Written { rows: usize },
    /// The input list was empty; no file was written.
    Empty,
}

/// Column headers for a set of records whose first record is `first`.
pub fn csv_headers(first: &Map<String, Value>) -> Vec<String> {
    let preferred = PREFERRED_ORDER
        .iter()
        .filter(|key| first.contains_key(**key))
        .map(|key| key.to_string());

    let remaining = first
        .keys()
        .filter(|key| !PREFERRED_ORDER.contains(&key.as_str()))
        .cloned();

    preferred.chain(remaining).collect()
}

/// Render one cell. Missing and null values are empty.
pub fn cell_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(true)) => "True".to_string(),
        Some(Value::Bool(false)) => "False".to_string(),
        Some(Value::Number(n)) => n.to_string(),
        // Arrays and objects
        Some(nested) => nested.to_string(),
    }
}

/// Write records as CSV to `writer`.
pub fn write_csv<W: Write>(records: &[Map<String, Value>], writer: W) -> Result<()> {
    let Some(first) = records.first() else {
        return Ok(());
    };

    let headers = csv_headers(first);
    // Rows end in CRLF, as in RFC 4180
    let mut csv_writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(writer);
    csv_writer.write_record(&headers)?;

    for record in records {
        let row: Vec<String> = headers.iter().map(|h| cell_value(record.get(h))).collect();
        csv_writer.write_record(&row)?;
    }

    csv_writer
        .flush()
        .map_err(|e| EvalError::Csv(e.to_string()))?;
    Ok(())
}

/// Parse the converter input: a JSON array of objects.
pub fn parse_records(data: &str, source: &Path) -> Result<Vec<Map<String, Value>>> {
    let value: Value = serde_json::from_str(data).map_err(|e| {
        EvalError::Serialization(format!(
            "Failed to decode JSON from '{}': {}",
            source.display(),
            e
        ))
    })?;

    let Value::Array(items) = value else {
        return Err(EvalError::InvalidInput(
            "JSON data must be a list of objects.".to_string(),
        ));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(map) => Ok(map),
            _ => Err(EvalError::InvalidInput(format!(
                "Entry {} is not a JSON object.",
                i
            ))),
        })
        .collect()
}

/// Convert the JSON results at `input` into a CSV at `output`.
///
/// The output file is only created once the input has been read and
/// found non-empty.
pub fn convert_json_to_csv(input: &Path, output: &Path) -> Result<ConvertOutcome> {
    if !input.exists() {
        return Err(EvalError::InputNotFound(input.to_path_buf()));
    }

    let data = std::fs::read_to_string(input).map_err(|e| EvalError::io(input, e))?;
    let records = parse_records(&data, input)?;

    if records.is_empty() {
        return Ok(ConvertOutcome::Empty);
    }

    let file = File::create(output).map_err(|e| EvalError::io(output, e))?;
    write_csv(&records, file)?;

    Ok(ConvertOutcome::Written {
        rows: records.len(),
    })
}
