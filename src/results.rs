//! Evaluation records, run summary, and their JSON persistence.

use crate::error::{EvalError, Result};
use crate::retrieval::ChunkMetadata;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Outcome of evaluating one query.
///
/// Field order is the column order the CSV converter prefers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub query: String,
    /// Judge score in [0, 5]; `null` when the judge gave none.
    pub score: Option<f64>,
    pub reason: Option<String>,
    pub retrieved_context_preview: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub full_retrieved_context: Option<String>,
    pub retrieved_chunks: Vec<ChunkMetadata>,
}

/// All records of one run, in query order.
#[derive(Debug, Clone, Default)]
pub struct RunResults {
    records: Vec<EvaluationRecord>,
}

impl RunResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record.
    pub fn push(&mut self, record: EvaluationRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[EvaluationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records that carry a score.
    pub fn scored(&self) -> usize {
        self.records.iter().filter(|r| r.score.is_some()).count()
    }

    /// Mean of the scores that are present; `None` if no record has one.
    pub fn mean_score(&self) -> Option<f64> {
        let scores: Vec<f64> = self.records.iter().filter_map(|r| r.score).collect();
        if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f64>() / scores.len() as f64)
        }
    }

    /// Print summary to stdout.
    pub fn print_summary(&self) {
        println!("{}", "-".repeat(50));
        if self.is_empty() {
            println!("No results to summarize.");
            return;
        }

        println!("Queries evaluated: {}", self.len());
        println!("Queries scored:    {}", self.scored());
        match self.mean_score() {
            Some(avg) => println!("Average Retrieval Score: {:.2} / 5.0", avg),
            None => println!("Average Retrieval Score: n/a (no scores returned)"),
        }
    }

    /// Write all records to `path`, replacing any existing file.
    pub fn save(&self, path: &Path) -> Result<()> {
        save_results(&self.records, path)
    }
}

/// Save records as a pretty-printed JSON array.
pub fn save_results(records: &[EvaluationRecord], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| EvalError::io(parent, e))?;
        }
    }

    let json = serde_json::to_string_pretty(records)
        .map_err(|e| EvalError::Serialization(e.to_string()))?;

    fs::write(path, json).map_err(|e| EvalError::io(path, e))?;

    Ok(())
}

/// Load records written by [`save_results`].
pub fn load_results(path: &Path) -> Result<Vec<EvaluationRecord>> {
    if !path.exists() {
        return Err(EvalError::InputNotFound(path.to_path_buf()));
    }

    let data = fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;
    serde_json::from_str(&data).map_err(|e| EvalError::Serialization(e.to_string()))
}
