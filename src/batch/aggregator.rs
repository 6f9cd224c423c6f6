// src/batch/aggregator.rs
//! Feature table assembly

use ndarray::Array2;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::constants::features::FILE_ID_COLUMN;
use crate::error::{EmgError, EmgErrorBuilder, EmgResult};
use crate::processing::features::FeatureVector;

/// One file's identifier and feature values, aligned with the table columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub file_id: String,
    pub values: Vec<Option<f64>>,
}

impl FeatureRow {
    /// Value in column `idx`, missing when the row is shorter than the table
    pub fn value(&self, idx: usize) -> Option<f64> {
        self.values.get(idx).copied().flatten()
    }
}

/// Ordered rows sharing one column set
///
/// The column set is fixed by the first row pushed; any later row with a
/// different channel or feature layout is rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    columns: Vec<String>,
    rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one file's features
    pub fn push(&mut self, vector: FeatureVector) -> EmgResult<()> {
        let columns = vector.column_names();
        if self.rows.is_empty() && self.columns.is_empty() {
            self.columns = columns;
        } else if columns != self.columns {
            return Err(EmgErrorBuilder::new("aggregator", "push")
                .data_mismatch(
                    "channel set differs from the first file",
                    describe_channels(&self.columns),
                    describe_channels(&columns),
                )
                .for_file(&vector.file_id));
        }
        let values = vector.column_values();
        self.rows.push(FeatureRow {
            file_id: vector.file_id,
            values,
        });
        Ok(())
    }

    /// Column headers, starting with the file identifier column
    pub fn columns(&self) -> Vec<&str> {
        std::iter::once(FILE_ID_COLUMN)
            .chain(self.columns.iter().map(String::as_str))
            .collect()
    }

    /// Feature columns only, in the order of each row's values
    pub fn feature_columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one feature column across all rows
    pub fn column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|r| r.value(idx)).collect())
    }

    /// Dense matrix of feature values, NaN where a value is missing
    pub fn to_array(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.rows.len(), self.columns.len()), |(r, c)| {
            self.rows[r].value(c).unwrap_or(f64::NAN)
        })
    }
}

fn describe_channels(columns: &[String]) -> String {
    format!("{} columns ({})", columns.len(), columns.first().map_or("", String::as_str))
}

/// A file that produced no row
#[derive(Debug, Clone)]
pub struct FileFailure {
    pub index: usize,
    pub file_id: String,
    pub error: EmgError,
}

#[derive(Debug, Default)]
struct Collected {
    vectors: Vec<(usize, FeatureVector)>,
    failures: Vec<FileFailure>,
    abandoned: Vec<(usize, String)>,
}

/// Thread-safe collector for per-file results
///
/// Workers append in completion order; [`ResultAggregator::finish`] restores
/// submission order before building the table, so the output is the same
/// for a given input regardless of scheduling.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    collected: Mutex<Collected>,
}

/// Everything a finished aggregation produced
#[derive(Debug, Clone)]
pub struct Aggregated {
    pub table: FeatureTable,
    pub failures: Vec<FileFailure>,
    pub abandoned: Vec<String>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, index: usize, vector: FeatureVector) {
        self.collected.lock().vectors.push((index, vector));
    }

    pub fn record_failure(&self, index: usize, file_id: impl Into<String>, error: EmgError) {
        self.collected.lock().failures.push(FileFailure {
            index,
            file_id: file_id.into(),
            error,
        });
    }

    pub fn record_abandoned(&self, index: usize, file_id: impl Into<String>) {
        self.collected.lock().abandoned.push((index, file_id.into()));
    }

    /// Build the table in submission order
    ///
    /// Rows whose column set disagrees with the first row become failures.
    pub fn finish(self) -> Aggregated {
        let mut collected = self.collected.into_inner();
        collected.vectors.sort_by_key(|(i, _)| *i);

        let mut table = FeatureTable::new();
        let mut failures = collected.failures;
        for (index, vector) in collected.vectors {
            let file_id = vector.file_id.clone();
            if let Err(error) = table.push(vector) {
                warn!(file_id = %file_id, %error, "row rejected");
                failures.push(FileFailure { index, file_id, error });
            }
        }
        failures.sort_by_key(|f| f.index);

        collected.abandoned.sort_by_key(|(i, _)| *i);
        Aggregated {
            table,
            failures,
            abandoned: collected.abandoned.into_iter().map(|(_, id)| id).collect(),
        }
    }
}
