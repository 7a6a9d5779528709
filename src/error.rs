//! Error types for Support Signal

use thiserror::Error;

/// Errors that can occur during scoring and explanation
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Missing required {table} columns: {}", .columns.join(", "))]
    MissingColumns { table: String, columns: Vec<String> },

    #[error("Invalid weights: {0}")]
    InvalidWeights(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("school_id {0} not found in benchmarks")]
    SchoolNotFound(i64),

    #[error("student_id {0} not found in student data")]
    StudentNotFound(i64),

    #[error("Duplicate school_id {0} in benchmarks")]
    DuplicateSchool(i64),

    #[error("Invalid value {value:?} in column {column} (row {row})")]
    InvalidCell {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Cannot aggregate an empty series")]
    EmptySeries,

    #[error("Series has {values} values but {weights} recency weights")]
    WeightLengthMismatch { values: usize, weights: usize },

    #[error("Duplicate week_date {week_date} for student {student_id}")]
    DuplicateWeek {
        student_id: i64,
        week_date: chrono::NaiveDate,
    },

    #[error("Series mixes records from students {0} and {1}")]
    MixedStudents(i64, i64),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}
