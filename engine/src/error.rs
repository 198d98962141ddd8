//! Error types for the statframe toolkit.
//!
//! Errors are layered the same way the library is:
//!
//! - [`SchemaError`] - a column reference or column layout is invalid
//! - [`TableError`] - a table operation failed (schema problem, pivot conflict, bad expression)
//! - [`DatasetError`] - a dataset could not be found or decoded
//! - [`ChartError`] - a table cannot be handed to the charting collaborator
//! - [`PipelineError`] - top-level errors for plans and the CLI
//!
//! Conversion is automatic via `From` implementations, so `?` works across
//! layer boundaries.

use thiserror::Error;

use crate::models::DataType;

// =============================================================================
// Schema Errors
// =============================================================================

/// A column reference or column layout is invalid for the table it targets.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// Referenced column does not exist.
    #[error("Column '{column}' not found (available: {})", available.join(", "))]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },

    /// A column name appears twice in the output schema.
    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),

    /// A rename target collides with a retained column or another rename.
    #[error("Cannot rename '{from}' to '{to}': a column named '{to}' already exists")]
    RenameCollision { from: String, to: String },

    /// Join key columns have types that cannot be compared.
    #[error("Join key '{column}' has incompatible types: {left} vs {right}")]
    IncompatibleKey {
        column: String,
        left: DataType,
        right: DataType,
    },

    /// Columns cannot be stacked into a single value column.
    #[error("Columns cannot share one value column: {}", columns.join(", "))]
    IncompatibleTypes { columns: Vec<String> },

    /// A value or expression has the wrong type for its context.
    #[error("Type mismatch for '{column}': expected {expected}, found {found}")]
    TypeMismatch {
        column: String,
        expected: String,
        found: String,
    },

    /// An operation needs more columns than were given.
    #[error("{operation} needs at least {required} columns, got {given}")]
    TooFewColumns {
        operation: &'static str,
        required: usize,
        given: usize,
    },

    /// Join suffixes must be non-empty and distinct.
    #[error("Invalid join suffixes: left '{left}', right '{right}'")]
    InvalidSuffix { left: String, right: String },

    /// A row does not have one cell per schema column.
    #[error("Row {row} has {found} cells, schema has {expected} columns")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
}

// =============================================================================
// Table Operation Errors
// =============================================================================

/// Errors raised by table operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    /// Schema problem.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Two rows target the same cell of a wide pivot.
    #[error("Ambiguous pivot: id ({id}) has more than one value for key '{key}'")]
    Conflict { id: String, key: String },

    /// An expression could not be compiled.
    #[error("Invalid expression: {0}")]
    InvalidExpression(String),
}

// =============================================================================
// Dataset Errors
// =============================================================================

/// Errors from dataset providers.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// No provider knows this table.
    #[error("Dataset not found: {0}")]
    NotFound(String),

    /// Failed to read a file.
    #[error("Failed to read dataset: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV.
    #[error("Invalid CSV at line {line}: {message}")]
    Csv { line: u64, message: String },

    /// A cell cannot be parsed as its declared type.
    #[error("Line {line}, column '{column}' (value '{value}'): expected {expected}")]
    InvalidValue {
        line: u64,
        column: String,
        value: String,
        expected: DataType,
    },

    /// The file does not match its declared schema.
    #[error("Dataset schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Sidecar schema is not valid JSON.
    #[error("Invalid schema file: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Chart Errors
// =============================================================================

/// Errors when building a chart specification.
#[derive(Debug, Error)]
pub enum ChartError {
    /// Missing column.
    #[error("Chart error: {0}")]
    Table(#[from] SchemaError),

    /// Positional channel bound to a non-numeric column.
    #[error("Column '{column}' is {found}, the {channel} channel needs a numeric column")]
    NotNumeric {
        channel: &'static str,
        column: String,
        found: DataType,
    },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level errors for plan execution and the CLI.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Dataset error.
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    /// Table operation error.
    #[error("Table error: {0}")]
    Table(#[from] TableError),

    /// Chart error.
    #[error("{0}")]
    Chart(#[from] ChartError),

    /// Plan is not valid JSON.
    #[error("Invalid plan: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV output error.
    #[error("CSV output error: {0}")]
    Csv(#[from] csv::Error),
}

impl From<SchemaError> for PipelineError {
    fn from(err: SchemaError) -> Self {
        PipelineError::Table(TableError::Schema(err))
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for table operations.
pub type TableResult<T> = Result<T, TableError>;

/// Result type for dataset operations.
pub type DatasetResult<T> = Result<T, DatasetError>;

/// Result type for chart operations.
pub type ChartResult<T> = Result<T, ChartError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // SchemaError -> TableError -> PipelineError
        let schema_err = SchemaError::DuplicateColumn("HR".into());
        let table_err: TableError = schema_err.clone().into();
        assert!(table_err.to_string().contains("HR"));

        let pipeline_err: PipelineError = table_err.into();
        assert!(pipeline_err.to_string().contains("Duplicate column"));

        // DatasetError -> PipelineError
        let pipeline_err: PipelineError = DatasetError::NotFound("salaries".into()).into();
        assert!(pipeline_err.to_string().contains("salaries"));
    }

    #[test]
    fn test_missing_column_lists_available() {
        let err = SchemaError::MissingColumn {
            column: "hr".into(),
            available: vec!["playerID".into(), "HR".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("'hr'"));
        assert!(msg.contains("playerID, HR"));
    }

    #[test]
    fn test_conflict_format() {
        let err = TableError::Conflict {
            id: "yearID=1961".into(),
            key: "AL".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("yearID=1961"));
        assert!(msg.contains("'AL'"));
    }
}
