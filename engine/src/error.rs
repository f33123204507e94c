//! Error types for the Featline feature pipeline.
//!
//! One error type per layer:
//!
//! - [`TableError`] - Malformed in-memory tables
//! - [`LoadError`] - Raw-data loading (CSV) errors
//! - [`ConfigError`] - Pipeline configuration errors (bad column names, signatures, shapes)
//! - [`FunctionError`] - Errors raised by transform functions themselves
//! - [`PipelineError`] - Top-level errors returned by [`crate::FeaturePipeline::apply`]
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Table Errors
// =============================================================================

/// Errors raised while building or reshaping a [`crate::Table`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    /// Columns of a table must all have the same length.
    #[error("Column '{column}' has {actual} rows, expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        actual: usize,
    },

    /// Index labels must cover every row exactly once.
    #[error("Index has {actual} labels but the table has {expected} rows")]
    IndexLength { expected: usize, actual: usize },

    /// Row position out of range.
    #[error("Row {row} out of range for table with {rows} rows")]
    RowOutOfRange { row: usize, rows: usize },
}

// =============================================================================
// Loader Errors
// =============================================================================

/// Errors while loading a raw table from CSV.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to decode content with the detected encoding.
    #[error("Failed to decode content as {0}")]
    Encoding(String),

    /// Malformed CSV.
    #[error("Invalid CSV format: {0}")]
    Csv(#[from] csv::Error),

    /// Empty input.
    #[error("CSV input is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in CSV")]
    NoHeaders,

    /// The loaded rows do not form a valid table.
    #[error("Invalid table: {0}")]
    Table(#[from] TableError),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Configuration errors: detected at registration or resolution time,
/// fatal to the current `apply` call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// An input name is present neither in the raw table nor in the features.
    #[error("Column '{0}' not found in raw table or computed features")]
    UnknownColumn(String),

    /// The supplied argument names do not match the function's declared parameters.
    #[error("Function '{function}' does not accept argument '{argument}'")]
    UnexpectedArgument { function: String, argument: String },

    /// A required declared parameter received no value.
    #[error("Function '{function}' is missing required argument '{argument}'")]
    MissingArgument { function: String, argument: String },

    /// More positional values than declared parameters.
    #[error("Function '{function}' takes {declared} parameters but {supplied} were supplied")]
    Arity {
        function: String,
        declared: usize,
        supplied: usize,
    },

    /// A fixed parameter uses a name the engine generates itself.
    #[error("Fixed parameter '{0}' collides with a generated argument name")]
    ReservedParameter(String),

    /// Whole-subtable inputs are not row-aligned.
    #[error("Sub-table has {actual} rows but first input column '{column}' has {expected}")]
    RowCountMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    /// Output names list does not match the number of produced columns.
    #[error("Unit '{unit}' names {names} outputs but the function produced {columns} columns")]
    OutputArity {
        unit: String,
        names: usize,
        columns: usize,
    },

    /// A produced feature would shadow a raw column or repeat inside a fragment.
    #[error("Feature column '{0}' is ambiguous with an existing column")]
    AmbiguousColumn(String),

    /// A fragment does not have one row per canonical row identity.
    #[error("Unit '{unit}' produced {actual} rows, expected {expected}")]
    FragmentLength {
        unit: String,
        expected: usize,
        actual: usize,
    },

    /// A unit declares no input columns.
    #[error("Unit '{0}' declares no input columns")]
    NoInputs(String),
}

// =============================================================================
// Function Errors
// =============================================================================

/// Errors raised from inside a transform function's own logic.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FunctionError {
    /// The function looked up an argument that was not bound.
    #[error("Missing argument: {0}")]
    MissingArgument(String),

    /// A value had the wrong type for the operation.
    #[error("Type error in '{argument}' at row {row}: {message}")]
    Type {
        argument: String,
        row: usize,
        message: String,
    },

    /// Anything else.
    #[error("{0}")]
    Custom(String),
}

impl FunctionError {
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level error returned by [`crate::FeaturePipeline::apply`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The transform function of a unit failed. Surfaced verbatim.
    #[error("Transform '{unit}' failed: {source}")]
    Function {
        unit: String,
        #[source]
        source: FunctionError,
    },

    /// Table reshaping error.
    #[error("Table error: {0}")]
    Table(#[from] TableError),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for table operations.
pub type TableResult<T> = Result<T, TableError>;

/// Result type for loader operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for transform functions.
pub type FunctionResult<T> = Result<T, FunctionError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let config_err = ConfigError::UnknownColumn("Amount".into());
        let pipeline_err: PipelineError = config_err.into();
        assert!(pipeline_err.to_string().contains("Amount"));

        let table_err = TableError::IndexLength { expected: 3, actual: 2 };
        let pipeline_err: PipelineError = table_err.into();
        assert!(matches!(pipeline_err, PipelineError::Table(_)));
    }

    #[test]
    fn test_function_error_is_wrapped_verbatim() {
        let err = PipelineError::Function {
            unit: "HighAmount".into(),
            source: FunctionError::custom("division by zero"),
        };
        let msg = err.to_string();
        assert!(msg.contains("HighAmount"));
        assert!(msg.contains("division by zero"));
    }
}
