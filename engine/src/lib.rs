//! # Featline - ordered feature engineering over raw tables
//!
//! Featline registers transformation units (a transform function, its input
//! columns, its output name(s) and fixed parameters) and applies them in
//! registration order to a raw table, accumulating a feature table aligned
//! on a stable row identity.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────────┐     ┌─────────────┐
//! │   CSV File  │────▶│   Loader    │────▶│ FeaturePipeline  │────▶│  Features   │
//! │  (ISO/UTF8) │     │  (auto-enc) │     │ (units in order) │     │  (by row id)│
//! └─────────────┘     └─────────────┘     └──────────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use featline::{functions, ApplyOptions, Diagnostics, FeaturePipeline, Params, UnitSpec};
//!
//! let diagnostics = Diagnostics::new();
//! let mut pipeline = FeaturePipeline::new();
//! pipeline.register(
//!     UnitSpec::new("Amount", functions::threshold())
//!         .output("HighAmount")
//!         .params(Params::new().with("threshold", 500)),
//!     &diagnostics,
//! );
//! let features = pipeline.apply(&raw, &ApplyOptions::default().with_identity(["ID"]), &diagnostics)?;
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`table`] - In-memory tables, columns and cell values
//! - [`loader`] - CSV loading with auto-detection
//! - [`pipeline`] - Transformation units and the pipeline engine
//! - [`functions`] - Ready-made feature functions
//! - [`diagnostics`] - Structured log events

// Core modules
pub mod error;
pub mod table;

// Loading
pub mod loader;

// Pipeline
pub mod functions;
pub mod pipeline;

// Logging
pub mod diagnostics;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, FunctionError, FunctionResult, LoadError, LoadResult, PipelineError, PipelineResult,
    TableError, TableResult,
};

// =============================================================================
// Re-exports - Data model
// =============================================================================

pub use table::{Column, RowKey, Scalar, Table};

// =============================================================================
// Re-exports - Loader
// =============================================================================

pub use loader::{load_bytes, load_file, load_str, LoadOptions, LoadedTable};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use pipeline::{
    ApplyOptions, Argument, Arguments, CallingConvention, FeatureFn, FeaturePipeline, FnOutput, OutputName,
    Params, RowIdentity, Signature, TransformationUnit, UnitSpec,
};

// =============================================================================
// Re-exports - Diagnostics
// =============================================================================

pub use diagnostics::{Diagnostics, Event, LogEntry, LogLevel};
