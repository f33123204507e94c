//! Feature pipeline: transformation units and the engine that runs them.
//!
//! - [`unit`] - Transformation units, calling conventions, feature functions
//! - [`identity`] - Canonical row identity of one `apply` call
//! - [`options`] - Per-call options
//! - [`engine`] - [`FeaturePipeline`]: registration, argument resolution, apply

pub mod engine;
pub mod identity;
pub mod options;
pub mod unit;

pub use engine::{FeaturePipeline, Inputs, UnitSpec, SUBTABLE_KEY};
pub use identity::RowIdentity;
pub use options::{ApplyOptions, KEY_SEPARATOR_ENV};
pub use unit::{
    Argument, Arguments, CallingConvention, FeatureFn, FnOutput, OutputName, Param, Params, Signature,
    TransformationUnit,
};
