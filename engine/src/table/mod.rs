//! In-memory tables.
//!
//! The engine only needs a small tabular surface:
//! - named columns of [`Scalar`] values aligned by row,
//! - one [`RowKey`] label per row,
//! - column-wise concatenation aligned on labels,
//! - row deduplication by key.

pub mod frame;
pub mod scalar;

pub use frame::{Column, RowKey, Table};
pub use scalar::Scalar;
