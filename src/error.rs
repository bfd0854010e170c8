//! Errors raised while constructing values.
//!
//! Classification itself never fails; the only hard errors in this crate are
//! structural ones, such as building a value without one of its required fields.

use thiserror::Error;

/// Errors that can occur when a builder is finalized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// A field that has no sensible default was never set.
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// Result type for builder operations.
pub type BuildResult<T> = Result<T, BuildError>;
