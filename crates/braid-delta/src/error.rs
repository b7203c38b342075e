//! Error type for delta validation at crate boundaries.

use thiserror::Error;

/// Errors raised when a delta shows up somewhere it does not fit.
///
/// The algebra itself is infallible on well-typed inputs; this covers the
/// validated constructors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DeltaError {
    #[error("operation {index} is not an insert; document content holds inserts only")]
    NotContent { index: usize },
}
