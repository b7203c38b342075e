//! Reconciliation failures.

use thiserror::Error;

use crate::surface::NodeId;

/// Why a mutation batch could not be reconciled.
///
/// Either means a fast path addressed a node the surface no longer
/// recognizes. The controller drops the batch and escalates the next one
/// to a full diff, which cannot itself fail.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReconcileError {
    #[error("mutated node {0:?} is no longer addressable in the surface")]
    StaleNode(NodeId),

    #[error("text mutation on node {0:?} carries no readable text")]
    MissingText(NodeId),
}
