//! Error types for the set engine

use crate::models::{NodeId, SegmentId};

/// Every recoverable failure the engine reports.
///
/// Malformed index ranges are not represented here: they indicate a caller
/// bug and panic instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Insufficient credits: {0}")]
    InsufficientCredits(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Provider '{0}' is not available on this tier")]
    ProviderNotAllowed(String),

    #[error("Node is locked: {0}")]
    NodeLocked(NodeId),

    #[error("Node is busy with an in-flight regeneration: {0}")]
    NodeBusy(NodeId),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Range contains locked node: {0}")]
    LockedNodeConflict(NodeId),

    #[error("Regeneration already in progress for {0}")]
    RegenerationInProgress(String),

    #[error("Structural change blocked while {0} regeneration(s) are pending")]
    StructuralChangeBlocked(usize),

    #[error("Regeneration target went stale: {0}")]
    StaleTarget(String),

    #[error("Cannot remove the last segment: {0}")]
    LastSegment(SegmentId),

    #[error("Segmented sets are not available on this tier")]
    SegmentedSetsDisabled,

    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn node_not_found(id: &NodeId) -> Self {
        Error::NotFound(format!("node {id}"))
    }

    pub(crate) fn segment_not_found(id: &SegmentId) -> Self {
        Error::NotFound(format!("segment {id}"))
    }
}
