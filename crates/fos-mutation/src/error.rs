//! Error types
//!
//! Shadow-tree and reconciliation errors are invariant breaks: once one is
//! returned the engine's mirror can no longer be trusted and must be
//! rebuilt. Setup errors are reported before any batch is processed.

use thiserror::Error;

use crate::ShadowId;

/// Structural contract violations on the shadow tree
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShadowTreeError {
    #[error("Shadow node {0} does not exist")]
    UnknownNode(ShadowId),

    #[error("Insert position {index} out of range for shadow node {parent} with {len} children")]
    IndexOutOfRange {
        parent: ShadowId,
        index: usize,
        len: usize,
    },

    /// The child's recorded parent disagrees with the node asked to detach it
    #[error("Shadow node {child} is not a child of {parent}")]
    NotAChild { parent: ShadowId, child: ShadowId },

    #[error("Shadow node {0} is already attached")]
    AlreadyAttached(ShadowId),
}

/// Faults raised while reconciling a batch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Shadow(#[from] ShadowTreeError),

    #[error("No shadow counterpart for child {index} of shadow node {parent}")]
    MissingCounterpart { parent: ShadowId, index: usize },

    #[error("Shadow node {shadow} does not mirror child {index} of shadow node {parent}")]
    Desynchronized {
        parent: ShadowId,
        index: usize,
        shadow: ShadowId,
    },

    #[error("Affected shadow node {0} is neither attached nor held")]
    Orphaned(ShadowId),

    #[error("{0} held shadow node(s) were never reclaimed")]
    Unclaimed(usize),

    #[error("No prior position recorded for shadow node {0}")]
    MissingPriorPosition(ShadowId),

    #[error("Engine faulted on an earlier batch; observe again to rebuild the mirror")]
    Poisoned,
}

/// Problems detected when a subscription is set up
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    #[error("Observe target is not part of the tree")]
    UnknownTarget,

    #[error("Mutation source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Failed to mirror the observed tree: {0}")]
    Mirror(#[from] ShadowTreeError),
}
