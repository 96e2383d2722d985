//! fOS DOM - Document Object Model
//!
//! Arena-backed DOM tree with native mutation observation.
//! Nodes are addressed by `NodeId` handles that are never reused.

mod attributes;
mod node;
mod observer;
mod operations;
mod tree;

pub use attributes::{Attr, NamedNodeMap};
pub use node::{ElementData, Node, NodeData};
pub use observer::{MutationObserverInit, MutationRecord, MutationType, ObserverId};
pub use operations::{DomError, DomResult};
pub use tree::{Children, DomTree};

use serde::{Deserialize, Serialize};

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root (document) node ID
    pub const ROOT: NodeId = NodeId(0);

    /// Sentinel for "no node" in link fields
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Check if this refers to a real node
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    /// Arena index
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub(crate) fn to_option(self) -> Option<NodeId> {
        if self.is_valid() { Some(self) } else { None }
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}
