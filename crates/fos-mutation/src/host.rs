//! Host tree interfaces
//!
//! The engine never owns the observed tree. It reads the tree's live state
//! through `ObservedTree` and receives raw per-event notifications from a
//! `MutationSource`.

use std::fmt::Debug;
use std::hash::Hash;

use crate::{ObserveOptions, SetupError};

/// Read access to the live tree being observed
pub trait ObservedTree {
    /// Stable handle for a real node
    type Node: Copy + Eq + Hash + Debug;

    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    /// Children in document order
    fn children(&self, node: Self::Node) -> Vec<Self::Node>;

    /// Current attribute value, `None` when absent or not an element
    fn attribute(&self, node: Self::Node, name: &str) -> Option<&str>;

    /// Current character data, `None` for nodes without any
    fn text(&self, node: Self::Node) -> Option<&str>;

    /// Whether `node` is currently reachable from `root`.
    fn is_connected(&self, root: Self::Node, node: Self::Node) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == root {
                return true;
            }
            current = self.parent(n);
        }
        false
    }
}

/// One raw notification, as reported by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawMutation<N> {
    ChildList {
        parent: N,
        added: Vec<N>,
        removed: Vec<N>,
    },
    Attribute {
        target: N,
        name: String,
        /// Value immediately before this event
        old_value: Option<String>,
    },
    CharacterData {
        target: N,
        /// Text immediately before this event
        old_value: String,
    },
}

/// Native mutation-observation primitive of the host
///
/// A subscription always covers child lists of the whole subtree. Attribute
/// and character-data events, with their old values, are requested only
/// when the options enable them.
pub trait MutationSource: ObservedTree {
    type Subscription;

    fn subscribe(
        &mut self,
        root: Self::Node,
        options: &ObserveOptions,
    ) -> Result<Self::Subscription, SetupError>;

    /// Drain the notifications queued since the last call
    fn take_batch(&mut self, subscription: &Self::Subscription) -> Vec<RawMutation<Self::Node>>;

    fn unsubscribe(&mut self, subscription: Self::Subscription);
}
