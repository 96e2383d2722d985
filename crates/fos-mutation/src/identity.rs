//! Identity tagging
//!
//! Associates each tracked real node with the shadow id the engine assigned
//! to it. Host handles are plain values, so the tag lives in a map owned by
//! one engine instead of on the node; two engines watching overlapping trees
//! never see each other's tags.

use std::collections::HashMap;
use std::hash::Hash;

use crate::ShadowId;

/// Per-engine node → shadow id association
#[derive(Debug)]
pub struct IdentityTagger<N> {
    tags: HashMap<N, ShadowId>,
}

impl<N: Copy + Eq + Hash> Default for IdentityTagger<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Copy + Eq + Hash> IdentityTagger<N> {
    pub fn new() -> Self {
        Self {
            tags: HashMap::new(),
        }
    }

    /// Tag `node`, replacing any previous tag
    pub fn tag(&mut self, node: N, id: ShadowId) {
        self.tags.insert(node, id);
    }

    #[inline]
    pub fn lookup(&self, node: N) -> Option<ShadowId> {
        self.tags.get(&node).copied()
    }

    /// Drop the tag; the node reads as untracked afterwards
    pub fn untag(&mut self, node: N) -> Option<ShadowId> {
        self.tags.remove(&node)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn clear(&mut self) {
        self.tags.clear();
    }
}
