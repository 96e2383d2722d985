//! Shadow tree
//!
//! Mirror of the observed tree's child-list shape. Nodes are addressed by
//! integer `ShadowId` handles held in one map, so links never form owning
//! cycles. Every node keeps parent, sibling and first/last-child links plus
//! an id-keyed child set for O(1) ownership checks.
//!
//! Invariants kept by every operation:
//! - `first_child`/`last_child` and the sibling chain agree with each other.
//! - A node's recorded parent is the node whose child set contains it.
//!
//! Operations that would break an invariant return `ShadowTreeError` and
//! leave the tree untouched.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::ShadowTreeError;

/// Stable identity of a shadow node; never reused within one tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ShadowId(pub(crate) u64);

impl ShadowId {
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ShadowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One mirrored node
#[derive(Debug)]
pub struct ShadowNode<N> {
    id: ShadowId,
    node: N,
    parent: Option<ShadowId>,
    prev_sibling: Option<ShadowId>,
    next_sibling: Option<ShadowId>,
    first_child: Option<ShadowId>,
    last_child: Option<ShadowId>,
    children: HashSet<ShadowId>,
}

impl<N: Copy> ShadowNode<N> {
    fn new(id: ShadowId, node: N) -> Self {
        Self {
            id,
            node,
            parent: None,
            prev_sibling: None,
            next_sibling: None,
            first_child: None,
            last_child: None,
            children: HashSet::new(),
        }
    }

    pub fn id(&self) -> ShadowId {
        self.id
    }

    /// The real node this mirrors
    pub fn node(&self) -> N {
        self.node
    }

    pub fn parent(&self) -> Option<ShadowId> {
        self.parent
    }

    pub fn previous_sibling(&self) -> Option<ShadowId> {
        self.prev_sibling
    }

    pub fn next_sibling(&self) -> Option<ShadowId> {
        self.next_sibling
    }

    pub fn first_child(&self) -> Option<ShadowId> {
        self.first_child
    }

    pub fn last_child(&self) -> Option<ShadowId> {
        self.last_child
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn has_child(&self, child: ShadowId) -> bool {
        self.children.contains(&child)
    }
}

/// Nested, serializable view of a shadow subtree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShadowSnapshot<N> {
    pub id: ShadowId,
    pub node: N,
    pub children: Vec<ShadowSnapshot<N>>,
}

/// Arena of shadow nodes
#[derive(Debug)]
pub struct ShadowTree<N> {
    nodes: HashMap<ShadowId, ShadowNode<N>>,
    next_id: u64,
}

impl<N: Copy> Default for ShadowTree<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Copy> ShadowTree<N> {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            next_id: 0,
        }
    }

    /// Create a detached shadow node mirroring `node`
    pub fn create(&mut self, node: N) -> ShadowId {
        let id = ShadowId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, ShadowNode::new(id, node));
        id
    }

    pub fn get(&self, id: ShadowId) -> Option<&ShadowNode<N>> {
        self.nodes.get(&id)
    }

    /// Whether `id` is live (created and not yet released)
    pub fn contains(&self, id: ShadowId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn entry(&self, id: ShadowId) -> Result<&ShadowNode<N>, ShadowTreeError> {
        self.nodes.get(&id).ok_or(ShadowTreeError::UnknownNode(id))
    }

    fn entry_mut(&mut self, id: ShadowId) -> Result<&mut ShadowNode<N>, ShadowTreeError> {
        self.nodes.get_mut(&id).ok_or(ShadowTreeError::UnknownNode(id))
    }

    pub fn parent(&self, id: ShadowId) -> Option<ShadowId> {
        self.get(id).and_then(|n| n.parent)
    }

    pub fn next_sibling(&self, id: ShadowId) -> Option<ShadowId> {
        self.get(id).and_then(|n| n.next_sibling)
    }

    pub fn previous_sibling(&self, id: ShadowId) -> Option<ShadowId> {
        self.get(id).and_then(|n| n.prev_sibling)
    }

    /// Real node mirrored by `id`
    pub fn node(&self, id: ShadowId) -> Result<N, ShadowTreeError> {
        self.entry(id).map(|n| n.node)
    }

    /// Children in order, following the sibling chain
    pub fn children(&self, id: ShadowId) -> Vec<ShadowId> {
        let mut children = Vec::new();
        let mut next = self.get(id).and_then(|n| n.first_child);
        while let Some(child) = next {
            children.push(child);
            next = self.next_sibling(child);
        }
        children
    }

    fn check_detached(&self, child: ShadowId) -> Result<(), ShadowTreeError> {
        if self.entry(child)?.parent.is_some() {
            return Err(ShadowTreeError::AlreadyAttached(child));
        }
        Ok(())
    }

    fn check_owned(&self, parent: ShadowId, child: ShadowId) -> Result<(), ShadowTreeError> {
        let owner = self.entry(parent)?;
        if self.entry(child)?.parent != Some(parent) || !owner.children.contains(&child) {
            return Err(ShadowTreeError::NotAChild { parent, child });
        }
        Ok(())
    }

    pub fn append_child(&mut self, parent: ShadowId, child: ShadowId) -> Result<(), ShadowTreeError> {
        self.entry(parent)?;
        self.check_detached(child)?;
        if parent == child {
            return Err(ShadowTreeError::AlreadyAttached(child));
        }

        let last = self.entry(parent)?.last_child;
        {
            let node = self.entry_mut(child)?;
            node.parent = Some(parent);
            node.prev_sibling = last;
            node.next_sibling = None;
        }
        if let Some(last) = last {
            self.entry_mut(last)?.next_sibling = Some(child);
        }
        let owner = self.entry_mut(parent)?;
        if owner.first_child.is_none() {
            owner.first_child = Some(child);
        }
        owner.last_child = Some(child);
        owner.children.insert(child);
        Ok(())
    }

    pub fn insert_before(
        &mut self,
        parent: ShadowId,
        child: ShadowId,
        reference: ShadowId,
    ) -> Result<(), ShadowTreeError> {
        self.check_owned(parent, reference)?;
        self.check_detached(child)?;
        let prev = self.entry(reference)?.prev_sibling;
        if prev.is_none() && self.entry(parent)?.first_child != Some(reference) {
            return Err(ShadowTreeError::NotAChild { parent, child: reference });
        }

        {
            let node = self.entry_mut(child)?;
            node.parent = Some(parent);
            node.prev_sibling = prev;
            node.next_sibling = Some(reference);
        }
        self.entry_mut(reference)?.prev_sibling = Some(child);
        match prev {
            Some(prev) => self.entry_mut(prev)?.next_sibling = Some(child),
            None => self.entry_mut(parent)?.first_child = Some(child),
        }
        self.entry_mut(parent)?.children.insert(child);
        Ok(())
    }

    /// Insert so that `child` ends up at `index`; `index == len` appends
    pub fn insert_at(
        &mut self,
        parent: ShadowId,
        child: ShadowId,
        index: usize,
    ) -> Result<(), ShadowTreeError> {
        let len = self.entry(parent)?.children.len();
        if index > len {
            return Err(ShadowTreeError::IndexOutOfRange { parent, index, len });
        }
        if index == len {
            return self.append_child(parent, child);
        }
        let mut reference = self.entry(parent)?.first_child;
        for _ in 0..index {
            reference = reference.and_then(|r| self.next_sibling(r));
        }
        match reference {
            Some(reference) => self.insert_before(parent, child, reference),
            None => Err(ShadowTreeError::IndexOutOfRange { parent, index, len }),
        }
    }

    /// Detach `child` from `parent` and clear its sibling links
    pub fn remove_child(&mut self, parent: ShadowId, child: ShadowId) -> Result<(), ShadowTreeError> {
        self.check_owned(parent, child)?;
        let (prev, next) = {
            let node = self.entry(child)?;
            (node.prev_sibling, node.next_sibling)
        };
        {
            let owner = self.entry(parent)?;
            if (prev.is_none() && owner.first_child != Some(child))
                || (next.is_none() && owner.last_child != Some(child))
            {
                return Err(ShadowTreeError::NotAChild { parent, child });
            }
        }

        match prev {
            Some(prev) => self.entry_mut(prev)?.next_sibling = next,
            None => self.entry_mut(parent)?.first_child = next,
        }
        match next {
            Some(next) => self.entry_mut(next)?.prev_sibling = prev,
            None => self.entry_mut(parent)?.last_child = prev,
        }
        self.entry_mut(parent)?.children.remove(&child);

        let node = self.entry_mut(child)?;
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
        Ok(())
    }

    /// Drop a node from the arena and return the real node it mirrored.
    ///
    /// Links of neighbouring nodes are left as they are; callers release
    /// whole detached subtrees, children before parents.
    pub fn release(&mut self, id: ShadowId) -> Result<N, ShadowTreeError> {
        self.nodes
            .remove(&id)
            .map(|n| n.node)
            .ok_or(ShadowTreeError::UnknownNode(id))
    }

    /// Drop every node, detached ones included; ids stay unused
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn snapshot(&self, root: ShadowId) -> Result<ShadowSnapshot<N>, ShadowTreeError> {
        let entry = self.entry(root)?;
        let children = self
            .children(root)
            .into_iter()
            .map(|child| self.snapshot(child))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ShadowSnapshot {
            id: root,
            node: entry.node,
            children,
        })
    }
}
