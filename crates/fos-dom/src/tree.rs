//! DOM Tree (arena-based allocation)
//!
//! Nodes live in a `Vec` and are never freed, so a `NodeId` stays valid
//! (and unique) for the lifetime of the tree. Structural and data mutations
//! are reported to registered observers as they happen.

use crate::observer::MutationObservers;
use crate::{
    DomError, DomResult, MutationObserverInit, MutationRecord, Node, NodeId, ObserverId,
};

/// Arena-based DOM tree
#[derive(Debug)]
pub struct DomTree {
    nodes: Vec<Node>,
    observers: MutationObservers,
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DomTree {
    /// Create a tree holding only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::document()],
            observers: MutationObservers::default(),
        }
    }

    /// Document node
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Number of nodes ever created, attached or not
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node(&self, id: NodeId) -> DomResult<&Node> {
        self.nodes.get(id.index()).ok_or(DomError::NotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> DomResult<&mut Node> {
        self.nodes.get_mut(id.index()).ok_or(DomError::NotFound(id))
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(Node::element(name))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(Node::text(text))
    }

    /// Create a detached comment node
    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(Node::comment(text))
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent.to_option())
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.first_child.to_option())
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.last_child.to_option())
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.prev_sibling.to_option())
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.next_sibling.to_option())
    }

    /// Iterate over children in order
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.first_child(id),
        }
    }

    /// Children collected into a vector
    pub fn child_nodes(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id).collect()
    }

    /// Inclusive ancestor test
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Lowercased tag name of an element
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.get(id)?.as_element().map(|e| e.name.as_str())
    }

    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get(id)?.as_element()?.attrs.get(name)
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.get_attribute(id, name).is_some()
    }

    pub fn attribute_names(&self, id: NodeId) -> Vec<&str> {
        match self.get(id).and_then(Node::as_element) {
            Some(element) => element.attrs.names().collect(),
            None => Vec::new(),
        }
    }

    /// Character data of a text or comment node
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.get(id)?.character_data()
    }

    // ------------------------------------------------------------------
    // Structural mutation
    // ------------------------------------------------------------------

    /// Append `child` to `parent`, detaching it from its old parent first
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` before `reference` (or append when `None`)
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<NodeId> {
        self.check_insert(parent, child)?;
        if let Some(reference) = reference {
            if self.node(reference)?.parent != parent {
                return Err(DomError::NotAChild { parent, child: reference });
            }
        }

        let reference = match reference {
            Some(r) if r == child => self.next_sibling(child),
            other => other,
        };

        if let Some(old_parent) = self.parent(child) {
            self.detach(old_parent, child)?;
        }
        self.attach(parent, child, reference)?;
        Ok(child)
    }

    /// Remove `child` from `parent`
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        self.node(parent)?;
        if self.node(child)?.parent != parent {
            return Err(DomError::NotAChild { parent, child });
        }
        self.detach(parent, child)?;
        Ok(child)
    }

    /// Detach a node from its parent, if it has one
    pub fn remove(&mut self, node: NodeId) -> DomResult<()> {
        if let Some(parent) = self.parent(node) {
            self.detach(parent, node)?;
        } else {
            self.node(node)?;
        }
        Ok(())
    }

    fn check_insert(&self, parent: NodeId, child: NodeId) -> DomResult<()> {
        let parent_node = self.node(parent)?;
        let child_node = self.node(child)?;
        if !parent_node.is_container()
            || matches!(child_node.data, crate::NodeData::Document)
            || self.contains(child, parent)
        {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        Ok(())
    }

    fn attach(&mut self, parent: NodeId, child: NodeId, before: Option<NodeId>) -> DomResult<()> {
        let prev = match before {
            Some(b) => self.node(b)?.prev_sibling,
            None => self.node(parent)?.last_child,
        };
        let next = before.unwrap_or(NodeId::NONE);

        {
            let node = self.node_mut(child)?;
            node.parent = parent;
            node.prev_sibling = prev;
            node.next_sibling = next;
        }
        if prev.is_valid() {
            self.node_mut(prev)?.next_sibling = child;
        } else {
            self.node_mut(parent)?.first_child = child;
        }
        if next.is_valid() {
            self.node_mut(next)?.prev_sibling = child;
        } else {
            self.node_mut(parent)?.last_child = child;
        }

        let record = MutationRecord::child_list(
            parent,
            vec![child],
            Vec::new(),
            prev.to_option(),
            next.to_option(),
        );
        self.notify(record);
        Ok(())
    }

    fn detach(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        let (prev, next) = {
            let node = self.node_mut(child)?;
            let links = (node.prev_sibling, node.next_sibling);
            node.parent = NodeId::NONE;
            node.prev_sibling = NodeId::NONE;
            node.next_sibling = NodeId::NONE;
            links
        };
        if prev.is_valid() {
            self.node_mut(prev)?.next_sibling = next;
        } else {
            self.node_mut(parent)?.first_child = next;
        }
        if next.is_valid() {
            self.node_mut(next)?.prev_sibling = prev;
        } else {
            self.node_mut(parent)?.last_child = prev;
        }

        let record = MutationRecord::child_list(
            parent,
            Vec::new(),
            vec![child],
            prev.to_option(),
            next.to_option(),
        );
        self.notify(record);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Data mutation
    // ------------------------------------------------------------------

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> DomResult<()> {
        let element = self
            .node_mut(id)?
            .as_element_mut()
            .ok_or(DomError::InvalidNodeType(id))?;
        let old_value = element.attrs.set(name, value);
        self.notify(MutationRecord::attributes(id, name, old_value));
        Ok(())
    }

    /// Remove an attribute; returns whether it was present
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> DomResult<bool> {
        let element = self
            .node_mut(id)?
            .as_element_mut()
            .ok_or(DomError::InvalidNodeType(id))?;
        match element.attrs.remove(name) {
            Some(old_value) => {
                self.notify(MutationRecord::attributes(id, name, Some(old_value)));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Replace the character data of a text or comment node
    pub fn set_text(&mut self, id: NodeId, text: &str) -> DomResult<()> {
        let data = self
            .node_mut(id)?
            .character_data_mut()
            .ok_or(DomError::InvalidNodeType(id))?;
        let old_value = std::mem::replace(data, text.to_string());
        self.notify(MutationRecord::character_data(id, old_value));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    /// Start observing mutations at `target`
    pub fn observe(&mut self, target: NodeId, options: MutationObserverInit) -> DomResult<ObserverId> {
        self.node(target)?;
        Ok(self.observers.register(target, options))
    }

    /// Drain the records queued for an observer
    pub fn take_records(&mut self, observer: ObserverId) -> Vec<MutationRecord> {
        self.observers.take_records(observer)
    }

    /// Stop an observer and drop its pending records
    pub fn disconnect(&mut self, observer: ObserverId) -> bool {
        self.observers.unregister(observer)
    }

    pub fn is_observing(&self, observer: ObserverId) -> bool {
        self.observers.is_registered(observer)
    }

    fn notify(&mut self, record: MutationRecord) {
        if self.observers.is_empty() {
            return;
        }
        let mut chain = Vec::new();
        let mut current = Some(record.target);
        while let Some(id) = current {
            chain.push(id);
            current = self.parent(id);
        }
        self.observers.notify(&record, &chain);
    }
}

/// Iterator over a node's children
pub struct Children<'a> {
    tree: &'a DomTree,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.next_sibling(current);
        Some(current)
    }
}
