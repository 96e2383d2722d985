//! DOM Mutation Observers
//!
//! Native per-event mutation records. Each registration queues the records
//! whose target falls inside its observed scope until they are taken.

use std::collections::HashSet;

use crate::NodeId;

/// Handle for a registered mutation observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u32);

/// Mutation observer options
#[derive(Debug, Clone, Default)]
pub struct MutationObserverInit {
    pub child_list: bool,
    pub attributes: bool,
    pub character_data: bool,
    pub subtree: bool,
    pub attribute_old_value: bool,
    pub character_data_old_value: bool,
    pub attribute_filter: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationType {
    Attributes,
    CharacterData,
    ChildList,
}

/// Mutation record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub mutation_type: MutationType,
    pub target: NodeId,
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
    pub previous_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    pub attribute_name: Option<String>,
    pub old_value: Option<String>,
}

impl MutationRecord {
    pub(crate) fn child_list(
        target: NodeId,
        added_nodes: Vec<NodeId>,
        removed_nodes: Vec<NodeId>,
        previous_sibling: Option<NodeId>,
        next_sibling: Option<NodeId>,
    ) -> Self {
        Self {
            mutation_type: MutationType::ChildList,
            target,
            added_nodes,
            removed_nodes,
            previous_sibling,
            next_sibling,
            attribute_name: None,
            old_value: None,
        }
    }

    pub(crate) fn attributes(target: NodeId, name: &str, old_value: Option<String>) -> Self {
        Self {
            mutation_type: MutationType::Attributes,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            previous_sibling: None,
            next_sibling: None,
            attribute_name: Some(name.to_string()),
            old_value,
        }
    }

    pub(crate) fn character_data(target: NodeId, old_value: String) -> Self {
        Self {
            mutation_type: MutationType::CharacterData,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            previous_sibling: None,
            next_sibling: None,
            attribute_name: None,
            old_value: Some(old_value),
        }
    }
}

#[derive(Debug)]
struct Registration {
    id: ObserverId,
    target: NodeId,
    options: MutationObserverInit,
    records: Vec<MutationRecord>,
    /// Nodes removed from the observed subtree since the last take.
    transient: HashSet<NodeId>,
}

impl Registration {
    /// `chain` is the target followed by its ancestors, nearest first.
    fn in_scope(&self, chain: &[NodeId]) -> bool {
        for (depth, node) in chain.iter().enumerate() {
            if *node == self.target {
                return depth == 0 || self.options.subtree;
            }
            if self.transient.contains(node) {
                return true;
            }
        }
        false
    }

    fn wants(&self, record: &MutationRecord) -> bool {
        match record.mutation_type {
            MutationType::ChildList => self.options.child_list,
            MutationType::CharacterData => self.options.character_data,
            MutationType::Attributes => {
                if !self.options.attributes {
                    return false;
                }
                match (&self.options.attribute_filter, &record.attribute_name) {
                    (Some(filter), Some(name)) => filter.iter().any(|f| f == name),
                    _ => true,
                }
            }
        }
    }

    fn queue(&mut self, record: &MutationRecord) {
        let mut record = record.clone();
        let keep_old_value = match record.mutation_type {
            MutationType::Attributes => self.options.attribute_old_value,
            MutationType::CharacterData => self.options.character_data_old_value,
            MutationType::ChildList => true,
        };
        if !keep_old_value {
            record.old_value = None;
        }
        if self.options.subtree {
            self.transient.extend(record.removed_nodes.iter().copied());
        }
        self.records.push(record);
    }
}

/// Registry of the observers attached to one tree
#[derive(Debug, Default)]
pub(crate) struct MutationObservers {
    registrations: Vec<Registration>,
    next_id: u32,
}

impl MutationObservers {
    pub fn register(&mut self, target: NodeId, options: MutationObserverInit) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        tracing::trace!(?id, %target, "registered mutation observer");
        self.registrations.push(Registration {
            id,
            target,
            options,
            records: Vec::new(),
            transient: HashSet::new(),
        });
        id
    }

    pub fn unregister(&mut self, id: ObserverId) -> bool {
        let before = self.registrations.len();
        self.registrations.retain(|r| r.id != id);
        before != self.registrations.len()
    }

    pub fn is_registered(&self, id: ObserverId) -> bool {
        self.registrations.iter().any(|r| r.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Take pending records; transient scope ends with the batch.
    pub fn take_records(&mut self, id: ObserverId) -> Vec<MutationRecord> {
        match self.registrations.iter_mut().find(|r| r.id == id) {
            Some(registration) => {
                registration.transient.clear();
                std::mem::take(&mut registration.records)
            }
            None => Vec::new(),
        }
    }

    /// Queue `record` for every observer whose scope covers `chain`.
    pub fn notify(&mut self, record: &MutationRecord, chain: &[NodeId]) {
        for registration in &mut self.registrations {
            if registration.wants(record) && registration.in_scope(chain) {
                registration.queue(record);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subtree_init() -> MutationObserverInit {
        MutationObserverInit {
            child_list: true,
            attributes: true,
            character_data: true,
            subtree: true,
            attribute_old_value: true,
            character_data_old_value: true,
            attribute_filter: None,
        }
    }

    #[test]
    fn test_scope_follows_subtree_option() {
        let mut observers = MutationObservers::default();
        let shallow = observers.register(NodeId(1), MutationObserverInit {
            child_list: true,
            ..Default::default()
        });
        let deep = observers.register(NodeId(1), subtree_init());

        let record = MutationRecord::child_list(NodeId(2), vec![NodeId(3)], Vec::new(), None, None);
        observers.notify(&record, &[NodeId(2), NodeId(1), NodeId(0)]);

        assert!(observers.take_records(shallow).is_empty());
        assert_eq!(observers.take_records(deep).len(), 1);
    }

    #[test]
    fn test_removed_nodes_stay_observed_until_take() {
        let mut observers = MutationObservers::default();
        let id = observers.register(NodeId(1), subtree_init());

        let removal = MutationRecord::child_list(NodeId(1), Vec::new(), vec![NodeId(2)], None, None);
        observers.notify(&removal, &[NodeId(1), NodeId(0)]);

        // NodeId(2) is detached now, its chain no longer reaches the target
        let attr = MutationRecord::attributes(NodeId(2), "class", None);
        observers.notify(&attr, &[NodeId(2)]);
        assert_eq!(observers.take_records(id).len(), 2);

        observers.notify(&attr, &[NodeId(2)]);
        assert!(observers.take_records(id).is_empty());
    }

    #[test]
    fn test_old_value_and_filter() {
        let mut observers = MutationObservers::default();
        let id = observers.register(NodeId(1), MutationObserverInit {
            attributes: true,
            attribute_filter: Some(vec!["class".to_string()]),
            ..Default::default()
        });

        observers.notify(&MutationRecord::attributes(NodeId(1), "class", Some("a".into())), &[NodeId(1)]);
        observers.notify(&MutationRecord::attributes(NodeId(1), "id", Some("b".into())), &[NodeId(1)]);

        let records = observers.take_records(id);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].old_value, None);
    }

    #[test]
    fn test_unregister() {
        let mut observers = MutationObservers::default();
        let id = observers.register(NodeId(1), subtree_init());
        assert!(observers.is_registered(id));
        assert!(observers.unregister(id));
        assert!(!observers.unregister(id));
        assert!(observers.is_empty());
    }
}
