//! fOS DOM adapter
//!
//! Plugs `fos_dom::DomTree` into the engine: the tree answers structure and
//! connectivity queries, and its native mutation observer is the raw source.

use fos_dom::{DomError, DomTree, MutationObserverInit, MutationRecord, MutationType, NodeId, ObserverId};

use crate::{MutationSource, ObserveOptions, ObservedTree, RawMutation, SetupError};

/// Native observer registration backing a summary observer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomSubscription(ObserverId);

impl DomSubscription {
    pub fn observer(&self) -> ObserverId {
        self.0
    }
}

impl ObservedTree for DomTree {
    type Node = NodeId;

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        DomTree::parent(self, node)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.child_nodes(node)
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.get_attribute(node, name)
    }

    fn text(&self, node: NodeId) -> Option<&str> {
        DomTree::text(self, node)
    }

    fn is_connected(&self, root: NodeId, node: NodeId) -> bool {
        self.contains(root, node)
    }
}

impl MutationSource for DomTree {
    type Subscription = DomSubscription;

    fn subscribe(
        &mut self,
        root: NodeId,
        options: &ObserveOptions,
    ) -> Result<DomSubscription, SetupError> {
        let init = MutationObserverInit {
            child_list: true,
            subtree: true,
            attributes: options.track_attributes,
            attribute_old_value: options.track_attributes,
            character_data: options.track_character_data,
            character_data_old_value: options.track_character_data,
            attribute_filter: None,
        };
        self.observe(root, init)
            .map(DomSubscription)
            .map_err(|err| match err {
                DomError::NotFound(_) => SetupError::UnknownTarget,
                other => SetupError::SourceUnavailable(other.to_string()),
            })
    }

    fn take_batch(&mut self, subscription: &DomSubscription) -> Vec<RawMutation<NodeId>> {
        self.take_records(subscription.0)
            .into_iter()
            .filter_map(to_raw)
            .collect()
    }

    fn unsubscribe(&mut self, subscription: DomSubscription) {
        self.disconnect(subscription.0);
    }
}

fn to_raw(record: MutationRecord) -> Option<RawMutation<NodeId>> {
    match record.mutation_type {
        MutationType::ChildList => Some(RawMutation::ChildList {
            parent: record.target,
            added: record.added_nodes,
            removed: record.removed_nodes,
        }),
        MutationType::Attributes => record.attribute_name.map(|name| RawMutation::Attribute {
            target: record.target,
            name,
            old_value: record.old_value,
        }),
        MutationType::CharacterData => Some(RawMutation::CharacterData {
            target: record.target,
            old_value: record.old_value.unwrap_or_default(),
        }),
    }
}
