//! Mutation Summaries
//!
//! `SummaryBuilder` accumulates the net entries of one batch and `finish`
//! hands out the immutable `MutationSummary` delivered to the consumer.

use indexmap::IndexMap;
use serde::Serialize;

/// Where a node stood immediately before the batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriorPosition<N> {
    pub parent: N,
    pub previous_sibling: Option<N>,
    pub next_sibling: Option<N>,
}

/// Structural entry; `prior_position` is `None` for additions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeChange<N> {
    pub node: N,
    pub prior_position: Option<PriorPosition<N>>,
}

/// Net attribute changes on one element
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeChange<N> {
    pub node: N,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub changed: Vec<String>,
    /// Union of `added`, `removed` and `changed` in first-observation order
    pub all: Vec<String>,
    /// Earliest value in the batch for every name in `all`; `None` if the
    /// attribute did not exist before the batch
    pub old_values: IndexMap<String, Option<String>>,
}

/// Net character-data change on one text or comment node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharacterDataChange<N> {
    pub node: N,
    pub old_value: String,
}

/// Everything that effectively changed in one batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationSummary<N> {
    pub added: Vec<NodeChange<N>>,
    pub removed: Vec<NodeChange<N>>,
    pub moved: Vec<NodeChange<N>>,
    pub attributes: Vec<AttributeChange<N>>,
    pub character_data: Vec<CharacterDataChange<N>>,
}

impl<N> Default for MutationSummary<N> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            removed: Vec::new(),
            moved: Vec::new(),
            attributes: Vec::new(),
            character_data: Vec::new(),
        }
    }
}

impl<N> MutationSummary<N> {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total entries across all five categories
    pub fn len(&self) -> usize {
        self.added.len()
            + self.removed.len()
            + self.moved.len()
            + self.attributes.len()
            + self.character_data.len()
    }
}

/// Per-batch accumulator
#[derive(Debug)]
pub struct SummaryBuilder<N> {
    summary: MutationSummary<N>,
}

impl<N> Default for SummaryBuilder<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N> SummaryBuilder<N> {
    pub fn new() -> Self {
        Self {
            summary: MutationSummary::default(),
        }
    }

    pub fn record_added(&mut self, node: N) {
        self.summary.added.push(NodeChange {
            node,
            prior_position: None,
        });
    }

    pub fn record_removed(&mut self, node: N, prior: PriorPosition<N>) {
        self.summary.removed.push(NodeChange {
            node,
            prior_position: Some(prior),
        });
    }

    pub fn record_moved(&mut self, node: N, prior: PriorPosition<N>) {
        self.summary.moved.push(NodeChange {
            node,
            prior_position: Some(prior),
        });
    }

    /// Diff earliest-old attribute values against their current values.
    ///
    /// Names whose value ends where it started are dropped; no entry is
    /// recorded if nothing is left.
    pub fn record_attributes<'t>(
        &mut self,
        node: N,
        old_values: &IndexMap<String, Option<String>>,
        current: impl Fn(&str) -> Option<&'t str>,
    ) {
        let mut added = Vec::new();
        let mut removed = Vec::new();
        let mut changed = Vec::new();
        let mut all = Vec::new();
        let mut kept = IndexMap::new();

        for (name, old) in old_values {
            match (old.as_deref(), current(name)) {
                (None, Some(_)) => added.push(name.clone()),
                (Some(_), None) => removed.push(name.clone()),
                (Some(before), Some(now)) if before != now => changed.push(name.clone()),
                _ => continue,
            }
            all.push(name.clone());
            kept.insert(name.clone(), old.clone());
        }

        if all.is_empty() {
            return;
        }
        self.summary.attributes.push(AttributeChange {
            node,
            added,
            removed,
            changed,
            all,
            old_values: kept,
        });
    }

    /// Record a text change unless the text is back to `old_value`
    pub fn record_character_data(&mut self, node: N, old_value: String, current: Option<&str>) {
        if current == Some(old_value.as_str()) {
            return;
        }
        self.summary.character_data.push(CharacterDataChange { node, old_value });
    }

    pub fn finish(self) -> MutationSummary<N> {
        self.summary
    }
}
