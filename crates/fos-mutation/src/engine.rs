//! Reconciliation Engine
//!
//! Owns the shadow mirror across batches. Each batch runs in four steps:
//!
//! 1. Classify raw events: cache earliest-old attribute and text values,
//!    mark nodes added to or removed from a parent as affected, and queue
//!    their old and new parents as roots to re-walk.
//! 2. Confirm removals against the live tree, capture prior positions, and
//!    detach confirmed-removed nodes from the mirror.
//! 3. Re-walk every queued root that is still connected, matching real
//!    children against shadow children left to right.
//! 4. Release confirmed-removed subtrees and diff cached attribute and text
//!    values against the live tree.
//!
//! A fault in any step poisons the engine. The mirror is no longer trusted
//! and every later batch is refused until a fresh engine is built.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::Debug;
use std::hash::Hash;

use indexmap::{IndexMap, IndexSet};

use crate::traverse::post_order;
use crate::{
    IdentityTagger, MutationSummary, ObserveOptions, ObservedTree, PriorPosition, RawMutation,
    ReconcileError, SetupError, ShadowId, ShadowSnapshot, ShadowTree, ShadowTreeError,
    SummaryBuilder,
};

/// Shadow-tree reconciliation engine for one observed root
#[derive(Debug)]
pub struct Reconciler<N> {
    root: N,
    options: ObserveOptions,
    shadow: ShadowTree<N>,
    tagger: IdentityTagger<N>,
    shadow_root: ShadowId,
    poisoned: bool,
}

/// Ephemeral state for one batch
struct BatchState<N> {
    /// Earliest-old attribute values per target, first write wins
    attributes: IndexMap<ShadowId, IndexMap<String, Option<String>>>,
    /// Earliest-old text per target, first write wins
    character_data: IndexMap<ShadowId, String>,
    affected: IndexSet<ShadowId>,
    roots: VecDeque<ShadowId>,
    queued: HashSet<ShadowId>,
    /// Shadow nodes detached mid-walk, awaiting their new position
    holding: HashSet<ShadowId>,
    prior_positions: HashMap<ShadowId, PriorPosition<N>>,
    removed: IndexSet<ShadowId>,
    added: HashSet<ShadowId>,
    released: HashSet<ShadowId>,
    builder: SummaryBuilder<N>,
}

impl<N> BatchState<N> {
    fn new() -> Self {
        Self {
            attributes: IndexMap::new(),
            character_data: IndexMap::new(),
            affected: IndexSet::new(),
            roots: VecDeque::new(),
            queued: HashSet::new(),
            holding: HashSet::new(),
            prior_positions: HashMap::new(),
            removed: IndexSet::new(),
            added: HashSet::new(),
            released: HashSet::new(),
            builder: SummaryBuilder::new(),
        }
    }

    fn queue_root(&mut self, id: ShadowId) {
        if self.queued.insert(id) {
            self.roots.push_back(id);
        }
    }

    /// Added or released this batch; value changes on it are noise
    fn is_settled(&self, id: ShadowId) -> bool {
        self.added.contains(&id) || self.released.contains(&id)
    }
}

impl<N: Copy + Eq + Hash + Debug> Reconciler<N> {
    /// Mirror the subtree at `root` as it stands now
    pub fn build<T>(tree: &T, root: N, options: ObserveOptions) -> Result<Self, SetupError>
    where
        T: ObservedTree<Node = N> + ?Sized,
    {
        let mut shadow = ShadowTree::new();
        let mut tagger = IdentityTagger::new();
        let shadow_root = shadow.create(root);
        tagger.tag(root, shadow_root);

        let mut stack: Vec<(N, ShadowId)> = tree
            .children(root)
            .into_iter()
            .rev()
            .map(|child| (child, shadow_root))
            .collect();
        while let Some((node, parent)) = stack.pop() {
            let id = shadow.create(node);
            tagger.tag(node, id);
            shadow.append_child(parent, id)?;
            stack.extend(tree.children(node).into_iter().rev().map(|child| (child, id)));
        }

        tracing::debug!("Mirrored {} nodes", shadow.len());
        Ok(Self {
            root,
            options,
            shadow,
            tagger,
            shadow_root,
            poisoned: false,
        })
    }

    pub fn root(&self) -> N {
        self.root
    }

    pub fn options(&self) -> ObserveOptions {
        self.options
    }

    /// Whether an earlier batch faulted
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Number of real nodes currently mirrored
    pub fn len(&self) -> usize {
        self.shadow.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shadow.is_empty()
    }

    pub fn shadow_id(&self, node: N) -> Option<ShadowId> {
        self.tagger.lookup(node)
    }

    pub fn shadow(&self) -> &ShadowTree<N> {
        &self.shadow
    }

    pub fn snapshot(&self) -> Result<ShadowSnapshot<N>, ShadowTreeError> {
        self.shadow.snapshot(self.shadow_root)
    }

    /// Reduce one batch of raw events to its net summary.
    ///
    /// The summary may be empty; callers decide whether to deliver it.
    pub fn reconcile<T>(
        &mut self,
        tree: &T,
        batch: Vec<RawMutation<N>>,
    ) -> Result<MutationSummary<N>, ReconcileError>
    where
        T: ObservedTree<Node = N> + ?Sized,
    {
        if self.poisoned {
            return Err(ReconcileError::Poisoned);
        }

        let events = batch.len();
        match self.run(tree, batch) {
            Ok(summary) => {
                tracing::debug!(
                    "Reconciled {} events: {} added, {} removed, {} moved, {} attributes, {} character data",
                    events,
                    summary.added.len(),
                    summary.removed.len(),
                    summary.moved.len(),
                    summary.attributes.len(),
                    summary.character_data.len()
                );
                Ok(summary)
            }
            Err(err) => {
                self.poisoned = true;
                tracing::error!("Mutation batch fault, mirror discarded: {}", err);
                Err(err)
            }
        }
    }

    /// Release the whole mirror, children before parents
    pub fn release_all(&mut self) -> usize {
        let order = post_order(self.shadow_root, |id| self.shadow.children(id));
        let mut released = 0;
        for id in order {
            if let Ok(node) = self.shadow.release(id) {
                self.tagger.untag(node);
                released += 1;
            }
        }
        // Nodes stranded off the root by an earlier fault
        self.shadow.clear();
        self.tagger.clear();
        released
    }

    fn run<T>(
        &mut self,
        tree: &T,
        batch: Vec<RawMutation<N>>,
    ) -> Result<MutationSummary<N>, ReconcileError>
    where
        T: ObservedTree<Node = N> + ?Sized,
    {
        let mut state = BatchState::new();
        self.classify(tree, &mut state, batch);
        self.confirm_removals(tree, &mut state)?;
        self.resync_roots(tree, &mut state)?;
        self.release_removed(&mut state)?;
        self.diff_values(tree, &mut state);
        Ok(state.builder.finish())
    }

    // ------------------------------------------------------------------
    // Classification
    // ------------------------------------------------------------------

    fn classify<T>(&self, tree: &T, state: &mut BatchState<N>, batch: Vec<RawMutation<N>>)
    where
        T: ObservedTree<Node = N> + ?Sized,
    {
        for mutation in batch {
            match mutation {
                RawMutation::Attribute {
                    target,
                    name,
                    old_value,
                } => {
                    if !self.options.track_attributes {
                        continue;
                    }
                    if let Some(id) = self.tagger.lookup(target) {
                        state
                            .attributes
                            .entry(id)
                            .or_default()
                            .entry(name)
                            .or_insert(old_value);
                    }
                }
                RawMutation::CharacterData { target, old_value } => {
                    if !self.options.track_character_data {
                        continue;
                    }
                    if let Some(id) = self.tagger.lookup(target) {
                        state.character_data.entry(id).or_insert(old_value);
                    }
                }
                RawMutation::ChildList { added, removed, .. } => {
                    for node in added.into_iter().chain(removed) {
                        self.mark_affected(tree, state, node);
                    }
                }
            }
        }
    }

    fn mark_affected<T>(&self, tree: &T, state: &mut BatchState<N>, node: N)
    where
        T: ObservedTree<Node = N> + ?Sized,
    {
        if let Some(id) = self.tagger.lookup(node) {
            state.affected.insert(id);
            if let Some(old_parent) = self.shadow.parent(id) {
                state.queue_root(old_parent);
            }
        }
        if let Some(new_parent) = tree.parent(node).and_then(|p| self.tagger.lookup(p)) {
            state.queue_root(new_parent);
        }
    }

    // ------------------------------------------------------------------
    // Removal confirmation
    // ------------------------------------------------------------------

    fn confirm_removals<T>(&mut self, tree: &T, state: &mut BatchState<N>) -> Result<(), ReconcileError>
    where
        T: ObservedTree<Node = N> + ?Sized,
    {
        for &id in &state.affected {
            let node = self.shadow.node(id)?;
            if !tree.is_connected(self.root, node) {
                state.removed.insert(id);
            }
        }

        // Positions are read before the mirror changes at all
        for &id in &state.affected {
            self.capture_position(&mut state.prior_positions, id)?;
        }
        for &id in &state.removed {
            for descendant in post_order(id, |n| self.shadow.children(n)) {
                self.capture_position(&mut state.prior_positions, descendant)?;
            }
        }

        for &id in &state.removed {
            if let Some(parent) = self.shadow.parent(id) {
                self.shadow.remove_child(parent, id)?;
            }
        }
        Ok(())
    }

    fn capture_position(
        &self,
        positions: &mut HashMap<ShadowId, PriorPosition<N>>,
        id: ShadowId,
    ) -> Result<(), ShadowTreeError> {
        if positions.contains_key(&id) {
            return Ok(());
        }
        let entry = self.shadow.get(id).ok_or(ShadowTreeError::UnknownNode(id))?;
        let Some(parent) = entry.parent() else {
            return Ok(());
        };
        let position = PriorPosition {
            parent: self.shadow.node(parent)?,
            previous_sibling: entry
                .previous_sibling()
                .map(|s| self.shadow.node(s))
                .transpose()?,
            next_sibling: entry.next_sibling().map(|s| self.shadow.node(s)).transpose()?,
        };
        positions.insert(id, position);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Root re-walk
    // ------------------------------------------------------------------

    fn resync_roots<T>(&mut self, tree: &T, state: &mut BatchState<N>) -> Result<(), ReconcileError>
    where
        T: ObservedTree<Node = N> + ?Sized,
    {
        while let Some(root) = state.roots.pop_front() {
            if state.removed.contains(&root) || !self.shadow.contains(root) {
                continue;
            }
            let node = self.shadow.node(root)?;
            if !tree.is_connected(self.root, node) {
                continue;
            }
            tracing::trace!("Re-walking shadow node {}", root);
            self.sync_children(tree, state, root)?;
        }

        if !state.holding.is_empty() {
            return Err(ReconcileError::Unclaimed(state.holding.len()));
        }
        Ok(())
    }

    fn sync_children<T>(
        &mut self,
        tree: &T,
        state: &mut BatchState<N>,
        parent: ShadowId,
    ) -> Result<(), ReconcileError>
    where
        T: ObservedTree<Node = N> + ?Sized,
    {
        let real_parent = self.shadow.node(parent)?;
        let real_children = tree.children(real_parent);
        let mut cursor = self.shadow.get(parent).and_then(|n| n.first_child());

        for (index, &child) in real_children.iter().enumerate() {
            loop {
                let Some(id) = self.tagger.lookup(child) else {
                    let id = self.shadow.create(child);
                    self.tagger.tag(child, id);
                    state.added.insert(id);
                    state.builder.record_added(child);
                    state.queue_root(id);
                    self.place(parent, id, cursor)?;
                    break;
                };

                if state.affected.contains(&id) {
                    if cursor == Some(id) {
                        cursor = self.shadow.next_sibling(id);
                    } else {
                        match self.shadow.parent(id) {
                            Some(old_parent) => self.shadow.remove_child(old_parent, id)?,
                            None if state.holding.remove(&id) => {}
                            None => return Err(ReconcileError::Orphaned(id)),
                        }
                        self.place(parent, id, cursor)?;
                    }

                    let prior = state
                        .prior_positions
                        .get(&id)
                        .copied()
                        .ok_or(ReconcileError::MissingPriorPosition(id))?;
                    let current = PriorPosition {
                        parent: real_parent,
                        previous_sibling: index.checked_sub(1).map(|i| real_children[i]),
                        next_sibling: real_children.get(index + 1).copied(),
                    };
                    if prior != current {
                        state.builder.record_moved(child, prior);
                    }
                    break;
                }

                let Some(shadow_child) = cursor else {
                    return Err(ReconcileError::MissingCounterpart { parent, index });
                };
                if state.affected.contains(&shadow_child) {
                    // Relocated elsewhere; stage it and retry this position
                    cursor = self.shadow.next_sibling(shadow_child);
                    self.shadow.remove_child(parent, shadow_child)?;
                    state.holding.insert(shadow_child);
                    tracing::trace!("Holding shadow node {}", shadow_child);
                    continue;
                }
                if shadow_child != id {
                    return Err(ReconcileError::Desynchronized {
                        parent,
                        index,
                        shadow: shadow_child,
                    });
                }
                cursor = self.shadow.next_sibling(id);
                break;
            }
        }

        // Anything left over must be on its way to another parent
        while let Some(shadow_child) = cursor {
            if !state.affected.contains(&shadow_child) {
                return Err(ReconcileError::Desynchronized {
                    parent,
                    index: real_children.len(),
                    shadow: shadow_child,
                });
            }
            cursor = self.shadow.next_sibling(shadow_child);
            self.shadow.remove_child(parent, shadow_child)?;
            state.holding.insert(shadow_child);
            tracing::trace!("Holding shadow node {}", shadow_child);
        }
        Ok(())
    }

    fn place(
        &mut self,
        parent: ShadowId,
        child: ShadowId,
        before: Option<ShadowId>,
    ) -> Result<(), ShadowTreeError> {
        match before {
            Some(reference) => self.shadow.insert_before(parent, child, reference),
            None => self.shadow.append_child(parent, child),
        }
    }

    // ------------------------------------------------------------------
    // Release and value diffs
    // ------------------------------------------------------------------

    fn release_removed(&mut self, state: &mut BatchState<N>) -> Result<(), ReconcileError> {
        let removed: Vec<ShadowId> = state.removed.iter().copied().collect();
        for root in removed {
            for id in post_order(root, |n| self.shadow.children(n)) {
                if state.released.contains(&id) {
                    continue;
                }
                let prior = state
                    .prior_positions
                    .get(&id)
                    .copied()
                    .ok_or(ReconcileError::MissingPriorPosition(id))?;
                let node = self.shadow.release(id)?;
                self.tagger.untag(node);
                state.released.insert(id);
                state.builder.record_removed(node, prior);
            }
        }
        Ok(())
    }

    fn diff_values<T>(&self, tree: &T, state: &mut BatchState<N>)
    where
        T: ObservedTree<Node = N> + ?Sized,
    {
        for (id, old_values) in std::mem::take(&mut state.attributes) {
            if state.is_settled(id) {
                continue;
            }
            let Ok(node) = self.shadow.node(id) else {
                continue;
            };
            state
                .builder
                .record_attributes(node, &old_values, move |name| tree.attribute(node, name));
        }

        for (id, old_value) in std::mem::take(&mut state.character_data) {
            if state.is_settled(id) {
                continue;
            }
            let Ok(node) = self.shadow.node(id) else {
                continue;
            };
            state
                .builder
                .record_character_data(node, old_value, tree.text(node));
        }
    }
}
