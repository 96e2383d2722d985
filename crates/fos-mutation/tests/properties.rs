//! Property tests - random DOM edit sequences split into batches
//!
//! After every batch the shadow mirror must equal the live tree and the
//! delivered summary must be consistent with it.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use fos_dom::{DomTree, NodeId};
use fos_mutation::{MutationSummary, ObserveOptions, ShadowSnapshot, SummaryObserver};
use proptest::prelude::*;

type Summary = MutationSummary<NodeId>;
type Callback = Box<dyn FnMut(Summary)>;

#[derive(Debug, Clone)]
enum Edit {
    InsertElement { parent: usize, slot: usize },
    InsertText { parent: usize, slot: usize },
    Move { node: usize, parent: usize, slot: usize },
    Remove { node: usize },
    SetAttribute { node: usize, value: u8 },
    RemoveAttribute { node: usize },
    SetText { node: usize, value: u8 },
    Flush,
}

fn arb_edit() -> impl Strategy<Value = Edit> {
    let pick = 0..64usize;
    prop_oneof![
        3 => (pick.clone(), pick.clone())
            .prop_map(|(parent, slot)| Edit::InsertElement { parent, slot }),
        1 => (pick.clone(), pick.clone()).prop_map(|(parent, slot)| Edit::InsertText { parent, slot }),
        3 => (pick.clone(), pick.clone(), pick.clone())
            .prop_map(|(node, parent, slot)| Edit::Move { node, parent, slot }),
        2 => pick.clone().prop_map(|node| Edit::Remove { node }),
        1 => (pick.clone(), 0..3u8).prop_map(|(node, value)| Edit::SetAttribute { node, value }),
        1 => pick.clone().prop_map(|node| Edit::RemoveAttribute { node }),
        1 => (pick, 0..3u8).prop_map(|(node, value)| Edit::SetText { node, value }),
        1 => Just(Edit::Flush),
    ]
}

#[derive(Debug, PartialEq)]
struct Shape(NodeId, Vec<Shape>);

fn dom_shape(dom: &DomTree, node: NodeId) -> Shape {
    Shape(
        node,
        dom.child_nodes(node).into_iter().map(|c| dom_shape(dom, c)).collect(),
    )
}

fn shadow_shape(snapshot: &ShadowSnapshot<NodeId>) -> Shape {
    Shape(snapshot.node, snapshot.children.iter().map(shadow_shape).collect())
}

struct World {
    dom: DomTree,
    /// Every node ever created, root first
    pool: Vec<NodeId>,
    observer: SummaryObserver<DomTree, Callback>,
    log: Rc<RefCell<Vec<Summary>>>,
}

impl World {
    fn new() -> Self {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let callback: Callback = Box::new(move |summary| sink.borrow_mut().push(summary));
        let mut dom = DomTree::new();
        let root = dom.root();
        let mut observer = SummaryObserver::new(callback);
        observer.observe(&mut dom, root, ObserveOptions::default()).unwrap();
        Self {
            dom,
            pool: vec![root],
            observer,
            log,
        }
    }

    fn pick(&self, index: usize) -> NodeId {
        self.pool[index % self.pool.len()]
    }

    fn insert(&mut self, node: NodeId, parent: NodeId, slot: usize) -> bool {
        let children = self.dom.child_nodes(parent);
        let reference = children.get(slot % (children.len() + 1)).copied();
        self.dom.insert_before(parent, node, reference).is_ok()
    }

    fn apply(&mut self, edit: &Edit) -> Result<(), TestCaseError> {
        match *edit {
            Edit::InsertElement { parent, slot } => {
                let node = self.dom.create_element("e");
                self.pool.push(node);
                self.insert(node, self.pick(parent), slot);
            }
            Edit::InsertText { parent, slot } => {
                let node = self.dom.create_text("t");
                self.pool.push(node);
                self.insert(node, self.pick(parent), slot);
            }
            Edit::Move { node, parent, slot } => {
                let node = self.pick(node);
                if node != self.dom.root() {
                    self.insert(node, self.pick(parent), slot);
                }
            }
            Edit::Remove { node } => {
                let node = self.pick(node);
                if let Some(parent) = self.dom.parent(node) {
                    self.dom.remove_child(parent, node).unwrap();
                }
            }
            Edit::SetAttribute { node, value } => {
                let _ = self.dom.set_attribute(self.pick(node), "k", &value.to_string());
            }
            Edit::RemoveAttribute { node } => {
                let _ = self.dom.remove_attribute(self.pick(node), "k");
            }
            Edit::SetText { node, value } => {
                let _ = self.dom.set_text(self.pick(node), &format!("t{value}"));
            }
            Edit::Flush => self.flush_and_check()?,
        }
        Ok(())
    }

    fn flush_and_check(&mut self) -> Result<(), TestCaseError> {
        let called = self.observer.deliver(&mut self.dom).unwrap();
        let summary = self.log.borrow_mut().pop();
        prop_assert_eq!(called, summary.is_some());

        let root = self.dom.root();
        let snapshot = self.observer.shadow_snapshot().unwrap();
        prop_assert_eq!(shadow_shape(&snapshot), dom_shape(&self.dom, root));

        let Some(summary) = summary else {
            return Ok(());
        };
        prop_assert!(!summary.is_empty());

        let mut structural = HashSet::new();
        for change in summary.added.iter().chain(&summary.moved) {
            prop_assert!(self.dom.contains(root, change.node));
            prop_assert!(structural.insert(change.node), "duplicate entry for {}", change.node);
        }
        for change in &summary.removed {
            prop_assert!(!self.dom.contains(root, change.node));
            prop_assert!(change.prior_position.is_some());
            prop_assert!(structural.insert(change.node), "duplicate entry for {}", change.node);
        }

        let added: HashSet<NodeId> = summary.added.iter().map(|c| c.node).collect();
        let removed: HashSet<NodeId> = summary.removed.iter().map(|c| c.node).collect();
        for change in &summary.attributes {
            prop_assert!(!added.contains(&change.node) && !removed.contains(&change.node));
            prop_assert_eq!(
                change.all.len(),
                change.added.len() + change.removed.len() + change.changed.len()
            );
            for name in &change.all {
                let old = change.old_values.get(name).cloned().flatten();
                let now = self.dom.get_attribute(change.node, name).map(str::to_string);
                prop_assert_ne!(old, now);
            }
        }
        for change in &summary.character_data {
            prop_assert!(!added.contains(&change.node) && !removed.contains(&change.node));
            prop_assert_ne!(Some(change.old_value.as_str()), self.dom.text(change.node));
        }
        Ok(())
    }
}

proptest! {
    /// The mirror tracks the live tree across any batch split.
    #[test]
    fn mirror_follows_random_edits(edits in proptest::collection::vec(arb_edit(), 1..80)) {
        let mut world = World::new();
        for edit in &edits {
            world.apply(edit)?;
        }
        world.flush_and_check()?;
    }

    /// Moving a node away and back within one batch is silent.
    #[test]
    fn move_and_return_is_silent(
        edits in proptest::collection::vec(arb_edit(), 1..40),
        node in 0..64usize,
        parent in 0..64usize,
        slot in 0..64usize,
    ) {
        let mut world = World::new();
        for edit in &edits {
            world.apply(edit)?;
        }
        world.flush_and_check()?;

        let node = world.pick(node);
        let Some(origin) = world.dom.parent(node) else {
            return Ok(());
        };
        if !world.dom.contains(world.dom.root(), node) {
            return Ok(());
        }
        let next = world.dom.next_sibling(node);
        let target = world.pick(parent);
        world.insert(node, target, slot);
        world.dom.insert_before(origin, node, next).unwrap();

        let called = world.observer.deliver(&mut world.dom).unwrap();
        prop_assert!(!called);
    }
}
