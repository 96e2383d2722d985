//! fOS Mutation Summaries
//!
//! Turns a DOM's raw per-event mutation records into one deduplicated
//! summary per batch: net additions, removals, moves, attribute diffs and
//! character-data diffs.
//!
//! The engine keeps a shadow mirror of the observed tree's child lists.
//! Each batch it re-walks only the parents whose child lists changed,
//! compares them against the mirror, and infers moves from remove/insert
//! pairs on the same node identity.
//!
//! # Example
//! ```rust,ignore
//! use fos_dom::DomTree;
//! use fos_mutation::{ObserveOptions, SummaryObserver};
//!
//! let mut dom = DomTree::new();
//! let mut observer = SummaryObserver::new(|summary| println!("{summary:?}"));
//! observer.observe(&mut dom, dom.root(), ObserveOptions::default())?;
//!
//! let div = dom.create_element("div");
//! dom.append_child(dom.root(), div)?;
//! observer.deliver(&mut dom)?;
//! ```

mod config;
mod dom;
mod engine;
mod error;
mod host;
mod identity;
mod observer;
mod shadow;
mod summary;
mod traverse;

pub use config::ObserveOptions;
pub use dom::DomSubscription;
pub use engine::Reconciler;
pub use error::{ReconcileError, SetupError, ShadowTreeError};
pub use host::{MutationSource, ObservedTree, RawMutation};
pub use identity::IdentityTagger;
pub use observer::SummaryObserver;
pub use shadow::{ShadowId, ShadowNode, ShadowSnapshot, ShadowTree};
pub use summary::{
    AttributeChange, CharacterDataChange, MutationSummary, NodeChange, PriorPosition,
    SummaryBuilder,
};
