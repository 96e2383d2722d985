//! Example: watch a small document and print each batch summary as JSON
//!
//! Run with `RUST_LOG=fos_mutation=debug` to see the engine's batch logs.

use std::cell::RefCell;
use std::rc::Rc;

use fos_dom::DomTree;
use fos_mutation::{ObserveOptions, SummaryObserver};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut dom = DomTree::new();
    let root = dom.root();
    let body = dom.create_element("body");
    let list = dom.create_element("ul");
    let first = dom.create_element("li");
    let second = dom.create_element("li");
    let label = dom.create_text("first");
    dom.append_child(root, body)?;
    dom.append_child(body, list)?;
    dom.append_child(list, first)?;
    dom.append_child(list, second)?;
    dom.append_child(first, label)?;
    dom.set_attribute(list, "class", "items")?;

    let summaries = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&summaries);
    let mut observer: SummaryObserver<DomTree, _> =
        SummaryObserver::new(move |summary| sink.borrow_mut().push(summary));
    observer.observe(&mut dom, root, ObserveOptions::default())?;

    // Batch 1: reorder, plus an attribute that ends where it started
    dom.insert_before(list, second, Some(first))?;
    dom.set_attribute(list, "class", "busy")?;
    dom.set_attribute(list, "class", "items")?;
    observer.deliver(&mut dom)?;

    // Batch 2: new item, edited text, removed item
    let third = dom.create_element("li");
    dom.append_child(list, third)?;
    dom.set_text(label, "renamed")?;
    dom.remove_child(list, second)?;
    observer.deliver(&mut dom)?;

    // Batch 3: nothing effectively changes
    dom.remove_child(list, third)?;
    dom.append_child(list, third)?;
    observer.deliver(&mut dom)?;

    for (batch, summary) in summaries.borrow().iter().enumerate() {
        println!("batch {}: {}", batch + 1, serde_json::to_string_pretty(summary)?);
    }

    observer.disconnect(&mut dom);
    Ok(())
}
