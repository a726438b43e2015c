#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use fieldwire_core::FieldPath;
use fieldwire_runtime::Resolver;
use serde_json::{Value, json};
use tracing::Level;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(Level::DEBUG)
        .try_init();
}

pub fn path(segments: &[&str]) -> FieldPath {
    FieldPath::from(segments)
}

/// Resolver reading `key_path` and rendering it as `"label:<value>"`.
///
/// The returned counter tracks invocations.
pub fn label_of(key_path: &'static [&'static str]) -> (Resolver, Rc<Cell<u32>>) {
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let resolver = Resolver::from_fn(move |args| {
        counter.set(counter.get() + 1);
        label(args.get(key_path))
    });
    (resolver, calls)
}

pub fn label(value: Option<Value>) -> Value {
    match value {
        Some(Value::String(s)) => json!(format!("label:{s}")),
        Some(other) => json!(format!("label:{other}")),
        None => json!("label:<none>"),
    }
}
