#![forbid(unsafe_code)]

//! Core: field paths, property snapshots, field-state trees, and the event bus.
//!
//! # Role in fieldwire
//! `fieldwire-core` is the data layer. It owns the vocabulary the reactive
//! engine (`fieldwire-runtime`) and form containers share: where a field
//! lives ([`FieldPath`]), what it currently holds ([`FieldProps`]), the
//! snapshot of every registered field ([`FieldTree`]), and the topic-keyed
//! [`EventBus`] on which registrations and property changes are published.
//!
//! # Primary responsibilities
//! - **FieldPath**: segment lists, dependency-map keys, event-name stems.
//! - **FieldTree**: immutable, cheaply clonable snapshots with `get_in` lookup.
//! - **EventBus**: registration-ordered delivery, one-shot listeners, RAII
//!   [`Subscription`] guards.

pub mod bus;
pub mod event;
pub mod path;
pub mod props;
pub mod tree;

pub use bus::{EventBus, Subscription};
pub use event::{FieldEvent, PropsChange, Topic};
pub use path::{FieldPath, camelize, split_key_path};
pub use props::{DEFAULT_VALUE_PROP, FieldProps, is_empty_value};
pub use tree::FieldTree;
