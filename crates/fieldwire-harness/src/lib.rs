#![forbid(unsafe_code)]

//! Harness: an in-memory form container and fixtures for end-to-end tests.
//!
//! # Role in fieldwire
//! `fieldwire-runtime` talks to forms only through
//! [`FormHandle`](fieldwire_runtime::FormHandle). This crate supplies the
//! smallest container that honors that contract ([`MemoryForm`]) and a
//! [`FormFixture`] that wires it to an engine on a single-threaded
//! executor, so scenarios can be scripted step by step:
//!
//! ```ignore
//! let mut fx = FormFixture::new();
//! fx.register(FieldProps::new(["a"]).with("value", ""));
//! let bindings = fx.mount(&field);
//! fx.set(&FieldPath::from(["a"]), "value", "x");
//! fx.settle();
//! ```

pub mod fixture;
pub mod form;

pub use fixture::FormFixture;
pub use form::MemoryForm;
