#![warn(
    clippy::pedantic,
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    rust_2018_idioms,
    rust_2021_compatibility
)]
#![deny(rustdoc::broken_intra_doc_links)]

//! Welcome to `demitasse`, a library that decodes streams produced by the
//! [Java Object Serialization Protocol](https://docs.oracle.com/javase/8/docs/platform/serialization/spec/protocol.html)
//! into a JSON-friendly [`Value`] tree.
//!
//! Well-known container classes (`ArrayList`, `HashMap`, `HashSet`, `Date`,
//! `EnumMap`, …) are flattened into their natural JSON shapes instead of the
//! raw field soup Java writes for them.
//!
//! ```
//! use demitasse::{parse, Value};
//!
//! let bytes = b"\xac\xed\x00\x05\x74\x00\x0cHello, World";
//! let value = parse(bytes)?;
//! assert_eq!(value, Value::Str("Hello, World".into()));
//! # Ok::<(), demitasse::Error>(())
//! ```
//!
//! For streams that need non-default limits or time-zone handling, construct
//! a [`Parser`] and configure it before calling [`Parser::parse`].

pub mod serial;
pub mod value;

pub use serial::parsing::{parse, Error, Parser};
pub use value::{Object, Value};
