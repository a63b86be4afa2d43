//! Decoding of Java Object Serialization streams.
//!
//! The wire format is recursive and self-referential: every entity may be a
//! back-reference to an earlier one, and class descriptors drive how the
//! data that follows them is read. See the
//! [protocol specification](https://docs.oracle.com/javase/8/docs/platform/serialization/spec/protocol.html)
//! for the grammar.

pub(crate) mod descriptor;
pub(crate) mod handles;
pub mod parsing;
pub(crate) mod postproc;

/// Reserved key that holds an object's canonical projection. When a
/// normalizer sets it, the whole object shell is replaced by the stored
/// value at the dispatch boundary.
pub(crate) const OBJECT_VALUE_KEY: &str = "@@value@@";
