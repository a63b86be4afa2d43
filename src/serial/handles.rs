//! The back-reference handle table.
//!
//! Every String, LongString, ClassDesc, Class, Array, Enum, and Object in
//! the stream claims exactly one slot, in order of first appearance.
//! Container entities reserve their slot *before* their children are
//! decoded, so a child holding a back-reference to the container observes a
//! pending slot and resolves to the cycle sentinel instead of recursing.

use super::descriptor::ClassDescRef;
use crate::value::Value;

/// One slot of the table.
#[derive(Debug)]
pub(crate) enum Slot {
    /// Reserved while the entity is still being constructed.
    Pending,
    Value(Value),
    Class(ClassDescRef),
}

/// Append-only registry of previously decoded entities.
#[derive(Debug, Default)]
pub(crate) struct HandleTable {
    slots: Vec<Slot>,
}

impl HandleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a finished value and passes it back through.
    pub fn push_value(&mut self, value: Value) -> Value {
        self.slots.push(Slot::Value(value.clone()));
        value
    }

    /// Registers a class descriptor and returns its slot index.
    pub fn push_class(&mut self, cls: ClassDescRef) -> usize {
        let index = self.slots.len();
        self.slots.push(Slot::Class(cls));
        index
    }

    /// Reserves a slot for an entity under construction. The returned handle
    /// must be committed exactly once.
    #[must_use]
    pub fn reserve(&mut self) -> DeferredHandle {
        let index = self.slots.len();
        self.slots.push(Slot::Pending);
        DeferredHandle { index }
    }

    pub fn get(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }
}

/// A single-shot setter for a reserved slot.
#[derive(Debug)]
pub(crate) struct DeferredHandle {
    index: usize,
}

impl DeferredHandle {
    /// Writes the finished value into the reserved slot and passes it back.
    pub fn commit(self, table: &mut HandleTable, value: Value) -> Value {
        table.slots[self.index] = Slot::Value(value.clone());
        value
    }
}
