//! Reflection Guard
//!
//! Reflecting a property writes an attribute, and an attribute change writes
//! the property back. While one direction is being applied the host records
//! the property as "reflecting" so the other direction ignores it. The slot
//! holds at most one name; reflection is synchronous and single-threaded, so
//! two properties are never mid-reflection at once.

use std::cell::RefCell;

/// Marks a property as reflecting until dropped.
pub(crate) struct ReflectionGuard<'a> {
    slot: &'a RefCell<Option<String>>,
    previous: Option<String>,
}

impl<'a> ReflectionGuard<'a> {
    pub(crate) fn enter(slot: &'a RefCell<Option<String>>, name: &str) -> Self {
        let previous = slot.replace(Some(name.to_string()));
        Self { slot, previous }
    }
}

impl Drop for ReflectionGuard<'_> {
    fn drop(&mut self) {
        self.slot.replace(self.previous.take());
    }
}

/// Whether `name` is the property currently reflecting.
pub(crate) fn is_reflecting(slot: &RefCell<Option<String>>, name: &str) -> bool {
    slot.borrow().as_deref() == Some(name)
}
