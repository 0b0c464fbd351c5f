//! Event Queue - growable circular buffer of pending events
//!
//! Events are posted at the tail cursor and drained from the head cursor.
//! The backing store starts small and doubles when a post would overflow
//! it. A resize must preserve the logical order of whatever is pending,
//! which has exactly one delicate case: when the live region has wrapped
//! around the end of the array, the wrapped tail segment is relocated to
//! the end of the grown array before the cursors are trusted again.

use crate::event::Event;
use crate::EventKind;

/// Capacity of a freshly created queue.
const INITIAL_CAPACITY: usize = 4;

/// Growable circular buffer with FIFO posting/draining.
pub(crate) struct EventQueue {
    slots: Vec<Option<Event>>,
    /// Next drain position.
    head: usize,
    /// Next post position.
    tail: usize,
    count: usize,
}

impl EventQueue {
    pub(crate) fn new() -> Self {
        let mut slots = Vec::new();
        slots.resize_with(INITIAL_CAPACITY, || None);
        Self { slots, head: 0, tail: 0, count: 0 }
    }

    /// Number of pending events.
    pub(crate) fn len(&self) -> usize {
        self.count
    }

    #[cfg(test)]
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Append an event at the tail, growing the buffer if needed.
    pub(crate) fn push(&mut self, event: Event) {
        let new_count = self.count + 1;
        if new_count > self.slots.len() {
            self.grow();
        }

        self.count = new_count;
        self.slots[self.tail] = Some(event);
        self.tail = (self.tail + 1) % self.slots.len();
    }

    /// Double the backing store, keeping the pending region in logical order.
    ///
    /// Runs before the cursors are advanced for the in-flight post, so
    /// `self.count` is still the number of already-stored events.
    fn grow(&mut self) {
        let old_len = self.slots.len();
        self.slots.resize_with(old_len * 2, || None);

        if self.count > 0 && self.tail == 0 {
            // The tail had wrapped exactly to zero: the pending region ends
            // at old_len - 1, so posting simply continues into the new half.
            self.tail = old_len;
        } else if self.count > 0 && self.head >= self.tail {
            // Wrapped region: [head, old_len) logically precedes [0, tail).
            // Relocate the head segment to the end of the grown array.
            let move_len = old_len - self.head;
            let new_head = self.slots.len() - move_len;
            for offset in 0..move_len {
                self.slots[new_head + offset] = self.slots[self.head + offset].take();
            }
            self.head = new_head;
        }
    }

    /// Remove and return the head event, or `None` when empty.
    pub(crate) fn pop(&mut self) -> Option<Event> {
        if self.count == 0 {
            return None;
        }

        let event = self.slots[self.head].take();
        self.head = (self.head + 1) % self.slots.len();
        self.count -= 1;
        event
    }

    /// Type of the head event without removing it, or `None` when empty.
    pub(crate) fn peek_kind(&self) -> Option<EventKind> {
        if self.count == 0 {
            return None;
        }
        self.slots[self.head].as_ref().map(Event::kind)
    }

    /// Drain and destroy everything that is still pending.
    pub(crate) fn clear(&mut self) {
        while self.pop().is_some() {}
    }
}

// =============================================================================
// TESTS
// =============================================================================
