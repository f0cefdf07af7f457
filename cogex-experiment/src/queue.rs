use std::cmp::Ordering;
use std::collections::BinaryHeap;

use cogex_core::AtomicEvent;

/// Heap slot ordered by onset, then by push order
struct Slot<H> {
    onset_ms: u64,
    seq: u64,
    event: AtomicEvent<H>,
}

impl<H> PartialEq for Slot<H> {
    fn eq(&self, other: &Self) -> bool {
        self.onset_ms == other.onset_ms && self.seq == other.seq
    }
}

impl<H> Eq for Slot<H> {}

impl<H> PartialOrd for Slot<H> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<H> Ord for Slot<H> {
    // reversed: BinaryHeap is a max-heap
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .onset_ms
            .cmp(&self.onset_ms)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Pending events of a session, popped in onset order. Events sharing an
/// onset come out in the order they were pushed.
pub struct EventQueue<H> {
    heap: BinaryHeap<Slot<H>>,
    next_seq: u64,
}

impl<H> EventQueue<H> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    pub fn push(&mut self, event: AtomicEvent<H>) {
        let slot = Slot {
            onset_ms: event.onset_ms,
            seq: self.next_seq,
            event,
        };
        self.next_seq += 1;
        self.heap.push(slot);
    }

    pub fn pop_min(&mut self) -> Option<AtomicEvent<H>> {
        self.heap.pop().map(|slot| slot.event)
    }

    pub fn peek_onset(&self) -> Option<u64> {
        self.heap.peek().map(|slot| slot.onset_ms)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Empties the queue in dispatch order
    pub fn drain_ordered(&mut self) -> impl Iterator<Item = AtomicEvent<H>> + '_ {
        std::iter::from_fn(move || self.pop_min())
    }
}

impl<H> Default for EventQueue<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> FromIterator<AtomicEvent<H>> for EventQueue<H> {
    fn from_iter<I: IntoIterator<Item = AtomicEvent<H>>>(iter: I) -> Self {
        let mut queue = EventQueue::new();
        queue.extend(iter);
        queue
    }
}

impl<H> Extend<AtomicEvent<H>> for EventQueue<H> {
    fn extend<I: IntoIterator<Item = AtomicEvent<H>>>(&mut self, iter: I) {
        for event in iter {
            self.push(event);
        }
    }
}
