// ============================================================================
// Priority Book
// Sorted resting orders for one side of one instrument, price-time priority
// ============================================================================

use crate::domain::config::BookPolicy;
use crate::domain::order::{Order, OrderId, Side};
use crate::domain::participant::Participant;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::sync::Arc;

/// A resting order: the account it belongs to, the order itself, and the
/// submission sequence assigned inside the submit critical section.
#[derive(Debug, Clone)]
pub struct BookEntry {
    pub participant: Arc<Participant>,
    pub order: Order,
    pub seq: u64,
}

impl BookEntry {
    pub fn new(participant: Arc<Participant>, order: Order, seq: u64) -> Self {
        Self {
            participant,
            order,
            seq,
        }
    }

    fn matches(&self, participant_id: &str, order_id: OrderId) -> bool {
        self.order.id() == order_id && self.participant.id() == participant_id
    }
}

/// One side of an instrument's book, kept sorted by price-time priority.
///
/// The head (index 0) is the best entry: highest price for a BUY book,
/// lowest for a SELL book, with ties broken by the earlier submission
/// sequence. Storage is a dense vector with an explicit logical capacity
/// that grows and shrinks by the configured policy, mirroring the sizes the
/// book would occupy under manual management.
#[derive(Debug)]
pub struct PriorityBook {
    side: Side,
    entries: Vec<BookEntry>,
    capacity: usize,
    policy: BookPolicy,
}

impl PriorityBook {
    pub fn new(side: Side, policy: BookPolicy) -> Self {
        Self {
            side,
            entries: Vec::with_capacity(policy.initial_capacity),
            capacity: policy.initial_capacity,
            policy,
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current logical capacity. Always >= `len`.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Resting entries in priority order, best first.
    pub fn entries(&self) -> &[BookEntry] {
        &self.entries
    }

    /// Insert at the sorted position, growing capacity first when the book
    /// is at or past the grow threshold.
    pub fn push(&mut self, entry: BookEntry) {
        if self.entries.len() as f64 >= self.policy.grow_threshold * self.capacity as f64 {
            self.grow();
        }
        let at = self
            .entries
            .partition_point(|resting| compare(self.side, resting, &entry) != Ordering::Greater);
        self.entries.insert(at, entry);
    }

    /// Best entry without removal.
    pub fn peek(&self) -> Option<&BookEntry> {
        self.entries.first()
    }

    /// Remove and return the best entry, shifting the rest toward the head.
    pub fn pop(&mut self) -> Option<BookEntry> {
        if self.entries.is_empty() {
            return None;
        }
        let head = self.entries.remove(0);
        self.maybe_shrink();
        Some(head)
    }

    /// Index of the entry owned by `participant_id` with `order_id`.
    pub fn locate(&self, participant_id: &str, order_id: OrderId) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.matches(participant_id, order_id))
    }

    /// Re-price an entry and restore the sort. Returns false when the
    /// target is absent (callers treat that as a no-op).
    pub fn amend_price(
        &mut self,
        participant_id: &str,
        order_id: OrderId,
        new_price: Decimal,
    ) -> bool {
        let Some(at) = self.locate(participant_id, order_id) else {
            return false;
        };
        self.entries[at].order.set_price(new_price);
        self.resort();
        true
    }

    /// Change an entry's remaining quantity in place. Quantity is not part
    /// of the sort key; the conservative rule re-sorts only when the
    /// quantity shrank.
    pub fn amend_quantity(
        &mut self,
        participant_id: &str,
        order_id: OrderId,
        new_quantity: u64,
    ) -> bool {
        let Some(at) = self.locate(participant_id, order_id) else {
            return false;
        };
        let shrank = new_quantity < self.entries[at].order.quantity();
        self.entries[at].order.set_quantity(new_quantity);
        if shrank {
            self.resort();
        }
        true
    }

    /// Remove an entry by identity: swap with the tail, shrink the live
    /// range, restore the sort.
    pub fn remove(&mut self, participant_id: &str, order_id: OrderId) -> Option<BookEntry> {
        let at = self.locate(participant_id, order_id)?;
        let entry = self.entries.swap_remove(at);
        self.resort();
        self.maybe_shrink();
        Some(entry)
    }

    /// Decrement the head's remaining quantity by `quantity`, returning
    /// what is left. The head stays in place; settlement pops it when the
    /// remainder reaches zero.
    pub(crate) fn fill_head(&mut self, quantity: u64) -> Option<u64> {
        let head = self.entries.first_mut()?;
        let left = head.order.quantity().saturating_sub(quantity);
        head.order.set_quantity(left);
        Some(left)
    }

    fn resort(&mut self) {
        let side = self.side;
        // Stable sort keeps FIFO among equal (price, seq) keys.
        self.entries.sort_by(|a, b| compare(side, a, b));
    }

    fn grow(&mut self) {
        let next = (self.capacity as f64 * self.policy.grow_factor).ceil() as usize;
        self.capacity = next.max(self.capacity + 1);
        self.entries.reserve(self.capacity - self.entries.len());
    }

    fn maybe_shrink(&mut self) {
        if self.entries.len() as f64 <= self.policy.shrink_threshold * self.capacity as f64 {
            let next = (self.capacity as f64 * self.policy.shrink_factor).floor() as usize;
            self.capacity = next.max(self.policy.initial_capacity);
            self.entries.shrink_to(self.capacity);
        }
    }
}

/// Price-time priority: better price first, then earlier submission.
fn compare(side: Side, a: &BookEntry, b: &BookEntry) -> Ordering {
    let by_price = match side {
        Side::Buy => b.order.price().cmp(&a.order.price()),
        Side::Sell => a.order.price().cmp(&b.order.price()),
    };
    by_price.then(a.seq.cmp(&b.seq))
}
