// ============================================================================
// Instrument Slot & Instrument Table
// One bid book and one ask book per recognized symbol, fixed at open
// ============================================================================

use crate::domain::book::PriorityBook;
use crate::domain::config::BookPolicy;
use crate::domain::order::{OrderId, Side};
use rust_decimal::Decimal;
use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Both books for one instrument plus the cached liquidity flag.
#[derive(Debug)]
pub struct InstrumentSlot {
    symbol: String,
    pub(crate) bids: PriorityBook,
    pub(crate) asks: PriorityBook,
    active: bool,
}

impl InstrumentSlot {
    pub fn new(symbol: impl Into<String>, policy: BookPolicy) -> Self {
        Self {
            symbol: symbol.into(),
            bids: PriorityBook::new(Side::Buy, policy),
            asks: PriorityBook::new(Side::Sell, policy),
            active: false,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// True whenever at least one of the two books is non-empty.
    pub fn has_liquidity(&self) -> bool {
        self.active
    }

    pub fn bids(&self) -> &PriorityBook {
        &self.bids
    }

    pub fn asks(&self) -> &PriorityBook {
        &self.asks
    }

    pub(crate) fn book_mut(&mut self, side: Side) -> &mut PriorityBook {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    pub(crate) fn mark_active(&mut self) {
        self.active = true;
    }

    /// Restore the flag invariant after any mutation of either book.
    pub(crate) fn refresh_liquidity(&mut self) {
        self.active = !self.bids.is_empty() || !self.asks.is_empty();
    }

    /// Immutable copy of the slot for observers.
    pub fn snapshot(&self) -> SlotSnapshot {
        let view = |book: &PriorityBook| -> Vec<RestingOrder> {
            book.entries()
                .iter()
                .map(|entry| RestingOrder {
                    participant: entry.participant.id().to_string(),
                    order_id: entry.order.id(),
                    price: entry.order.price(),
                    quantity: entry.order.quantity(),
                    seq: entry.seq,
                })
                .collect()
        };
        SlotSnapshot {
            instrument: self.symbol.clone(),
            liquidity: self.active,
            bids: view(&self.bids),
            asks: view(&self.asks),
        }
    }
}

/// One resting order as seen from outside the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RestingOrder {
    pub participant: String,
    pub order_id: OrderId,
    pub price: Decimal,
    pub quantity: u64,
    pub seq: u64,
}

/// Point-in-time view of one instrument's books, best entries first.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SlotSnapshot {
    pub instrument: String,
    pub liquidity: bool,
    pub bids: Vec<RestingOrder>,
    pub asks: Vec<RestingOrder>,
}

impl SlotSnapshot {
    pub fn best_bid(&self) -> Option<&RestingOrder> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&RestingOrder> {
        self.asks.first()
    }
}

// ============================================================================
// Instrument Table
// ============================================================================

/// Fixed mapping from recognized symbols to slots, built once at open.
///
/// Slots live in a dense vector; the symbol index gives the constant-time
/// dispatch the gate relies on. The table is never resized after open.
#[derive(Debug)]
pub struct InstrumentTable {
    slots: Vec<InstrumentSlot>,
    index: HashMap<String, usize>,
}

impl InstrumentTable {
    pub fn new(universe: &[String], policy: BookPolicy) -> Self {
        let slots: Vec<InstrumentSlot> = universe
            .iter()
            .map(|symbol| InstrumentSlot::new(symbol.clone(), policy))
            .collect();
        let index = universe
            .iter()
            .enumerate()
            .map(|(at, symbol)| (symbol.clone(), at))
            .collect();
        Self { slots, index }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Dispatch index for a symbol; `None` rejects unknown instruments.
    pub fn index_of(&self, symbol: &str) -> Option<usize> {
        self.index.get(symbol).copied()
    }

    pub fn slot(&self, at: usize) -> &InstrumentSlot {
        &self.slots[at]
    }

    pub(crate) fn slot_mut(&mut self, at: usize) -> &mut InstrumentSlot {
        &mut self.slots[at]
    }

    pub fn slots(&self) -> impl Iterator<Item = &InstrumentSlot> {
        self.slots.iter()
    }

    pub(crate) fn slots_mut(&mut self) -> impl Iterator<Item = &mut InstrumentSlot> {
        self.slots.iter_mut()
    }
}
