// ============================================================================
// Audit Records
// Append-only order-log and fill-log entries
// ============================================================================

use crate::domain::book::BookEntry;
use crate::domain::order::{OrderId, Side};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use uuid::Uuid;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One accepted submission, as appended to the order log.
///
/// Records carry identities and numbers only; the live participant and
/// order stay out of the log so the books remain the single owner of
/// mutable state.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrderRecord {
    pub participant: String,
    pub order_id: OrderId,
    pub side: Side,
    pub instrument: String,
    pub price: Decimal,
    pub quantity: u64,
    pub seq: u64,
    pub submitted_at: DateTime<Utc>,
}

impl OrderRecord {
    pub(crate) fn from_entry(entry: &BookEntry) -> Self {
        Self {
            participant: entry.participant.id().to_string(),
            order_id: entry.order.id(),
            side: entry.order.side(),
            instrument: entry.order.instrument().to_string(),
            price: entry.order.price(),
            quantity: entry.order.quantity(),
            seq: entry.seq,
            submitted_at: Utc::now(),
        }
    }
}

impl fmt::Display for OrderRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] trader {} {} {} {} @ ${} (order {}, seq {})",
            self.submitted_at.format("%Y-%m-%d %H:%M:%S%.6f"),
            self.participant,
            self.side,
            self.quantity,
            self.instrument,
            self.price,
            self.order_id,
            self.seq,
        )
    }
}

/// One executed pairing, covering both legs.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FillRecord {
    pub id: Uuid,
    pub instrument: String,
    pub buyer: String,
    pub seller: String,
    pub buy_order: OrderId,
    pub sell_order: OrderId,
    pub price: Decimal,
    pub quantity: u64,
    pub executed_at: DateTime<Utc>,
}

impl FillRecord {
    pub(crate) fn new(
        instrument: impl Into<String>,
        buy: &BookEntry,
        sell: &BookEntry,
        price: Decimal,
        quantity: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            instrument: instrument.into(),
            buyer: buy.participant.id().to_string(),
            seller: sell.participant.id().to_string(),
            buy_order: buy.order.id(),
            sell_order: sell.order.id(),
            price,
            quantity,
            executed_at: Utc::now(),
        }
    }

    /// Cash moved from buyer to seller by this fill.
    pub fn notional(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

impl fmt::Display for FillRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} @ ${}: buyer {} (order {}) <- seller {} (order {})",
            self.executed_at.format("%Y-%m-%d %H:%M:%S%.6f"),
            self.instrument,
            self.quantity,
            self.price,
            self.buyer,
            self.buy_order,
            self.seller,
            self.sell_order,
        )
    }
}
