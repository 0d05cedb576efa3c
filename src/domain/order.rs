// ============================================================================
// Order Domain Model
// ============================================================================

use crate::error::ExchangeError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ============================================================================
// Value Objects
// ============================================================================

/// Process-wide order identity. Monotonic and unique within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrderId(u64);

static NEXT_ORDER_ID: AtomicU64 = AtomicU64::new(1);

impl OrderId {
    /// Draw the next identity from the process-wide counter.
    pub fn next() -> Self {
        Self(NEXT_ORDER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }

    pub fn opposite(&self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl FromStr for Side {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            other => Err(ExchangeError::InvalidSide(other.to_string())),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Order Entity
// ============================================================================

/// A limit order.
///
/// Identity, side, and instrument are fixed at creation; only the limit
/// price and the remaining quantity change while the order rests in a book,
/// and only through the crate-internal setters used by the exchange core and
/// the matching engine.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Order {
    id: OrderId,
    side: Side,
    instrument: String,
    price: Decimal,
    quantity: u64,
    created_at: DateTime<Utc>,
}

impl Order {
    /// Create an order ready for submission.
    ///
    /// `price` must be non-negative and `quantity` positive; both are the
    /// submitter's responsibility (the submit gate validates the instrument,
    /// not the numbers).
    pub fn new(side: Side, instrument: impl Into<String>, price: Decimal, quantity: u64) -> Self {
        debug_assert!(price >= Decimal::ZERO, "limit price must be non-negative");
        debug_assert!(quantity > 0, "order quantity must be positive");
        Self {
            id: OrderId::next(),
            side,
            instrument: instrument.into(),
            price,
            quantity,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    /// Remaining (unfilled) quantity. Zero exactly when fully filled.
    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Notional value of the remaining quantity at the limit price.
    pub fn notional(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }

    pub(crate) fn set_price(&mut self, price: Decimal) {
        self.price = price;
    }

    pub(crate) fn set_quantity(&mut self, quantity: u64) {
        self.quantity = quantity;
    }
}
