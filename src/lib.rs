// ============================================================================
// Exchange Core Library
// Concurrent multi-instrument exchange with price-time priority matching
// ============================================================================

//! # Exchange Core
//!
//! The core of a stock exchange: many submitters push limit orders for a
//! fixed universe of instruments through a single gate, and a background
//! matching thread continuously pairs crossed bids and asks into fills,
//! settling cash between the two participants on every pairing.
//!
//! ## Features
//!
//! - **Price-time priority books** per instrument and side, with
//!   amendment and cancellation by (participant, order) identity
//! - **One process-wide gate** serializing submit / amend / cancel and
//!   every matching step, so observers always see a serial history
//! - **Cash-safe settlement**: a participant's balance never goes
//!   negative, and a failed counter-leg reimburses the leg that already
//!   settled
//! - **Append-only audit logs** of accepted orders and executed fills
//!
//! ## Example
//!
//! ```rust
//! use exchange_core::prelude::*;
//! use rust_decimal::Decimal;
//! use std::sync::Arc;
//!
//! let exchange = Exchange::open(ExchangeConfig::default()).unwrap();
//! let buyer = Arc::new(Participant::new(Decimal::from(1200)));
//!
//! exchange
//!     .submit(&buyer, Order::new(Side::Buy, "GOOGL", Decimal::from(10), 10))
//!     .unwrap();
//!
//! let book = exchange.snapshot("GOOGL").unwrap();
//! assert!(book.liquidity);
//! assert_eq!(book.best_bid().unwrap().quantity, 10);
//!
//! exchange.close();
//! ```

pub mod domain;
pub mod engine;
pub mod error;

// Re-exports for convenience
pub mod prelude {
    pub use crate::domain::{
        BookEntry, BookPolicy, ExchangeConfig, FillRecord, InstrumentSlot, Order, OrderId,
        OrderRecord, Participant, PriorityBook, RestingOrder, Side, SlotSnapshot,
    };
    pub use crate::engine::Exchange;
    pub use crate::error::{ConfigError, ExchangeError, RejectReason};
}
