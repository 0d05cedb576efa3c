// ============================================================================
// Exchange Core
// Owns the instrument table, the submission gate, the audit logs, and the
// matching thread's lifecycle
// ============================================================================

use crate::domain::audit::{FillRecord, OrderRecord};
use crate::domain::book::BookEntry;
use crate::domain::config::ExchangeConfig;
use crate::domain::order::{Order, OrderId, Side};
use crate::domain::participant::Participant;
use crate::domain::slot::{InstrumentTable, SlotSnapshot};
use crate::engine::matching;
use crate::error::{ConfigError, ExchangeError};
use parking_lot::{Condvar, Mutex};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Everything guarded by the process-wide gate: the instrument table (and
/// through it every book and resting order), the append-only audit logs,
/// and the submission-sequence counter.
pub(crate) struct Inner {
    pub(crate) table: InstrumentTable,
    pub(crate) order_log: Vec<OrderRecord>,
    pub(crate) fill_log: Vec<FillRecord>,
    pub(crate) next_seq: u64,
}

impl Inner {
    pub(crate) fn new(table: InstrumentTable) -> Self {
        Self {
            table,
            order_log: Vec::new(),
            fill_log: Vec::new(),
            next_seq: 0,
        }
    }

    pub(crate) fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

struct Shared {
    inner: Mutex<Inner>,
    work: Condvar,
    open: AtomicBool,
    min_trade_threshold: Decimal,
    idle_backoff: Duration,
}

/// A running exchange.
///
/// Opening spawns the matching thread; every mutator below funnels through
/// the single gate it shares with that thread, so submit, amend, cancel,
/// and matching steps are serializable. Dropping (or calling [`close`])
/// clears the open flag and joins the matching thread before the table is
/// released; resting orders still in the books at that point are discarded.
///
/// [`close`]: Exchange::close
pub struct Exchange {
    shared: Arc<Shared>,
    engine: Mutex<Option<JoinHandle<()>>>,
    config: ExchangeConfig,
}

impl Exchange {
    /// Validate the configuration, build the instrument table, and start
    /// the matching engine.
    pub fn open(config: ExchangeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner::new(InstrumentTable::new(
                &config.instruments,
                config.book,
            ))),
            work: Condvar::new(),
            open: AtomicBool::new(true),
            min_trade_threshold: config.min_trade_threshold,
            idle_backoff: config.idle_backoff,
        });

        let engine_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("matching-engine".to_string())
            .spawn(move || engine_loop(&engine_shared))
            .expect("failed to spawn matching engine thread");

        tracing::debug!(instruments = config.instruments.len(), "exchange open");
        Ok(Self {
            shared,
            engine: Mutex::new(Some(handle)),
            config,
        })
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::Acquire)
    }

    /// Submit an order for `participant`.
    ///
    /// On success the order has entered the correct side of its
    /// instrument's book with a fresh submission sequence, the slot is
    /// flagged liquid, and a record has been appended to the order log.
    /// Unknown symbols are rejected without mutating any state.
    pub fn submit(
        &self,
        participant: &Arc<Participant>,
        order: Order,
    ) -> Result<(), ExchangeError> {
        let mut inner = self.shared.inner.lock();
        let Some(at) = inner.table.index_of(order.instrument()) else {
            let symbol = order.instrument().to_string();
            tracing::warn!(%symbol, "rejected order for unknown instrument");
            return Err(ExchangeError::UnknownInstrument(symbol));
        };

        let seq = inner.next_seq();
        let side = order.side();
        let entry = BookEntry::new(Arc::clone(participant), order, seq);
        inner.order_log.push(OrderRecord::from_entry(&entry));

        let slot = inner.table.slot_mut(at);
        slot.book_mut(side).push(entry);
        slot.mark_active();

        drop(inner);
        self.shared.work.notify_all();
        Ok(())
    }

    /// Re-price a resting order. Silent no-op when the target (or the
    /// instrument) is unknown.
    pub fn amend_price(
        &self,
        participant_id: &str,
        order_id: OrderId,
        side: Side,
        instrument: &str,
        new_price: Decimal,
    ) {
        let mut inner = self.shared.inner.lock();
        let Some(at) = inner.table.index_of(instrument) else {
            return;
        };
        inner
            .table
            .slot_mut(at)
            .book_mut(side)
            .amend_price(participant_id, order_id, new_price);
        drop(inner);
        self.shared.work.notify_all();
    }

    /// Change a resting order's remaining quantity. A zero quantity is a
    /// cancel in disguise and is routed there. Silent no-op when the
    /// target is unknown.
    pub fn amend_quantity(
        &self,
        participant_id: &str,
        order_id: OrderId,
        side: Side,
        instrument: &str,
        new_quantity: u64,
    ) {
        if new_quantity == 0 {
            self.cancel(participant_id, order_id, side, instrument);
            return;
        }
        let mut inner = self.shared.inner.lock();
        let Some(at) = inner.table.index_of(instrument) else {
            return;
        };
        inner
            .table
            .slot_mut(at)
            .book_mut(side)
            .amend_quantity(participant_id, order_id, new_quantity);
        drop(inner);
        self.shared.work.notify_all();
    }

    /// Remove a resting order and refresh the slot's liquidity flag.
    /// Silent no-op when the target is unknown.
    pub fn cancel(&self, participant_id: &str, order_id: OrderId, side: Side, instrument: &str) {
        let mut inner = self.shared.inner.lock();
        let Some(at) = inner.table.index_of(instrument) else {
            return;
        };
        let slot = inner.table.slot_mut(at);
        slot.book_mut(side).remove(participant_id, order_id);
        slot.refresh_liquidity();
        drop(inner);
        self.shared.work.notify_all();
    }

    /// Snapshot of the order log.
    pub fn order_log(&self) -> Vec<OrderRecord> {
        self.shared.inner.lock().order_log.clone()
    }

    /// Snapshot of the fill log.
    pub fn fill_log(&self) -> Vec<FillRecord> {
        self.shared.inner.lock().fill_log.clone()
    }

    /// Point-in-time view of one instrument's books.
    pub fn snapshot(&self, instrument: &str) -> Option<SlotSnapshot> {
        let inner = self.shared.inner.lock();
        inner
            .table
            .index_of(instrument)
            .map(|at| inner.table.slot(at).snapshot())
    }

    /// Symbols whose slots currently hold liquidity.
    pub fn active_instruments(&self) -> Vec<String> {
        self.shared
            .inner
            .lock()
            .table
            .slots()
            .filter(|slot| slot.has_liquidity())
            .map(|slot| slot.symbol().to_string())
            .collect()
    }

    /// Close the exchange: clear the open flag, wake the matching thread,
    /// and join it. Idempotent; also runs on drop.
    pub fn close(&self) {
        self.shared.open.store(false, Ordering::Release);
        self.shared.work.notify_all();
        if let Some(handle) = self.engine.lock().take() {
            if handle.join().is_err() {
                tracing::error!("matching engine thread panicked");
            }
            tracing::debug!("exchange closed");
        }
    }
}

impl Drop for Exchange {
    fn drop(&mut self) {
        self.close();
    }
}

/// The matching thread: sweep all slots under the gate, then park on the
/// condvar when a pass executed nothing. Mutators signal the condvar, so an
/// idle engine reacts to new liquidity without a full backoff wait.
fn engine_loop(shared: &Shared) {
    tracing::debug!("matching engine running");
    while shared.open.load(Ordering::Acquire) {
        let mut inner = shared.inner.lock();
        let executed = matching::sweep(&mut inner, shared.min_trade_threshold);
        if executed == 0 {
            shared.work.wait_for(&mut inner, shared.idle_backoff);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::time::Instant;

    fn wait_for<F: Fn() -> bool>(what: &str, condition: F) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(Instant::now() < deadline, "timed out waiting for {what}");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_submit_rejects_unknown_instrument() {
        let exchange = Exchange::open(ExchangeConfig::default()).unwrap();
        let trader = Arc::new(Participant::new(dec!(10_000)));
        let err = exchange
            .submit(&trader, Order::new(Side::Buy, "NFLX", dec!(10), 1))
            .unwrap_err();
        assert_eq!(err, ExchangeError::UnknownInstrument("NFLX".to_string()));
        assert!(exchange.order_log().is_empty());
        assert!(exchange.active_instruments().is_empty());
    }

    #[test]
    fn test_submit_logs_and_marks_slot() {
        let exchange = Exchange::open(ExchangeConfig::default()).unwrap();
        let trader = Arc::new(Participant::new(dec!(10_000)));
        exchange
            .submit(&trader, Order::new(Side::Buy, "DIS", dec!(20), 100))
            .unwrap();

        let log = exchange.order_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].participant, trader.id());
        assert_eq!(log[0].instrument, "DIS");
        assert_eq!(exchange.active_instruments(), vec!["DIS".to_string()]);

        let snapshot = exchange.snapshot("DIS").unwrap();
        assert!(snapshot.liquidity);
        assert_eq!(snapshot.best_bid().unwrap().quantity, 100);
    }

    #[test]
    fn test_crossing_orders_fill_in_background() {
        let exchange = Exchange::open(ExchangeConfig::default()).unwrap();
        let buyer = Arc::new(Participant::new(dec!(1200)));
        let seller = Arc::new(Participant::new(dec!(1200)));

        exchange
            .submit(&buyer, Order::new(Side::Buy, "GOOGL", dec!(10), 10))
            .unwrap();
        exchange
            .submit(&seller, Order::new(Side::Sell, "GOOGL", dec!(10), 10))
            .unwrap();

        wait_for("the cross to fill", || exchange.fill_log().len() == 1);
        wait_for("the slot to drain", || {
            !exchange.snapshot("GOOGL").unwrap().liquidity
        });

        assert_eq!(buyer.balance(), dec!(1100));
        assert_eq!(seller.balance(), dec!(1300));
        let fill = &exchange.fill_log()[0];
        assert_eq!(fill.price, dec!(10));
        assert_eq!(fill.quantity, 10);
        assert_eq!(fill.buyer, buyer.id());
        assert_eq!(fill.seller, seller.id());
    }

    #[test]
    fn test_cancel_clears_liquidity() {
        let exchange = Exchange::open(ExchangeConfig::default()).unwrap();
        let trader = Arc::new(Participant::new(dec!(10_000)));
        let order = Order::new(Side::Sell, "BABA", dec!(50), 5);
        let order_id = order.id();
        exchange.submit(&trader, order).unwrap();
        assert_eq!(exchange.active_instruments(), vec!["BABA".to_string()]);

        exchange.cancel(trader.id(), order_id, Side::Sell, "BABA");
        assert!(exchange.active_instruments().is_empty());
        // The order log is append-only; cancellation does not rewrite it.
        assert_eq!(exchange.order_log().len(), 1);
    }

    #[test]
    fn test_cancel_of_absent_order_is_noop() {
        let exchange = Exchange::open(ExchangeConfig::default()).unwrap();
        let trader = Arc::new(Participant::new(dec!(10_000)));
        let order = Order::new(Side::Sell, "BABA", dec!(50), 5);
        let order_id = order.id();
        exchange.submit(&trader, order).unwrap();

        exchange.cancel(trader.id(), order_id, Side::Buy, "BABA"); // wrong side
        exchange.cancel(trader.id(), order_id, Side::Sell, "TSLA"); // wrong instrument
        exchange.cancel("stranger", order_id, Side::Sell, "BABA"); // wrong owner
        assert_eq!(exchange.snapshot("BABA").unwrap().asks.len(), 1);
    }

    #[test]
    fn test_amend_quantity_zero_routes_to_cancel() {
        let exchange = Exchange::open(ExchangeConfig::default()).unwrap();
        let trader = Arc::new(Participant::new(dec!(10_000)));
        let order = Order::new(Side::Buy, "TSLA", dec!(200), 3);
        let order_id = order.id();
        exchange.submit(&trader, order).unwrap();

        exchange.amend_quantity(trader.id(), order_id, Side::Buy, "TSLA", 0);
        assert!(exchange.snapshot("TSLA").unwrap().bids.is_empty());
        assert!(exchange.active_instruments().is_empty());
    }

    #[test]
    fn test_close_is_idempotent_and_joins_engine() {
        let exchange = Exchange::open(ExchangeConfig::default()).unwrap();
        assert!(exchange.is_open());
        exchange.close();
        assert!(!exchange.is_open());
        exchange.close();
    }

    #[test]
    fn test_submission_sequences_increase_across_books() {
        let exchange = Exchange::open(ExchangeConfig::default()).unwrap();
        let trader = Arc::new(Participant::new(dec!(100_000)));
        // Park orders far apart so nothing crosses while we look.
        exchange
            .submit(&trader, Order::new(Side::Buy, "AMZN", dec!(1), 1))
            .unwrap();
        exchange
            .submit(&trader, Order::new(Side::Sell, "AMZN", dec!(1000), 1))
            .unwrap();
        exchange
            .submit(&trader, Order::new(Side::Buy, "DIS", dec!(1), 1))
            .unwrap();

        let log = exchange.order_log();
        let seqs: Vec<u64> = log.iter().map(|record| record.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
    }
}
