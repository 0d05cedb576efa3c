// ============================================================================
// Matching Engine
// Pairs crossed top-of-book orders into fills, one sweep at a time
// ============================================================================

use crate::domain::audit::FillRecord;
use crate::domain::book::BookEntry;
use crate::domain::order::Side;
use crate::domain::slot::InstrumentSlot;
use crate::engine::exchange::Inner;
use rust_decimal::Decimal;
use std::sync::Arc;

/// One pass over every slot in fixed order. Returns the number of fills
/// executed; the caller parks on the gate's condvar when this is zero.
pub(crate) fn sweep(inner: &mut Inner, min_trade: Decimal) -> usize {
    let Inner {
        table, fill_log, ..
    } = inner;
    let mut executed = 0;
    for slot in table.slots_mut() {
        if !slot.has_liquidity() {
            continue;
        }
        executed += match_slot(slot, min_trade, fill_log);
    }
    executed
}

/// Drain the cross at one slot.
///
/// Stops as soon as the tops no longer cross or a ledger leg is refused;
/// every successful iteration strictly reduces resting quantity, so the
/// loop terminates. A refused leg leaves both orders resting and the
/// ledgers net-unchanged, to be retried on a later sweep.
fn match_slot(slot: &mut InstrumentSlot, min_trade: Decimal, fills: &mut Vec<FillRecord>) -> usize {
    let mut executed = 0;
    loop {
        let (Some(bid), Some(ask)) = (slot.bids().peek(), slot.asks().peek()) else {
            break;
        };
        if bid.order.price() < ask.order.price() {
            break;
        }

        let price = execution_price(bid, ask);
        let quantity = bid.order.quantity().min(ask.order.quantity());
        let buyer = Arc::clone(&bid.participant);
        let seller = Arc::clone(&ask.participant);

        // Debit the buyer first: if that leg fails there is nothing to undo.
        if let Err(reason) = buyer.buy(price, quantity, min_trade) {
            tracing::trace!(%reason, "trade abandoned on buy leg");
            break;
        }
        if let Err(reason) = seller.sell(price, quantity, min_trade) {
            buyer.reimburse(price * Decimal::from(quantity));
            tracing::trace!(%reason, "trade abandoned on sell leg, buyer reimbursed");
            break;
        }

        let fill = FillRecord::new(slot.symbol(), bid, ask, price, quantity);
        settle(slot, quantity);
        tracing::debug!(
            instrument = %fill.instrument,
            price = %fill.price,
            quantity = fill.quantity,
            "fill executed"
        );
        fills.push(fill);
        executed += 1;
    }
    executed
}

/// Equal prices trade at the shared price. A strict cross trades at the
/// price of the leg that entered its book first: seniority dictates.
fn execution_price(bid: &BookEntry, ask: &BookEntry) -> Decimal {
    if bid.order.price() == ask.order.price() || bid.seq < ask.seq {
        bid.order.price()
    } else {
        ask.order.price()
    }
}

/// Decrement both heads by the executed quantity, pop whichever side is
/// exhausted, and restore the liquidity flag.
fn settle(slot: &mut InstrumentSlot, quantity: u64) {
    for side in [Side::Buy, Side::Sell] {
        let book = slot.book_mut(side);
        if book.fill_head(quantity) == Some(0) {
            book.pop();
        }
    }
    slot.refresh_liquidity();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::BookPolicy;
    use crate::domain::order::Order;
    use crate::domain::participant::Participant;
    use rust_decimal_macros::dec;

    const THRESHOLD: Decimal = Decimal::ONE_THOUSAND;

    fn slot() -> InstrumentSlot {
        InstrumentSlot::new("GOOGL", BookPolicy::default())
    }

    fn rest(
        slot: &mut InstrumentSlot,
        participant: &Arc<Participant>,
        side: Side,
        price: Decimal,
        quantity: u64,
        seq: u64,
    ) {
        let order = Order::new(side, "GOOGL", price, quantity);
        slot.book_mut(side)
            .push(BookEntry::new(Arc::clone(participant), order, seq));
        slot.mark_active();
    }

    #[test]
    fn test_equal_prices_trade_at_shared_price() {
        let mut slot = slot();
        let buyer = Arc::new(Participant::new(dec!(1200)));
        let seller = Arc::new(Participant::new(dec!(1200)));
        rest(&mut slot, &buyer, Side::Buy, dec!(10), 10, 0);
        rest(&mut slot, &seller, Side::Sell, dec!(10), 10, 1);

        let mut fills = Vec::new();
        assert_eq!(match_slot(&mut slot, THRESHOLD, &mut fills), 1);
        assert_eq!(fills[0].price, dec!(10));
        assert_eq!(fills[0].quantity, 10);
        assert_eq!(buyer.balance(), dec!(1100));
        assert_eq!(seller.balance(), dec!(1300));
        assert!(!slot.has_liquidity());
    }

    #[test]
    fn test_strict_cross_trades_at_senior_price() {
        // Bid 100 arrived before ask 20: trade at the bid's price.
        let mut slot = slot();
        let buyer = Arc::new(Participant::new(dec!(10_000)));
        let seller = Arc::new(Participant::new(dec!(10_000)));
        rest(&mut slot, &buyer, Side::Buy, dec!(100), 10, 0);
        rest(&mut slot, &seller, Side::Sell, dec!(20), 20, 1);

        let mut fills = Vec::new();
        match_slot(&mut slot, THRESHOLD, &mut fills);
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].price, dec!(100));
        assert_eq!(fills[0].quantity, 10);

        // Bid exhausted and popped; ask keeps its remainder.
        assert!(slot.bids().is_empty());
        assert_eq!(slot.asks().peek().unwrap().order.quantity(), 10);
        assert!(slot.has_liquidity());
    }

    #[test]
    fn test_strict_cross_junior_side_dictates_when_ask_is_older() {
        let mut slot = slot();
        let buyer = Arc::new(Participant::new(dec!(10_000)));
        let seller = Arc::new(Participant::new(dec!(10_000)));
        rest(&mut slot, &seller, Side::Sell, dec!(20), 5, 0);
        rest(&mut slot, &buyer, Side::Buy, dec!(100), 5, 1);

        let mut fills = Vec::new();
        match_slot(&mut slot, THRESHOLD, &mut fills);
        assert_eq!(fills[0].price, dec!(20));
    }

    #[test]
    fn test_no_trade_when_spread_is_open() {
        let mut slot = slot();
        let buyer = Arc::new(Participant::new(dec!(10_000)));
        let seller = Arc::new(Participant::new(dec!(10_000)));
        rest(&mut slot, &buyer, Side::Buy, dec!(10), 10, 0);
        rest(&mut slot, &seller, Side::Sell, dec!(11), 10, 1);

        let mut fills = Vec::new();
        assert_eq!(match_slot(&mut slot, THRESHOLD, &mut fills), 0);
        assert!(fills.is_empty());
        assert_eq!(slot.bids().len(), 1);
        assert_eq!(slot.asks().len(), 1);
    }

    #[test]
    fn test_ineligible_buyer_leaves_everything_untouched() {
        let mut slot = slot();
        let buyer = Arc::new(Participant::new(dec!(500))); // below threshold
        let seller = Arc::new(Participant::new(dec!(5000)));
        rest(&mut slot, &buyer, Side::Buy, dec!(10), 10, 0);
        rest(&mut slot, &seller, Side::Sell, dec!(10), 10, 1);

        let mut fills = Vec::new();
        assert_eq!(match_slot(&mut slot, THRESHOLD, &mut fills), 0);
        assert!(fills.is_empty());
        assert_eq!(buyer.balance(), dec!(500));
        assert_eq!(seller.balance(), dec!(5000));
        assert_eq!(buyer.audit_trail().len(), 1);
        assert_eq!(seller.audit_trail().len(), 1);
        assert_eq!(slot.bids().len(), 1);
        assert_eq!(slot.asks().len(), 1);
    }

    #[test]
    fn test_failed_sell_leg_reimburses_buyer() {
        let mut slot = slot();
        let buyer = Arc::new(Participant::new(dec!(5000)));
        let seller = Arc::new(Participant::new(dec!(500))); // below threshold
        rest(&mut slot, &buyer, Side::Buy, dec!(10), 10, 0);
        rest(&mut slot, &seller, Side::Sell, dec!(10), 10, 1);

        let mut fills = Vec::new();
        assert_eq!(match_slot(&mut slot, THRESHOLD, &mut fills), 0);
        assert_eq!(buyer.balance(), dec!(5000));
        assert_eq!(seller.balance(), dec!(500));
        // The buyer's trail shows the debit and the reimbursement.
        assert_eq!(buyer.margins(), vec![dec!(-100), dec!(100)]);
        assert_eq!(slot.bids().len(), 1);
        assert_eq!(slot.asks().len(), 1);
    }

    #[test]
    fn test_sweep_drains_multiple_levels() {
        let mut slot = slot();
        let buyer = Arc::new(Participant::new(dec!(100_000)));
        let s1 = Arc::new(Participant::new(dec!(10_000)));
        let s2 = Arc::new(Participant::new(dec!(10_000)));
        rest(&mut slot, &buyer, Side::Buy, dec!(50), 30, 0);
        rest(&mut slot, &s1, Side::Sell, dec!(40), 10, 1);
        rest(&mut slot, &s2, Side::Sell, dec!(45), 20, 2);

        let mut fills = Vec::new();
        assert_eq!(match_slot(&mut slot, THRESHOLD, &mut fills), 2);
        // Senior bid dictates the price on both pairings.
        assert!(fills.iter().all(|fill| fill.price == dec!(50)));
        assert_eq!(fills[0].seller, s1.id());
        assert_eq!(fills[1].seller, s2.id());
        assert!(!slot.has_liquidity());
        assert_eq!(buyer.balance(), dec!(100_000) - dec!(1500));
    }

    #[test]
    fn test_fifo_among_equal_prices() {
        let mut slot = slot();
        let buyer = Arc::new(Participant::new(dec!(100_000)));
        let early = Arc::new(Participant::new(dec!(10_000)));
        let late = Arc::new(Participant::new(dec!(10_000)));
        rest(&mut slot, &early, Side::Sell, dec!(10), 5, 0);
        rest(&mut slot, &late, Side::Sell, dec!(10), 5, 1);
        rest(&mut slot, &buyer, Side::Buy, dec!(10), 5, 2);

        let mut fills = Vec::new();
        match_slot(&mut slot, THRESHOLD, &mut fills);
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].seller, early.id());
        assert_eq!(slot.asks().peek().unwrap().participant.id(), late.id());
    }
}
