// ============================================================================
// Participant Ledger
// Cash account with audit trail; mutated only through debit/credit/reimburse
// ============================================================================

use crate::error::RejectReason;
use parking_lot::Mutex;
use rand::distributions::Alphanumeric;
use rand::Rng;
use rust_decimal::Decimal;
use std::fmt;

const IDENTITY_LEN: usize = 8;

/// Cash state behind the participant's lock.
#[derive(Debug)]
struct Ledger {
    balance: Decimal,
    /// Post-transaction balances, seeded with the opening balance.
    history: Vec<Decimal>,
}

/// A trading account: a unique identity and a non-negative cash balance.
///
/// Participants are owned by their submitters; the exchange and its books
/// hold `Arc` handles and mutate the balance only through the ledger
/// operations below, inside the matching critical section. The balance is
/// therefore guarded by its own lock so external observers can read it at
/// any time.
#[derive(Debug)]
pub struct Participant {
    id: String,
    ledger: Mutex<Ledger>,
}

impl Participant {
    /// Open an account with the given initial cash.
    ///
    /// The identity is a random 8-character alphanumeric string; the space
    /// is wide enough that collisions are negligible within a process run.
    pub fn new(initial_cash: Decimal) -> Self {
        debug_assert!(initial_cash >= Decimal::ZERO, "initial cash must be non-negative");
        let id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(IDENTITY_LEN)
            .map(char::from)
            .collect();
        Self {
            id,
            ledger: Mutex::new(Ledger {
                balance: initial_cash,
                history: vec![initial_cash],
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn balance(&self) -> Decimal {
        self.ledger.lock().balance
    }

    /// Eligibility is evaluated at the moment of each trade attempt; the
    /// threshold is plumbed in from the exchange configuration rather than
    /// stored on the account.
    pub fn can_trade(&self, min_balance: Decimal) -> bool {
        self.ledger.lock().balance >= min_balance
    }

    /// Debit `price * quantity` from the account.
    ///
    /// Fails without mutating state when the account is below the
    /// minimum-trade threshold or the debit would push the balance negative.
    pub fn buy(
        &self,
        price: Decimal,
        quantity: u64,
        min_balance: Decimal,
    ) -> Result<(), RejectReason> {
        let mut ledger = self.ledger.lock();
        if ledger.balance < min_balance {
            return Err(RejectReason::NotEligible {
                participant: self.id.clone(),
                balance: ledger.balance,
                threshold: min_balance,
            });
        }
        let notional = price * Decimal::from(quantity);
        if notional > ledger.balance {
            return Err(RejectReason::InsufficientFunds {
                participant: self.id.clone(),
                required: notional,
                available: ledger.balance,
            });
        }
        ledger.balance -= notional;
        let balance = ledger.balance;
        ledger.history.push(balance);
        Ok(())
    }

    /// Credit `price * quantity` to the account.
    ///
    /// Fails only on the eligibility check; a credit cannot violate the
    /// non-negative balance invariant.
    pub fn sell(
        &self,
        price: Decimal,
        quantity: u64,
        min_balance: Decimal,
    ) -> Result<(), RejectReason> {
        let mut ledger = self.ledger.lock();
        if ledger.balance < min_balance {
            return Err(RejectReason::NotEligible {
                participant: self.id.clone(),
                balance: ledger.balance,
                threshold: min_balance,
            });
        }
        ledger.balance += price * Decimal::from(quantity);
        let balance = ledger.balance;
        ledger.history.push(balance);
        Ok(())
    }

    /// Unconditionally credit `amount` back to the account.
    ///
    /// Used exclusively by the matching engine to undo a one-sided debit
    /// when the counter-leg of a trade fails. Logged to the audit trail so
    /// `margins` stays consistent with the balance.
    pub fn reimburse(&self, amount: Decimal) {
        let mut ledger = self.ledger.lock();
        ledger.balance += amount;
        let balance = ledger.balance;
        ledger.history.push(balance);
    }

    /// Snapshot of the post-transaction balance trail.
    pub fn audit_trail(&self) -> Vec<Decimal> {
        self.ledger.lock().history.clone()
    }

    /// First differences of the audit trail: the cash impact of each
    /// transaction in order.
    pub fn margins(&self) -> Vec<Decimal> {
        let ledger = self.ledger.lock();
        ledger
            .history
            .windows(2)
            .map(|pair| pair[1] - pair[0])
            .collect()
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trader {} (cash {})", self.id, self.balance())
    }
}
