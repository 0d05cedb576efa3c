// ============================================================================
// Error Types
// Rejections surfaced by the submit gate, the ledger, and configuration
// ============================================================================

use rust_decimal::Decimal;

/// Rejections raised at the exchange boundary.
///
/// Amend and cancel deliberately have no "not found" variant: a missing
/// target is a silent no-op, not an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExchangeError {
    /// The submitted symbol is not part of the configured universe.
    #[error("unknown instrument: {0}")]
    UnknownInstrument(String),

    /// A side string other than "BUY" or "SELL" was parsed.
    #[error("invalid side: {0}")]
    InvalidSide(String),
}

/// Why a ledger debit or credit was refused.
///
/// The matching engine reacts to these by reimbursing any counter-leg that
/// already succeeded; they never escape the matching loop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    /// Balance is below the minimum-trade threshold.
    #[error("participant {participant} is not eligible to trade (balance {balance} below threshold {threshold})")]
    NotEligible {
        participant: String,
        balance: Decimal,
        threshold: Decimal,
    },

    /// The debit would push the balance negative.
    #[error("participant {participant} has insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        participant: String,
        required: Decimal,
        available: Decimal,
    },
}

/// Configuration problems caught when the exchange opens.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("instrument universe is empty")]
    EmptyUniverse,

    #[error("duplicate instrument in universe: {0}")]
    DuplicateInstrument(String),

    #[error("minimum-trade threshold must be non-negative, got {0}")]
    NegativeThreshold(Decimal),

    #[error("book initial capacity must be positive")]
    ZeroBookCapacity,

    #[error("book {name} must lie in (0, 1), got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f64 },

    #[error("book grow factor must exceed 1, got {0}")]
    GrowFactorTooSmall(f64),

    #[error("book shrink factor must lie in (0, 1), got {0}")]
    ShrinkFactorOutOfRange(f64),
}
