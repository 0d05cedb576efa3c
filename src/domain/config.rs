// ============================================================================
// Exchange Configuration
// Instrument universe, eligibility threshold, and book resize policy
// ============================================================================

use crate::error::ConfigError;
use rust_decimal::Decimal;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Resize policy for a priority book's backing storage.
///
/// Defaults: grow capacity by 4/3 when a push finds the book at 80% or
/// more of capacity, shrink toward 2/3 when a removal leaves it at 50% or
/// less, never dropping below the initial capacity.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BookPolicy {
    pub initial_capacity: usize,
    pub grow_threshold: f64,
    pub grow_factor: f64,
    pub shrink_threshold: f64,
    pub shrink_factor: f64,
}

impl Default for BookPolicy {
    fn default() -> Self {
        Self {
            initial_capacity: 10,
            grow_threshold: 0.8,
            grow_factor: 4.0 / 3.0,
            shrink_threshold: 0.5,
            shrink_factor: 2.0 / 3.0,
        }
    }
}

impl BookPolicy {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_capacity == 0 {
            return Err(ConfigError::ZeroBookCapacity);
        }
        for (name, value) in [
            ("grow threshold", self.grow_threshold),
            ("shrink threshold", self.shrink_threshold),
        ] {
            if !(value > 0.0 && value < 1.0) {
                return Err(ConfigError::ThresholdOutOfRange { name, value });
            }
        }
        if self.grow_factor <= 1.0 {
            return Err(ConfigError::GrowFactorTooSmall(self.grow_factor));
        }
        if !(self.shrink_factor > 0.0 && self.shrink_factor < 1.0) {
            return Err(ConfigError::ShrinkFactorOutOfRange(self.shrink_factor));
        }
        Ok(())
    }
}

/// Everything the exchange needs at open.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExchangeConfig {
    /// Recognized symbols. Fixed for the lifetime of the exchange; the
    /// submit gate rejects anything else.
    pub instruments: Vec<String>,

    /// Lower bound on a participant's balance for trade eligibility.
    pub min_trade_threshold: Decimal,

    /// Resize policy applied to every priority book.
    pub book: BookPolicy,

    /// How long the matching thread parks between sweeps when no trade
    /// executed. Mutators cut the wait short by signalling the gate.
    pub idle_backoff: Duration,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            instruments: ["GOOGL", "AMZN", "TSLA", "DIS", "BABA"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            min_trade_threshold: Decimal::ONE_THOUSAND,
            book: BookPolicy::default(),
            idle_backoff: Duration::from_millis(1),
        }
    }
}

impl ExchangeConfig {
    pub fn new(instruments: Vec<String>) -> Self {
        Self {
            instruments,
            ..Self::default()
        }
    }

    pub fn with_instruments<I, S>(mut self, instruments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.instruments = instruments.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_min_trade_threshold(mut self, threshold: Decimal) -> Self {
        self.min_trade_threshold = threshold;
        self
    }

    pub fn with_book_policy(mut self, policy: BookPolicy) -> Self {
        self.book = policy;
        self
    }

    pub fn with_idle_backoff(mut self, backoff: Duration) -> Self {
        self.idle_backoff = backoff;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.instruments.is_empty() {
            return Err(ConfigError::EmptyUniverse);
        }
        let mut seen = std::collections::HashSet::new();
        for symbol in &self.instruments {
            if !seen.insert(symbol.as_str()) {
                return Err(ConfigError::DuplicateInstrument(symbol.clone()));
            }
        }
        if self.min_trade_threshold < Decimal::ZERO {
            return Err(ConfigError::NegativeThreshold(self.min_trade_threshold));
        }
        self.book.validate()
    }
}
