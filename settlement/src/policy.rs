//! Settlement policy
//!
//! Pure computation of how much accrued yield an account may settle right now.
//!
//! # Accrual
//!
//! ```text
//! per_second = floor(balance * REFERENCE_APR / (365 * 100) / 86400)
//! gross      = min(per_second * elapsed, MAX_AVAILABLE)
//! adjusted   = min(floor(gross * (100 - limiter_rate) / 100), balance)
//! ```
//!
//! The per-second share is truncated *before* it is multiplied by the elapsed
//! time. Deployed ledgers depend on this exact rounding, so it is kept as is.

use crate::{
    config::{LimiterBracket, PolicyConfig},
    Error, Result,
};
use ledger_core::{AccountRecord, Amount, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Seconds per day
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Days per year used to de-annualize the reference rate
pub const DAYS_PER_YEAR: u64 = 365;

/// Result of evaluating the policy for one account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    /// Percentage withheld by the limiter (informational)
    pub limiter_rate: u32,

    /// Amount the account may settle now
    pub amount: Amount,
}

impl Availability {
    /// Nothing to settle
    pub fn none() -> Self {
        Self {
            limiter_rate: 0,
            amount: Decimal::ZERO,
        }
    }
}

/// Ordered `(lower_bound_inclusive, rate)` table mapping compound surplus to a limiter rate
#[derive(Debug, Clone)]
pub struct LimiterTable {
    brackets: Vec<LimiterBracket>,
}

impl LimiterTable {
    /// Build a validated table: first bound zero, strictly ascending bounds, rates ≤ 100
    pub fn new(brackets: &[LimiterBracket]) -> Result<Self> {
        let first = brackets
            .first()
            .ok_or_else(|| Error::Config("limiter table is empty".to_string()))?;

        if !first.lower_bound.is_zero() {
            return Err(Error::Config(format!(
                "first limiter bracket must start at 0, starts at {}",
                first.lower_bound
            )));
        }

        for pair in brackets.windows(2) {
            if pair[1].lower_bound <= pair[0].lower_bound {
                return Err(Error::Config(format!(
                    "limiter bounds must ascend: {} then {}",
                    pair[0].lower_bound, pair[1].lower_bound
                )));
            }
        }

        if let Some(bad) = brackets.iter().find(|b| b.rate > 100) {
            return Err(Error::Config(format!("limiter rate {} exceeds 100", bad.rate)));
        }

        Ok(Self {
            brackets: brackets.to_vec(),
        })
    }

    /// Rate of the highest bracket whose lower bound is at or below `surplus`
    pub fn rate_for(&self, surplus: Amount) -> u32 {
        self.brackets
            .iter()
            .rev()
            .find(|bracket| surplus >= bracket.lower_bound)
            .map(|bracket| bracket.rate)
            .unwrap_or(0)
    }

    /// Brackets in ascending order
    pub fn brackets(&self) -> &[LimiterBracket] {
        &self.brackets
    }
}

/// Accrual and limiter policy
#[derive(Debug, Clone)]
pub struct SettlementPolicy {
    reference_apr: Decimal,
    max_available: Amount,
    limiter: LimiterTable,
}

impl SettlementPolicy {
    /// Build the policy from configuration
    pub fn new(config: &PolicyConfig) -> Result<Self> {
        Ok(Self {
            reference_apr: config.reference_apr,
            max_available: config.max_available,
            limiter: LimiterTable::new(&config.limiter)?,
        })
    }

    /// Limiter table in use
    pub fn limiter(&self) -> &LimiterTable {
        &self.limiter
    }

    /// Truncated yield per second for `balance`
    pub fn per_second(&self, balance: Amount) -> Option<Amount> {
        let denominator = Decimal::from(DAYS_PER_YEAR * 100 * SECONDS_PER_DAY);
        balance
            .checked_mul(self.reference_apr)
            .map(|numerator| floor_div(numerator, denominator))
    }

    /// Yield `record` may settle at `now`
    pub fn available(&self, record: &AccountRecord, now: Timestamp) -> Availability {
        let balance = record.current_balance;
        if balance <= Decimal::ZERO {
            return Availability::none();
        }

        let elapsed = Decimal::from(now.saturating_sub(record.last_time));

        // An overflowing product is far past the daily ceiling anyway
        let gross = self
            .per_second(balance)
            .and_then(|per_second| per_second.checked_mul(elapsed))
            .map_or(self.max_available, |gross| gross.min(self.max_available));

        let limiter_rate = self.limiter.rate_for(record.compound_surplus());
        let kept = Decimal::from(100 - limiter_rate.min(100));
        let adjusted = floor_div(gross * kept, Decimal::ONE_HUNDRED);

        Availability {
            limiter_rate,
            amount: adjusted.min(balance),
        }
    }
}

/// `floor(numerator / denominator)` for non-negative operands, exact in Decimal
fn floor_div(numerator: Decimal, denominator: Decimal) -> Decimal {
    let remainder = numerator % denominator;
    (numerator - remainder) / denominator
}
