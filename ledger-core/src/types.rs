//! Core types for the participation ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Exact arithmetic (Decimal for money, always integral base units)
//! - Cheap copy-mutate-commit: records are plain values

use crate::{Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Amount in token base units (always integral, never negative once committed)
pub type Amount = Decimal;

/// Unix timestamp in seconds
pub type Timestamp = u64;

/// Decimals of the collateral token
pub const TOKEN_DECIMALS: u32 = 18;

/// Base units per whole token
pub const TOKEN_UNIT: u64 = 1_000_000_000_000_000_000;

/// Convert whole tokens into base units
pub fn tokens(whole: u64) -> Amount {
    Decimal::from(whole) * Decimal::from(TOKEN_UNIT)
}

/// Participant address
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// The zero address ("no account")
    pub const ZERO: &'static str = "0x0000000000000000000000000000000000000000";

    /// Create new account ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The zero address
    pub fn zero() -> Self {
        Self(Self::ZERO.to_string())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the empty string and for any all-zero hex address
    pub fn is_null(&self) -> bool {
        let digits = self.0.strip_prefix("0x").unwrap_or(&self.0);
        digits.is_empty() || digits.bytes().all(|b| b == b'0')
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Per-participant ledger entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Registered flag; false means "no account yet" or "moved away"
    pub exists: bool,

    /// Cumulative principal deposited (excludes compounding)
    pub deposits: Amount,

    /// Cumulative amount reinvested via compounding
    pub compound_deposits: Amount,

    /// Principal plus compounded, still earning
    pub current_balance: Amount,

    /// Cumulative amount paid out or compounded
    pub payouts: Amount,

    /// Cumulative referral rewards credited
    pub rewards: Amount,

    /// Last moment yield was settled or the balance changed
    pub last_time: Timestamp,
}

impl AccountRecord {
    /// Amount of balance attributable to reinvested yield beyond principal.
    ///
    /// Zero while principal exceeds the compounded amount.
    pub fn compound_surplus(&self) -> Amount {
        (self.compound_deposits - self.deposits).max(Decimal::ZERO)
    }

    /// True when every numeric field is zero
    pub fn is_blank(&self) -> bool {
        self.deposits.is_zero()
            && self.compound_deposits.is_zero()
            && self.current_balance.is_zero()
            && self.payouts.is_zero()
            && self.rewards.is_zero()
            && self.last_time == 0
    }
}

/// System-wide running totals (singleton)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalsRecord {
    /// Accounts ever registered
    pub total_users: u64,

    /// Σ principal deposited
    pub total_deposited: Amount,

    /// Σ amount reinvested
    pub total_compound_deposited: Amount,

    /// Σ amount paid out or compounded
    pub total_claimed: Amount,

    /// Σ referral rewards credited
    pub total_rewards: Amount,

    /// Number of balance-affecting transactions
    pub total_txs: u64,

    /// Σ of every account's current balance
    pub current_balance: Amount,
}

/// Checked addition on a named ledger field
pub fn credit(field: &'static str, value: Amount, amount: Amount) -> Result<Amount> {
    value
        .checked_add(amount)
        .ok_or_else(|| Error::InvariantViolation(format!("{} overflow", field)))
}

/// Checked subtraction on a named ledger field; never goes below zero
pub fn debit(field: &'static str, value: Amount, amount: Amount) -> Result<Amount> {
    match value.checked_sub(amount) {
        Some(result) if !result.is_sign_negative() => Ok(result),
        _ => Err(Error::InvariantViolation(format!(
            "{} would go negative: {} - {}",
            field, value, amount
        ))),
    }
}
