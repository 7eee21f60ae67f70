//! External value-movement and yield-delivery services
//!
//! The engine only sees the two traits. [`CustodyBook`] and [`Treasury`] are
//! process-local implementations used by tests, replays and the audit binary.

use crate::{Error, Result};
use ledger_core::{AccountId, Amount};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Moves collateral from a depositor into custodial pools
pub trait ValueTransfer: Send + Sync {
    /// Move `amount` from `from` to `to`; fails if `from` lacks authorized value
    fn transfer_value(&self, from: &AccountId, to: &AccountId, amount: Amount) -> Result<()>;
}

/// Performs payouts on behalf of the engine
pub trait YieldDelivery: Send + Sync {
    /// Identity allowed to report referral rewards
    fn identity(&self) -> AccountId;

    /// Pay up to `requested` to `account`; returns the amount actually delivered
    fn deliver_yield(&self, account: &AccountId, requested: Amount) -> Result<Amount>;
}

/// In-memory token balances
#[derive(Debug, Default)]
pub struct CustodyBook {
    balances: RwLock<HashMap<AccountId, Amount>>,
}

impl CustodyBook {
    /// Empty book
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` to `account` out of thin air
    pub fn fund(&self, account: &AccountId, amount: Amount) {
        *self.balances.write().entry(account.clone()).or_default() += amount;
    }

    /// Current balance of `account`
    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.balances
            .read()
            .get(account)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}

impl ValueTransfer for CustodyBook {
    fn transfer_value(&self, from: &AccountId, to: &AccountId, amount: Amount) -> Result<()> {
        let mut balances = self.balances.write();

        let available = balances.get(from).copied().unwrap_or(Decimal::ZERO);
        if available < amount {
            return Err(Error::TransferFailed(format!(
                "{} holds {}, cannot move {}",
                from, available, amount
            )));
        }

        balances.insert(from.clone(), available - amount);
        *balances.entry(to.clone()).or_default() += amount;
        Ok(())
    }
}

/// Yield delivery backed by a finite liquidity reserve
///
/// Requests beyond the remaining reserve are partially filled.
#[derive(Debug)]
pub struct Treasury {
    identity: AccountId,
    reserve: RwLock<Amount>,
    paid: RwLock<HashMap<AccountId, Amount>>,
}

impl Treasury {
    /// Treasury with `reserve` available for payouts
    pub fn new(identity: AccountId, reserve: Amount) -> Self {
        Self {
            identity,
            reserve: RwLock::new(reserve),
            paid: RwLock::new(HashMap::new()),
        }
    }

    /// Remaining reserve
    pub fn reserve(&self) -> Amount {
        *self.reserve.read()
    }

    /// Add liquidity
    pub fn replenish(&self, amount: Amount) {
        *self.reserve.write() += amount;
    }

    /// Total delivered to `account`
    pub fn paid_to(&self, account: &AccountId) -> Amount {
        self.paid.read().get(account).copied().unwrap_or(Decimal::ZERO)
    }
}

impl YieldDelivery for Treasury {
    fn identity(&self) -> AccountId {
        self.identity.clone()
    }

    fn deliver_yield(&self, account: &AccountId, requested: Amount) -> Result<Amount> {
        let mut reserve = self.reserve.write();
        let delivered = requested.min(*reserve).max(Decimal::ZERO);

        *reserve -= delivered;
        *self.paid.write().entry(account.clone()).or_default() += delivered;

        if delivered < requested {
            tracing::warn!(
                account = %account,
                requested = %requested,
                delivered = %delivered,
                "Treasury reserve short"
            );
        }

        Ok(delivered)
    }
}
