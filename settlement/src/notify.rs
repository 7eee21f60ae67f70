//! Ledger notifications
//!
//! The engine reports every committed mutation to an injected [`Notifier`]
//! after the commit succeeds. Notifications are for monitoring only; callers
//! read results from operation return values.

use crate::metrics::Metrics;
use ledger_core::{types::TOKEN_UNIT, AccountId, Amount};
use parking_lot::Mutex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

/// A committed change
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerNotification {
    /// Principal deposited
    Deposit {
        /// Depositor
        account: AccountId,
        /// Deposited amount
        amount: Amount,
        /// Balance after the deposit
        balance: Amount,
    },

    /// Yield paid out
    Claim {
        /// Claimant
        account: AccountId,
        /// Amount asked of the delivery service
        requested: Amount,
        /// Amount the delivery service paid
        delivered: Amount,
        /// Balance after the payout
        balance: Amount,
    },

    /// Yield reinvested
    Compound {
        /// Account
        account: AccountId,
        /// Reinvested amount
        amount: Amount,
        /// Balance after reinvesting
        balance: Amount,
    },

    /// Account moved to a new address
    Transfer {
        /// Old address
        from: AccountId,
        /// New address
        to: AccountId,
        /// Balance carried over
        balance: Amount,
    },

    /// Referral rewards credited
    RewardDistribution {
        /// Referrer
        referrer: AccountId,
        /// Referred user
        user: AccountId,
        /// Credited to the referrer
        referrer_reward: Amount,
        /// Credited to the user
        user_reward: Amount,
    },

    /// Yield delivery service replaced
    YieldDeliveryChanged {
        /// Previous identity
        before: AccountId,
        /// New identity
        after: AccountId,
    },

    /// Ledger store replaced
    StoreChanged {
        /// Previous store
        before: String,
        /// New store
        after: String,
    },

    /// Minimum deposit enforcement toggled
    MinimumEnforcementChanged {
        /// Previous flag
        before: bool,
        /// New flag
        after: bool,
    },
}

impl LedgerNotification {
    /// Short kind label
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerNotification::Deposit { .. } => "deposit",
            LedgerNotification::Claim { .. } => "claim",
            LedgerNotification::Compound { .. } => "compound",
            LedgerNotification::Transfer { .. } => "transfer",
            LedgerNotification::RewardDistribution { .. } => "reward_distribution",
            LedgerNotification::YieldDeliveryChanged { .. } => "yield_delivery_changed",
            LedgerNotification::StoreChanged { .. } => "store_changed",
            LedgerNotification::MinimumEnforcementChanged { .. } => "minimum_enforcement_changed",
        }
    }
}

/// Receives committed changes
pub trait Notifier: Send + Sync {
    /// Called once per committed change
    fn notify(&self, notification: &LedgerNotification);
}

/// Structured log lines plus optional Prometheus counters
#[derive(Debug, Default, Clone)]
pub struct TracingNotifier {
    metrics: Option<Metrics>,
}

impl TracingNotifier {
    /// Log only
    pub fn new() -> Self {
        Self::default()
    }

    /// Log and count
    pub fn with_metrics(metrics: Metrics) -> Self {
        Self {
            metrics: Some(metrics),
        }
    }
}

fn whole_tokens(amount: Amount) -> f64 {
    (amount / Decimal::from(TOKEN_UNIT)).to_f64().unwrap_or(0.0)
}

impl Notifier for TracingNotifier {
    fn notify(&self, notification: &LedgerNotification) {
        match notification {
            LedgerNotification::Deposit { account, amount, balance } => {
                tracing::info!(account = %account, amount = %amount, balance = %balance, "Deposit");
            }
            LedgerNotification::Claim { account, requested, delivered, balance } => {
                tracing::info!(
                    account = %account,
                    requested = %requested,
                    delivered = %delivered,
                    balance = %balance,
                    "Claim"
                );
                if let Some(metrics) = &self.metrics {
                    if delivered < requested {
                        metrics.record_shortfall();
                    }
                    metrics.record_settled("claim", whole_tokens(*delivered));
                }
            }
            LedgerNotification::Compound { account, amount, balance } => {
                tracing::info!(account = %account, amount = %amount, balance = %balance, "Compound");
                if let Some(metrics) = &self.metrics {
                    metrics.record_settled("compound", whole_tokens(*amount));
                }
            }
            LedgerNotification::Transfer { from, to, balance } => {
                tracing::info!(from = %from, to = %to, balance = %balance, "Account transferred");
            }
            LedgerNotification::RewardDistribution {
                referrer,
                user,
                referrer_reward,
                user_reward,
            } => {
                tracing::info!(
                    referrer = %referrer,
                    user = %user,
                    referrer_reward = %referrer_reward,
                    user_reward = %user_reward,
                    "Rewards distributed"
                );
            }
            LedgerNotification::YieldDeliveryChanged { before, after } => {
                tracing::info!(before = %before, after = %after, "Yield delivery service changed");
            }
            LedgerNotification::StoreChanged { before, after } => {
                tracing::info!(before = %before, after = %after, "Ledger store changed");
            }
            LedgerNotification::MinimumEnforcementChanged { before, after } => {
                tracing::info!(before, after, "Minimum deposit enforcement changed");
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_operation(notification.kind());
        }
    }
}

/// Keeps every notification in memory
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    seen: Mutex<Vec<LedgerNotification>>,
}

impl MemoryNotifier {
    /// Empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything received so far
    pub fn notifications(&self) -> Vec<LedgerNotification> {
        self.seen.lock().clone()
    }

    /// Kinds received so far, in order
    pub fn kinds(&self) -> Vec<&'static str> {
        self.seen.lock().iter().map(LedgerNotification::kind).collect()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: &LedgerNotification) {
        self.seen.lock().push(notification.clone());
    }
}
