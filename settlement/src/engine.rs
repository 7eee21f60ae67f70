//! Account state machine
//!
//! Deposit, claim, compound and transfer. Every operation follows the same
//! shape:
//!
//! 1. enter the operation lock (re-entry from an external service is refused)
//! 2. load records and validate every precondition
//! 3. call external services
//! 4. reload the records the services could have touched
//! 5. mutate the copies and commit them as one unit of work
//! 6. notify
//!
//! Nothing is committed before validation finishes, and nothing observable is
//! left inconsistent across an external call.

use crate::{
    clock::Clock,
    config::{Config, LimitConfig, PoolConfig},
    guard::OperationLock,
    notify::{LedgerNotification, Notifier},
    policy::{Availability, SettlementPolicy},
    services::{ValueTransfer, YieldDelivery},
    Error, Result,
};
use ledger_core::{
    types::{credit, debit},
    AccountId, AccountRecord, Amount, GlobalsRecord, LedgerStore, Timestamp, UnitOfWork,
};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Collaborators injected at construction
#[derive(Clone)]
pub struct EngineDeps {
    /// Record storage
    pub store: Arc<dyn LedgerStore>,

    /// Moves deposits into custodial pools
    pub value_transfer: Arc<dyn ValueTransfer>,

    /// Pays out claimed yield
    pub yield_delivery: Arc<dyn YieldDelivery>,

    /// Receives committed changes
    pub notifier: Arc<dyn Notifier>,

    /// Time source
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for EngineDeps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineDeps")
            .field("store", &self.store.name())
            .field("yield_delivery", &self.yield_delivery.identity())
            .finish()
    }
}

/// Collaborators replaceable through the administrative interface
pub(crate) struct Wiring {
    pub(crate) store: Arc<dyn LedgerStore>,
    pub(crate) yield_delivery: Arc<dyn YieldDelivery>,
    pub(crate) enforce_minimum: bool,
}

/// Reject amounts carrying a fraction of a base unit
pub(crate) fn require_base_units(what: &str, amount: Amount) -> Result<()> {
    if !amount.fract().is_zero() {
        return Err(Error::Validation(format!(
            "{} must be a whole number of base units, got {}",
            what, amount
        )));
    }
    Ok(())
}

/// Outcome of a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Amount asked of the delivery service
    pub requested: Amount,

    /// Amount actually paid and recorded
    pub delivered: Amount,
}

impl Settlement {
    fn nothing() -> Self {
        Self {
            requested: Decimal::ZERO,
            delivered: Decimal::ZERO,
        }
    }

    /// True when a positive amount was paid
    pub fn is_paid(&self) -> bool {
        self.delivered > Decimal::ZERO
    }

    /// Requested but not delivered
    pub fn shortfall(&self) -> Amount {
        self.requested - self.delivered
    }
}

/// Outcome of a deposit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositReceipt {
    /// Principal credited
    pub amount: Amount,

    /// Yield reinvested before the principal was applied
    pub compounded: Amount,

    /// Balance after the deposit
    pub balance: Amount,

    /// True when this deposit registered the account
    pub registered: bool,
}

/// The participation engine
pub struct ParticipationEngine {
    pub(crate) policy: SettlementPolicy,
    pub(crate) limits: LimitConfig,
    pub(crate) pools: PoolConfig,
    pub(crate) owner: AccountId,
    pub(crate) wiring: RwLock<Wiring>,
    pub(crate) value_transfer: Arc<dyn ValueTransfer>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) lock: OperationLock,
}

impl std::fmt::Debug for ParticipationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let wiring = self.wiring.read();
        f.debug_struct("ParticipationEngine")
            .field("owner", &self.owner)
            .field("store", &wiring.store.name())
            .field("yield_delivery", &wiring.yield_delivery.identity())
            .field("enforce_minimum", &wiring.enforce_minimum)
            .finish()
    }
}

impl ParticipationEngine {
    /// Create a new engine
    pub fn new(config: &Config, deps: EngineDeps) -> Result<Self> {
        config.validate()?;

        tracing::info!(
            service = %config.service_name,
            owner = %config.owner,
            store = deps.store.name(),
            yield_delivery = %deps.yield_delivery.identity(),
            "Participation engine ready"
        );

        Ok(Self {
            policy: SettlementPolicy::new(&config.policy)?,
            limits: config.limits.clone(),
            pools: config.pools.clone(),
            owner: config.owner.clone(),
            wiring: RwLock::new(Wiring {
                store: deps.store,
                yield_delivery: deps.yield_delivery,
                enforce_minimum: config.limits.enforce_minimum,
            }),
            value_transfer: deps.value_transfer,
            notifier: deps.notifier,
            clock: deps.clock,
            lock: OperationLock::new(),
        })
    }

    pub(crate) fn store(&self) -> Arc<dyn LedgerStore> {
        self.wiring.read().store.clone()
    }

    /// Settlement policy in use
    pub fn policy(&self) -> &SettlementPolicy {
        &self.policy
    }

    /// Current account record (blank when unknown)
    pub fn account(&self, id: &AccountId) -> Result<AccountRecord> {
        Ok(self.store().account(id)?)
    }

    /// Current global aggregate record
    pub fn globals(&self) -> Result<GlobalsRecord> {
        Ok(self.store().globals()?)
    }

    /// Yield `id` could settle right now
    pub fn available(&self, id: &AccountId) -> Result<Availability> {
        let record = self.store().account(id)?;
        Ok(self.policy.available(&record, self.clock.now()))
    }

    /// Whether MIN_DEPOSIT is enforced
    pub fn minimum_enforced(&self) -> bool {
        self.wiring.read().enforce_minimum
    }

    /// Deposit `amount` of principal for `account`
    pub fn deposit(&self, account: &AccountId, amount: Amount) -> Result<DepositReceipt> {
        let _guard = self.lock.enter("deposit")?;
        let (store, enforce_minimum) = {
            let wiring = self.wiring.read();
            (wiring.store.clone(), wiring.enforce_minimum)
        };
        let now = self.clock.now();

        if account.is_null() {
            return Err(Error::Validation("depositor address must not be null".to_string()));
        }
        if amount <= Decimal::ZERO {
            return Err(Error::Validation(format!("deposit amount must be positive, got {}", amount)));
        }
        require_base_units("deposit amount", amount)?;
        if enforce_minimum && amount < self.limits.min_deposit {
            return Err(Error::Validation(format!(
                "deposit {} below minimum {}",
                amount, self.limits.min_deposit
            )));
        }

        let record = store.account(account)?;
        if record.payouts > self.limits.max_payouts {
            return Err(Error::Validation(format!(
                "payouts {} exceed ceiling {}",
                record.payouts, self.limits.max_payouts
            )));
        }

        // The pending compound lands before the principal, so it counts toward the ceiling
        let pending = self.compound_amount(&record, now);
        let projected = credit("current_balance", record.current_balance, pending)
            .and_then(|balance| credit("current_balance", balance, amount))?;
        if projected > self.limits.max_balance {
            return Err(Error::Validation(format!(
                "balance {} would exceed maximum {}",
                projected, self.limits.max_balance
            )));
        }

        self.collect(account, amount)?;

        // Value transfer may have reported rewards in between
        let mut record = store.account(account)?;
        let mut globals = store.globals()?;

        let registered = !record.exists;
        if registered {
            record.exists = true;
            globals.total_users += 1;
            store.commit(
                UnitOfWork::new()
                    .put_account(account, &record)
                    .put_globals(&globals),
            )?;
            tracing::info!(account = %account, total_users = globals.total_users, "Account registered");
        }

        let mut compounded = Decimal::ZERO;
        if record.current_balance > Decimal::ZERO {
            if let Some(amount) = self.compound_locked(store.as_ref(), account, now)? {
                compounded = amount;
            }
            record = store.account(account)?;
            globals = store.globals()?;
        }

        record.deposits = credit("deposits", record.deposits, amount)?;
        record.current_balance = credit("current_balance", record.current_balance, amount)?;
        record.last_time = record.last_time.max(now);

        globals.total_deposited = credit("total_deposited", globals.total_deposited, amount)?;
        globals.current_balance = credit("globals.current_balance", globals.current_balance, amount)?;
        globals.total_txs += 1;

        store.commit(
            UnitOfWork::new()
                .put_account(account, &record)
                .put_globals(&globals),
        )?;

        self.notifier.notify(&LedgerNotification::Deposit {
            account: account.clone(),
            amount,
            balance: record.current_balance,
        });

        Ok(DepositReceipt {
            amount,
            compounded,
            balance: record.current_balance,
            registered,
        })
    }

    /// Pay out accrued yield to `account`
    pub fn claim(&self, account: &AccountId) -> Result<Settlement> {
        let _guard = self.lock.enter("claim")?;
        let (store, delivery) = {
            let wiring = self.wiring.read();
            (wiring.store.clone(), wiring.yield_delivery.clone())
        };
        let now = self.clock.now();

        let record = store.account(account)?;
        if !record.exists {
            return Err(Error::Validation(format!("account must exist: {}", account)));
        }
        if record.current_balance <= Decimal::ZERO {
            return Err(Error::Validation(format!("account has no balance: {}", account)));
        }

        self.settle_and_deliver(store.as_ref(), delivery.as_ref(), account, &record, now)
    }

    /// Move `account` to `new_address`
    ///
    /// Unsettled yield is forfeited: the new record starts its clock at `now`.
    pub fn transfer(&self, account: &AccountId, new_address: &AccountId) -> Result<AccountRecord> {
        let _guard = self.lock.enter("transfer")?;
        let store = self.store();
        let now = self.clock.now();

        let source = store.account(account)?;
        if !source.exists {
            return Err(Error::Validation(format!("account must exist: {}", account)));
        }
        if new_address.is_null() {
            return Err(Error::Validation("destination address must not be null".to_string()));
        }
        if store.account(new_address)?.exists {
            return Err(Error::Validation(format!(
                "destination account already exists: {}",
                new_address
            )));
        }

        let moved = AccountRecord {
            exists: true,
            deposits: source.deposits,
            compound_deposits: source.compound_deposits,
            current_balance: source.current_balance,
            payouts: source.payouts,
            rewards: source.rewards,
            last_time: source.last_time.max(now),
        };

        let mut globals = store.globals()?;
        globals.total_txs += 1;

        store.commit(
            UnitOfWork::new()
                .put_account(new_address, &moved)
                .put_account(account, &AccountRecord::default())
                .put_globals(&globals),
        )?;

        self.notifier.notify(&LedgerNotification::Transfer {
            from: account.clone(),
            to: new_address.clone(),
            balance: moved.current_balance,
        });

        Ok(moved)
    }

    /// Policy amount clamped to the remaining payout headroom
    pub(crate) fn compound_amount(&self, record: &AccountRecord, now: Timestamp) -> Amount {
        let available = self.policy.available(record, now);
        let headroom = (self.limits.max_payouts - record.payouts).max(Decimal::ZERO);
        available.amount.min(headroom)
    }

    /// Reinvest accrued yield; the caller holds the operation lock
    pub(crate) fn compound_locked(
        &self,
        store: &dyn LedgerStore,
        account: &AccountId,
        now: Timestamp,
    ) -> Result<Option<Amount>> {
        let mut record = store.account(account)?;
        let mut globals = store.globals()?;

        let amount = self.compound_amount(&record, now);
        if amount <= Decimal::ZERO {
            tracing::debug!(account = %account, "Nothing to compound");
            return Ok(None);
        }

        record.compound_deposits = credit("compound_deposits", record.compound_deposits, amount)?;
        record.payouts = credit("payouts", record.payouts, amount)?;
        record.current_balance = credit("current_balance", record.current_balance, amount)?;
        record.last_time = record.last_time.max(now);

        globals.total_compound_deposited =
            credit("total_compound_deposited", globals.total_compound_deposited, amount)?;
        globals.total_claimed = credit("total_claimed", globals.total_claimed, amount)?;
        globals.current_balance = credit("globals.current_balance", globals.current_balance, amount)?;
        globals.total_txs += 1;

        store.commit(
            UnitOfWork::new()
                .put_account(account, &record)
                .put_globals(&globals),
        )?;

        self.notifier.notify(&LedgerNotification::Compound {
            account: account.clone(),
            amount,
            balance: record.current_balance,
        });

        Ok(Some(amount))
    }

    /// Request a payout and record exactly what was delivered
    fn settle_and_deliver(
        &self,
        store: &dyn LedgerStore,
        delivery: &dyn YieldDelivery,
        account: &AccountId,
        record: &AccountRecord,
        now: Timestamp,
    ) -> Result<Settlement> {
        let requested = self
            .compound_amount(record, now)
            .min(record.current_balance);
        if requested <= Decimal::ZERO {
            tracing::debug!(account = %account, "Nothing to claim");
            return Ok(Settlement::nothing());
        }

        let delivered = delivery.deliver_yield(account, requested)?;
        if delivered.is_sign_negative() || delivered > requested {
            tracing::error!(
                account = %account,
                requested = %requested,
                delivered = %delivered,
                "Delivery service reported an impossible amount"
            );
            return Err(Error::ServiceContract(format!(
                "delivered {} for a request of {}",
                delivered, requested
            )));
        }

        if delivered.is_zero() {
            tracing::warn!(account = %account, requested = %requested, "Delivery service paid nothing");
            return Ok(Settlement {
                requested,
                delivered,
            });
        }

        // Delivery may have reported rewards in between
        let mut record = store.account(account)?;
        let mut globals = store.globals()?;

        record.payouts = credit("payouts", record.payouts, delivered)?;
        record.current_balance = debit("current_balance", record.current_balance, delivered)?;
        record.last_time = record.last_time.max(now);

        globals.total_claimed = credit("total_claimed", globals.total_claimed, delivered)?;
        globals.current_balance = debit("globals.current_balance", globals.current_balance, delivered)?;
        globals.total_txs += 1;

        store.commit(
            UnitOfWork::new()
                .put_account(account, &record)
                .put_globals(&globals),
        )?;

        if delivered < requested {
            tracing::warn!(
                account = %account,
                requested = %requested,
                delivered = %delivered,
                "Partial delivery recorded"
            );
        }

        self.notifier.notify(&LedgerNotification::Claim {
            account: account.clone(),
            requested,
            delivered,
            balance: record.current_balance,
        });

        Ok(Settlement {
            requested,
            delivered,
        })
    }

    /// Route a deposit into the custodial pools
    fn collect(&self, account: &AccountId, amount: Amount) -> Result<()> {
        let share = Decimal::from(self.pools.primary_share_percent);
        let primary = ((amount * share) / Decimal::ONE_HUNDRED).floor();
        let buffer = amount - primary;

        for (pool, portion) in [(&self.pools.primary_pool, primary), (&self.pools.buffer_pool, buffer)] {
            if portion > Decimal::ZERO {
                self.value_transfer.transfer_value(account, pool, portion)?;
            }
        }

        tracing::debug!(
            account = %account,
            primary = %primary,
            buffer = %buffer,
            "Deposit collected"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::notify::MemoryNotifier;
    use crate::policy::SECONDS_PER_DAY;
    use crate::services::{CustodyBook, Treasury};
    use ledger_core::{tokens, MemoryStore};

    const T0: Timestamp = 1_700_000_000;

    struct Harness {
        engine: ParticipationEngine,
        store: Arc<MemoryStore>,
        custody: Arc<CustodyBook>,
        treasury: Arc<Treasury>,
        notifier: Arc<MemoryNotifier>,
        clock: Arc<ManualClock>,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let custody = Arc::new(CustodyBook::new());
        let treasury = Arc::new(Treasury::new(AccountId::new("0x7e"), tokens(10_000_000)));
        let notifier = Arc::new(MemoryNotifier::new());
        let clock = Arc::new(ManualClock::new(T0));

        let engine = ParticipationEngine::new(
            &Config::default(),
            EngineDeps {
                store: store.clone(),
                value_transfer: custody.clone(),
                yield_delivery: treasury.clone(),
                notifier: notifier.clone(),
                clock: clock.clone(),
            },
        )
        .unwrap();

        Harness {
            engine,
            store,
            custody,
            treasury,
            notifier,
            clock,
        }
    }

    fn alice() -> AccountId {
        AccountId::new("0x00000000000000000000000000000000000000a1")
    }

    #[test]
    fn test_first_deposit_registers_account() {
        let h = harness();
        h.custody.fund(&alice(), tokens(1_000));

        let receipt = h.engine.deposit(&alice(), tokens(1_000)).unwrap();
        assert!(receipt.registered);
        assert_eq!(receipt.compounded, Decimal::ZERO);

        let record = h.engine.account(&alice()).unwrap();
        assert!(record.exists);
        assert_eq!(record.deposits, tokens(1_000));
        assert_eq!(record.current_balance, tokens(1_000));
        assert_eq!(record.last_time, T0);

        let globals = h.engine.globals().unwrap();
        assert_eq!(globals.total_users, 1);
        assert_eq!(globals.total_deposited, tokens(1_000));
        assert_eq!(globals.current_balance, tokens(1_000));
        assert_eq!(globals.total_txs, 1);

        assert_eq!(h.custody.balance_of(&Config::default().pools.primary_pool), tokens(900));
        assert_eq!(h.custody.balance_of(&Config::default().pools.buffer_pool), tokens(100));
        assert_eq!(h.notifier.kinds(), vec!["deposit"]);
    }

    #[test]
    fn test_second_deposit_compounds_first() {
        let h = harness();
        h.custody.fund(&alice(), tokens(2_000));
        h.engine.deposit(&alice(), tokens(1_000)).unwrap();

        h.clock.advance(SECONDS_PER_DAY);
        let receipt = h.engine.deposit(&alice(), tokens(1_000)).unwrap();

        let daily = Decimal::from_str_exact("4999999999999968000").unwrap();
        assert!(!receipt.registered);
        assert_eq!(receipt.compounded, daily);

        let record = h.engine.account(&alice()).unwrap();
        assert_eq!(record.deposits, tokens(2_000));
        assert_eq!(record.compound_deposits, daily);
        assert_eq!(record.payouts, daily);
        assert_eq!(record.current_balance, tokens(2_000) + daily);

        let globals = h.engine.globals().unwrap();
        assert_eq!(globals.total_users, 1);
        assert_eq!(globals.total_compound_deposited, daily);
        assert_eq!(globals.total_claimed, daily);
        assert_eq!(globals.current_balance, record.current_balance);
        assert_eq!(globals.total_txs, 3);
        assert_eq!(h.notifier.kinds(), vec!["deposit", "compound", "deposit"]);
    }

    #[test]
    fn test_compound_respects_payout_ceiling() {
        let h = harness();
        let max_payouts = Config::default().limits.max_payouts;
        let record = AccountRecord {
            exists: true,
            deposits: tokens(100_000),
            current_balance: tokens(100_000),
            payouts: max_payouts - Decimal::from(10),
            last_time: T0,
            ..Default::default()
        };
        let globals = GlobalsRecord {
            total_users: 1,
            current_balance: tokens(100_000),
            ..Default::default()
        };
        h.store
            .commit(UnitOfWork::new().put_account(&alice(), &record).put_globals(&globals))
            .unwrap();

        h.clock.advance(SECONDS_PER_DAY);
        let _guard = h.engine.lock.enter("compound").unwrap();
        let compounded = h
            .engine
            .compound_locked(h.store.as_ref(), &alice(), h.clock.now())
            .unwrap();

        assert_eq!(compounded, Some(Decimal::from(10)));
        assert_eq!(h.store.account(&alice()).unwrap().payouts, max_payouts);
    }

    #[test]
    fn test_compound_without_yield_is_noop() {
        let h = harness();
        h.custody.fund(&alice(), tokens(1_000));
        h.engine.deposit(&alice(), tokens(1_000)).unwrap();

        let _guard = h.engine.lock.enter("compound").unwrap();
        let compounded = h
            .engine
            .compound_locked(h.store.as_ref(), &alice(), h.clock.now())
            .unwrap();

        assert_eq!(compounded, None);
        assert_eq!(h.store.globals().unwrap().total_txs, 1);
    }

    #[test]
    fn test_deposit_below_minimum() {
        let h = harness();
        h.custody.fund(&alice(), tokens(1_000));

        let err = h.engine.deposit(&alice(), tokens(199)).unwrap_err();
        assert!(err.is_validation());
        assert!(h.store.is_empty());
        assert_eq!(h.custody.balance_of(&alice()), tokens(1_000));
    }

    #[test]
    fn test_deposit_zero_rejected_without_minimum() {
        let h = harness();
        h.engine.wiring.write().enforce_minimum = false;
        assert!(h.engine.deposit(&alice(), Decimal::ZERO).unwrap_err().is_validation());
    }

    #[test]
    fn test_deposit_fractional_amount_rejected() {
        let h = harness();
        h.custody.fund(&alice(), tokens(1_000));

        let err = h
            .engine
            .deposit(&alice(), tokens(200) + Decimal::new(5, 1))
            .unwrap_err();
        assert!(err.is_validation());
        assert!(h.store.is_empty());
        assert_eq!(h.custody.balance_of(&alice()), tokens(1_000));
        assert_eq!(h.custody.balance_of(&Config::default().pools.buffer_pool), Decimal::ZERO);
    }

    #[test]
    fn test_clock_skew_never_rewinds_last_time() {
        let h = harness();
        h.custody.fund(&alice(), tokens(2_000));
        h.engine.deposit(&alice(), tokens(1_000)).unwrap();

        h.clock.advance(SECONDS_PER_DAY);
        assert!(h.engine.claim(&alice()).unwrap().is_paid());

        // Clock jumps back half a day: nothing settled twice
        h.clock.set(T0 + SECONDS_PER_DAY / 2);
        h.engine.deposit(&alice(), tokens(1_000)).unwrap();
        assert_eq!(h.engine.account(&alice()).unwrap().last_time, T0 + SECONDS_PER_DAY);

        h.clock.set(T0 + SECONDS_PER_DAY);
        assert!(!h.engine.claim(&alice()).unwrap().is_paid());
        assert_eq!(h.engine.available(&alice()).unwrap().amount, Decimal::ZERO);
    }

    #[test]
    fn test_deposit_over_max_balance() {
        let h = harness();
        h.custody.fund(&alice(), tokens(2_000_000));

        let err = h.engine.deposit(&alice(), tokens(1_000_001)).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(h.engine.globals().unwrap(), GlobalsRecord::default());
    }

    #[test]
    fn test_deposit_ceiling_counts_pending_compound() {
        let h = harness();
        h.custody.fund(&alice(), tokens(2_000_000));
        h.engine.deposit(&alice(), tokens(999_000)).unwrap();

        // A day of yield on 999k pushes 999k + 1k over the ceiling
        h.clock.advance(SECONDS_PER_DAY);
        let err = h.engine.deposit(&alice(), tokens(1_000)).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(h.engine.account(&alice()).unwrap().current_balance, tokens(999_000));
    }

    #[test]
    fn test_transfer_failure_leaves_no_trace() {
        let h = harness();
        h.custody.fund(&alice(), tokens(100));

        let err = h.engine.deposit(&alice(), tokens(500)).unwrap_err();
        assert!(matches!(err, Error::TransferFailed(_)));
        assert!(h.store.is_empty());
        assert_eq!(h.store.globals().unwrap(), GlobalsRecord::default());
        assert!(h.notifier.kinds().is_empty());
    }

    #[test]
    fn test_claim_pays_and_resets_clock() {
        let h = harness();
        h.custody.fund(&alice(), tokens(1_000));
        h.engine.deposit(&alice(), tokens(1_000)).unwrap();

        h.clock.advance(SECONDS_PER_DAY);
        let settlement = h.engine.claim(&alice()).unwrap();
        let daily = Decimal::from_str_exact("4999999999999968000").unwrap();

        assert!(settlement.is_paid());
        assert_eq!(settlement.delivered, daily);
        assert_eq!(h.treasury.paid_to(&alice()), daily);

        let record = h.engine.account(&alice()).unwrap();
        assert_eq!(record.payouts, daily);
        assert_eq!(record.current_balance, tokens(1_000) - daily);
        assert_eq!(record.last_time, T0 + SECONDS_PER_DAY);

        // Immediately again: nothing accrued
        let again = h.engine.claim(&alice()).unwrap();
        assert!(!again.is_paid());
        assert_eq!(h.engine.available(&alice()).unwrap().amount, Decimal::ZERO);
    }

    #[test]
    fn test_claim_requires_account() {
        let h = harness();
        assert!(h.engine.claim(&alice()).unwrap_err().is_validation());
    }

    #[test]
    fn test_claim_near_payout_ceiling() {
        let h = harness();
        let max_payouts = Config::default().limits.max_payouts;
        let record = AccountRecord {
            exists: true,
            deposits: tokens(1_000),
            current_balance: tokens(1_000),
            payouts: max_payouts - Decimal::from(10),
            last_time: T0,
            ..Default::default()
        };
        h.store
            .commit(UnitOfWork::new().put_account(&alice(), &record).put_globals(&GlobalsRecord {
                total_users: 1,
                current_balance: tokens(1_000),
                ..Default::default()
            }))
            .unwrap();

        h.clock.advance(SECONDS_PER_DAY);
        let settlement = h.engine.claim(&alice()).unwrap();
        assert_eq!(settlement.requested, Decimal::from(10));
        assert_eq!(settlement.delivered, Decimal::from(10));
        assert_eq!(h.engine.account(&alice()).unwrap().payouts, max_payouts);
    }

    #[test]
    fn test_claim_records_shortfall() {
        let h = harness();
        h.custody.fund(&alice(), tokens(1_000));
        h.engine.deposit(&alice(), tokens(1_000)).unwrap();

        let reserve = h.treasury.reserve();
        h.treasury.deliver_yield(&AccountId::new("0xdead"), reserve - tokens(1)).unwrap();

        h.clock.advance(SECONDS_PER_DAY);
        let settlement = h.engine.claim(&alice()).unwrap();
        assert_eq!(settlement.delivered, tokens(1));
        assert!(settlement.shortfall() > Decimal::ZERO);

        let record = h.engine.account(&alice()).unwrap();
        assert_eq!(record.payouts, tokens(1));
        assert_eq!(record.current_balance, tokens(999));
        assert_eq!(h.engine.globals().unwrap().current_balance, tokens(999));
    }

    #[test]
    fn test_transfer_moves_record() {
        let h = harness();
        let bob = AccountId::new("0x00000000000000000000000000000000000000b2");
        h.custody.fund(&alice(), tokens(1_000));
        h.engine.deposit(&alice(), tokens(1_000)).unwrap();

        h.clock.advance(3_600);
        let moved = h.engine.transfer(&alice(), &bob).unwrap();
        assert!(moved.exists);
        assert_eq!(moved.deposits, tokens(1_000));
        assert_eq!(moved.last_time, T0 + 3_600);

        let source = h.engine.account(&alice()).unwrap();
        assert!(!source.exists);
        assert!(source.is_blank());

        let globals = h.engine.globals().unwrap();
        assert_eq!(globals.total_txs, 2);
        assert_eq!(globals.current_balance, tokens(1_000));

        let err = h.engine.transfer(&alice(), &AccountId::new("0xc3")).unwrap_err();
        assert!(err.to_string().contains("account must exist"));
    }

    #[test]
    fn test_transfer_to_existing_or_null_rejected() {
        let h = harness();
        let bob = AccountId::new("0x00000000000000000000000000000000000000b2");
        h.custody.fund(&alice(), tokens(1_000));
        h.custody.fund(&bob, tokens(1_000));
        h.engine.deposit(&alice(), tokens(1_000)).unwrap();
        h.engine.deposit(&bob, tokens(1_000)).unwrap();

        assert!(h.engine.transfer(&alice(), &bob).unwrap_err().is_validation());
        assert!(h.engine.transfer(&alice(), &AccountId::zero()).unwrap_err().is_validation());
    }
}
