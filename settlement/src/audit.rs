//! Ledger reconciliation
//!
//! Walks every stored account and checks that the aggregates in the globals
//! record equal the per-account sums, that no account is past the payout
//! ceiling and that closed records are blank.

use crate::{engine::ParticipationEngine, Result};
use ledger_core::{AccountId, Amount, GlobalsRecord, LedgerStore};
use rust_decimal::Decimal;
use serde::Serialize;

/// Result of a reconciliation pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationReport {
    /// Records visited
    pub records: usize,

    /// Records with the existence flag set
    pub active_accounts: u64,

    /// Sum of per-account balances
    pub sum_of_balances: Amount,

    /// Globals as stored
    pub globals: GlobalsRecord,

    /// Human-readable description of each failed check
    pub violations: Vec<String>,
}

impl ReconciliationReport {
    /// True when no check failed
    pub fn is_consistent(&self) -> bool {
        self.violations.is_empty()
    }
}

#[derive(Default)]
struct Sums {
    deposits: Decimal,
    compound_deposits: Decimal,
    balances: Decimal,
    payouts: Decimal,
    rewards: Decimal,
}

fn compare(violations: &mut Vec<String>, what: &str, per_account: Amount, aggregate: Amount) {
    if per_account != aggregate {
        violations.push(format!(
            "{}: accounts sum to {}, globals record {}",
            what, per_account, aggregate
        ));
    }
}

/// Reconcile `store` against the payout ceiling `max_payouts`
pub fn reconcile(store: &dyn LedgerStore, max_payouts: Amount) -> Result<ReconciliationReport> {
    let globals = store.globals()?;
    let accounts: Vec<(AccountId, _)> = store.accounts()?;

    let mut sums = Sums::default();
    let mut active_accounts = 0u64;
    let mut violations = Vec::new();

    for (id, record) in &accounts {
        if !record.exists {
            if !record.is_blank() {
                violations.push(format!("{}: closed record carries values", id));
            }
            continue;
        }
        active_accounts += 1;

        if record.payouts > max_payouts {
            violations.push(format!(
                "{}: payouts {} exceed ceiling {}",
                id, record.payouts, max_payouts
            ));
        }
        if record.current_balance.is_sign_negative() {
            violations.push(format!("{}: negative balance {}", id, record.current_balance));
        }

        sums.deposits += record.deposits;
        sums.compound_deposits += record.compound_deposits;
        sums.balances += record.current_balance;
        sums.payouts += record.payouts;
        sums.rewards += record.rewards;
    }

    if active_accounts != globals.total_users {
        violations.push(format!(
            "total_users: {} active accounts, globals record {}",
            active_accounts, globals.total_users
        ));
    }
    compare(&mut violations, "current_balance", sums.balances, globals.current_balance);
    compare(&mut violations, "deposits", sums.deposits, globals.total_deposited);
    compare(
        &mut violations,
        "compound_deposits",
        sums.compound_deposits,
        globals.total_compound_deposited,
    );
    compare(&mut violations, "payouts", sums.payouts, globals.total_claimed);
    compare(&mut violations, "rewards", sums.rewards, globals.total_rewards);

    if violations.is_empty() {
        tracing::info!(
            store = store.name(),
            records = accounts.len(),
            active_accounts,
            "Ledger reconciled"
        );
    } else {
        tracing::error!(
            store = store.name(),
            violations = violations.len(),
            "Ledger reconciliation failed"
        );
    }

    Ok(ReconciliationReport {
        records: accounts.len(),
        active_accounts,
        sum_of_balances: sums.balances,
        globals,
        violations,
    })
}

impl ParticipationEngine {
    /// Reconcile the active store
    pub fn reconcile(&self) -> Result<ReconciliationReport> {
        let _held = self.lock.enter_nested();
        reconcile(self.store().as_ref(), self.limits.max_payouts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::{tokens, AccountRecord, MemoryStore, UnitOfWork};

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        let record = AccountRecord {
            exists: true,
            deposits: tokens(100),
            current_balance: tokens(100),
            last_time: 1,
            ..Default::default()
        };
        let globals = GlobalsRecord {
            total_users: 1,
            total_deposited: tokens(100),
            current_balance: tokens(100),
            total_txs: 1,
            ..Default::default()
        };
        store
            .commit(
                UnitOfWork::new()
                    .put_account(&AccountId::new("0xa1"), &record)
                    .put_globals(&globals),
            )
            .unwrap();
        store
    }

    #[test]
    fn test_consistent_store() {
        let report = reconcile(&seeded(), tokens(5_000_000)).unwrap();
        assert!(report.is_consistent(), "{:?}", report.violations);
        assert_eq!(report.records, 1);
        assert_eq!(report.active_accounts, 1);
        assert_eq!(report.sum_of_balances, tokens(100));
    }

    #[test]
    fn test_balance_mismatch_detected() {
        let store = seeded();
        let mut globals = store.globals().unwrap();
        globals.current_balance = tokens(99);
        store.commit(UnitOfWork::new().put_globals(&globals)).unwrap();

        let report = reconcile(&store, tokens(5_000_000)).unwrap();
        assert!(!report.is_consistent());
        assert!(report.violations[0].starts_with("current_balance"));
    }

    #[test]
    fn test_dirty_closed_record_detected() {
        let store = seeded();
        let ghost = AccountRecord {
            rewards: tokens(1),
            ..Default::default()
        };
        store
            .commit(UnitOfWork::new().put_account(&AccountId::new("0xc3"), &ghost))
            .unwrap();

        let report = reconcile(&store, tokens(5_000_000)).unwrap();
        assert_eq!(report.violations.len(), 1);
        assert!(report.violations[0].contains("closed record"));
    }

    #[test]
    fn test_payout_ceiling_detected() {
        let report = reconcile(&seeded(), Decimal::ZERO).unwrap();
        assert!(report.violations.iter().all(|v| !v.contains("ceiling")));

        let store = seeded();
        let id = AccountId::new("0xa1");
        let mut record = store.account(&id).unwrap();
        record.payouts = tokens(2);
        let mut globals = store.globals().unwrap();
        globals.total_claimed = tokens(2);
        store
            .commit(UnitOfWork::new().put_account(&id, &record).put_globals(&globals))
            .unwrap();

        let report = reconcile(&store, tokens(1)).unwrap();
        assert_eq!(report.violations.len(), 1);
        assert!(report.violations[0].contains("ceiling"));
    }
}
