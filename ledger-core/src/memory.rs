//! Process-local ledger store

use crate::{
    store::{LedgerStore, UnitOfWork},
    types::{AccountId, AccountRecord, GlobalsRecord},
    Result,
};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct MemoryState {
    accounts: HashMap<AccountId, AccountRecord>,
    globals: GlobalsRecord,
}

/// In-memory store; a commit applies under one write lock
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored account records
    pub fn len(&self) -> usize {
        self.state.read().accounts.len()
    }

    /// True when no account record is stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LedgerStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn account(&self, id: &AccountId) -> Result<AccountRecord> {
        Ok(self
            .state
            .read()
            .accounts
            .get(id)
            .cloned()
            .unwrap_or_default())
    }

    fn globals(&self) -> Result<GlobalsRecord> {
        Ok(self.state.read().globals.clone())
    }

    fn accounts(&self) -> Result<Vec<(AccountId, AccountRecord)>> {
        let state = self.state.read();
        let mut records: Vec<_> = state
            .accounts
            .iter()
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect();
        records.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(records)
    }

    fn commit(&self, work: UnitOfWork) -> Result<()> {
        let mut state = self.state.write();

        for (id, record) in work.accounts() {
            state.accounts.insert(id.clone(), record.clone());
        }
        if let Some(globals) = work.globals() {
            state.globals = globals.clone();
        }

        tracing::debug!(unit = %work.id(), store = "memory", "Unit of work committed");
        Ok(())
    }
}
