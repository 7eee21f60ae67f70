//! Ledger store abstraction
//!
//! The engine never writes a record directly. It stages the records it
//! touched in a [`UnitOfWork`] and hands the whole unit to
//! [`LedgerStore::commit`], which must apply it atomically: either every
//! staged record becomes visible or none does.

use crate::{
    config::{StoreBackend, StoreConfig},
    memory::MemoryStore,
    storage::RocksStore,
    types::{AccountId, AccountRecord, GlobalsRecord},
    Result,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// Durable storage of account records plus the global aggregate record
pub trait LedgerStore: Send + Sync {
    /// Human-readable store name (used in admin notifications)
    fn name(&self) -> &str;

    /// Load an account record; unknown accounts read as the blank record
    fn account(&self, id: &AccountId) -> Result<AccountRecord>;

    /// Load the global aggregate record; a fresh store reads as all-zero
    fn globals(&self) -> Result<GlobalsRecord>;

    /// Every stored account record
    fn accounts(&self) -> Result<Vec<(AccountId, AccountRecord)>>;

    /// Apply a unit of work atomically
    fn commit(&self, work: UnitOfWork) -> Result<()>;
}

/// Records staged by one logical step of an operation
#[derive(Debug, Clone)]
pub struct UnitOfWork {
    id: Uuid,
    accounts: BTreeMap<AccountId, AccountRecord>,
    globals: Option<GlobalsRecord>,
}

impl UnitOfWork {
    /// Start an empty unit of work
    pub fn new() -> Self {
        Self {
            id: Uuid::now_v7(),
            accounts: BTreeMap::new(),
            globals: None,
        }
    }

    /// Stage an account record (a later write to the same id replaces it)
    pub fn put_account(mut self, id: &AccountId, record: &AccountRecord) -> Self {
        self.accounts.insert(id.clone(), record.clone());
        self
    }

    /// Stage the globals record
    pub fn put_globals(mut self, globals: &GlobalsRecord) -> Self {
        self.globals = Some(globals.clone());
        self
    }

    /// Unit of work ID (for tracing)
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Staged account records
    pub fn accounts(&self) -> impl Iterator<Item = (&AccountId, &AccountRecord)> {
        self.accounts.iter()
    }

    /// Staged globals record, if any
    pub fn globals(&self) -> Option<&GlobalsRecord> {
        self.globals.as_ref()
    }

    /// True when nothing is staged
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty() && self.globals.is_none()
    }
}

impl Default for UnitOfWork {
    fn default() -> Self {
        Self::new()
    }
}

/// Open the store selected by configuration
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn LedgerStore>> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreBackend::Rocksdb => Ok(Arc::new(RocksStore::open(config)?)),
    }
}
