//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `accounts` - Account records (key: account id bytes)
//! - `globals` - The global aggregate record (key: `globals`)
//!
//! A unit of work is written as a single `WriteBatch`, so account and
//! globals writes of one step land together or not at all.

use crate::{
    config::StoreConfig,
    error::{Error, Result},
    store::{LedgerStore, UnitOfWork},
    types::{AccountId, AccountRecord, GlobalsRecord},
};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, WriteOptions,
    DB,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Column family names
const CF_ACCOUNTS: &str = "accounts";
const CF_GLOBALS: &str = "globals";

/// Key of the singleton globals record
const GLOBALS_KEY: &[u8] = b"globals";

/// RocksDB-backed ledger store
pub struct RocksStore {
    db: Arc<DB>,
    path: PathBuf,
    sync_writes: bool,
}

impl RocksStore {
    /// Open or create database
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_ACCOUNTS, Self::cf_options_accounts()),
            ColumnFamilyDescriptor::new(CF_GLOBALS, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(path = ?path, "Opened RocksDB ledger store");

        Ok(Self {
            db: Arc::new(db),
            path: path.clone(),
            sync_writes: config.rocksdb.sync_writes,
        })
    }

    fn cf_options_accounts() -> Options {
        let mut opts = Options::default();
        // Records are read on every operation, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    /// Database path
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl std::fmt::Debug for RocksStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RocksStore")
            .field("path", &self.path)
            .field("sync_writes", &self.sync_writes)
            .finish()
    }
}

impl LedgerStore for RocksStore {
    fn name(&self) -> &str {
        "rocksdb"
    }

    fn account(&self, id: &AccountId) -> Result<AccountRecord> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;
        match self.db.get_cf(&cf, id.as_str().as_bytes())? {
            Some(value) => Ok(bincode::deserialize(&value)?),
            None => Ok(AccountRecord::default()),
        }
    }

    fn globals(&self) -> Result<GlobalsRecord> {
        let cf = self.cf_handle(CF_GLOBALS)?;
        match self.db.get_cf(&cf, GLOBALS_KEY)? {
            Some(value) => Ok(bincode::deserialize(&value)?),
            None => Ok(GlobalsRecord::default()),
        }
    }

    fn accounts(&self) -> Result<Vec<(AccountId, AccountRecord)>> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;
        let mut records = Vec::new();

        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (key, value) = item?;
            let id = String::from_utf8(key.to_vec())
                .map_err(|e| Error::Storage(format!("Invalid account key: {}", e)))?;
            records.push((AccountId::new(id), bincode::deserialize(&value)?));
        }

        Ok(records)
    }

    fn commit(&self, work: UnitOfWork) -> Result<()> {
        if work.is_empty() {
            return Ok(());
        }

        let mut batch = WriteBatch::default();

        let cf_accounts = self.cf_handle(CF_ACCOUNTS)?;
        for (id, record) in work.accounts() {
            batch.put_cf(&cf_accounts, id.as_str().as_bytes(), bincode::serialize(record)?);
        }

        if let Some(globals) = work.globals() {
            let cf_globals = self.cf_handle(CF_GLOBALS)?;
            batch.put_cf(&cf_globals, GLOBALS_KEY, bincode::serialize(globals)?);
        }

        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.sync_writes);

        // Atomic commit
        self.db.write_opt(batch, &write_opts)?;

        tracing::debug!(unit = %work.id(), store = "rocksdb", "Unit of work committed");
        Ok(())
    }
}
