//! Participation Ledger Core
//!
//! Account and global aggregate records for the participation ledger, and the
//! stores that hold them.
//!
//! # Architecture
//!
//! - **Plain records**: an operation loads a record, mutates its copy, commits it
//! - **Unit of work**: every commit stages accounts plus globals and applies them atomically
//! - **Pluggable stores**: in-memory for tests and simulation, RocksDB for durability
//!
//! # Invariants
//!
//! - `current_balance >= 0` on every record
//! - A record with `exists == false` has every numeric field at zero
//! - `globals.current_balance == Σ account.current_balance` between operations

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod config;
pub mod error;
pub mod memory;
pub mod storage;
pub mod store;
pub mod types;

// Re-exports
pub use config::{StoreBackend, StoreConfig};
pub use error::{Error, Result};
pub use memory::MemoryStore;
pub use storage::RocksStore;
pub use store::{open_store, LedgerStore, UnitOfWork};
pub use types::{tokens, AccountId, AccountRecord, Amount, GlobalsRecord, Timestamp};
