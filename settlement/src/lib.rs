//! Participation Engine
//!
//! Account state machine for a participation ledger that accrues yield on
//! deposited principal.
//!
//! # Operations
//!
//! 1. **Deposit**: Route principal into custodial pools, reinvest any pending yield, credit the principal
//! 2. **Claim**: Ask the yield delivery service for accrued yield and record what it actually paid
//! 3. **Transfer**: Move an account record to a fresh address
//! 4. **Reward distribution**: Credit referral rewards reported by the yield delivery service
//!
//! # Accrual
//!
//! Yield accrues linearly at a reference APR, capped per settlement and then
//! reduced by a limiter bracket chosen from the account's compound surplus.
//! Settled amounts are integral base units; every division truncates.
//!
//! # Example
//!
//! ```no_run
//! use settlement::{Config, EngineDeps, ParticipationEngine, SystemClock, TracingNotifier};
//! use settlement::services::{CustodyBook, Treasury};
//! use ledger_core::{tokens, AccountId, MemoryStore};
//! use std::sync::Arc;
//!
//! fn main() -> settlement::Result<()> {
//!     let engine = ParticipationEngine::new(
//!         &Config::default(),
//!         EngineDeps {
//!             store: Arc::new(MemoryStore::new()),
//!             value_transfer: Arc::new(CustodyBook::new()),
//!             yield_delivery: Arc::new(Treasury::new(AccountId::new("0x7e"), tokens(1_000_000))),
//!             notifier: Arc::new(TracingNotifier::new()),
//!             clock: Arc::new(SystemClock),
//!         },
//!     )?;
//!
//!     let alice = AccountId::new("0xa1");
//!     engine.deposit(&alice, tokens(1_000))?;
//!     let settlement = engine.claim(&alice)?;
//!     println!("requested {}, delivered {}", settlement.requested, settlement.delivered);
//!
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod admin;
pub mod audit;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
mod guard;
pub mod metrics;
pub mod notify;
pub mod policy;
pub mod rewards;
pub mod services;

// Re-exports
pub use audit::{reconcile, ReconciliationReport};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, LimitConfig, LimiterBracket, PolicyConfig, PoolConfig};
pub use engine::{DepositReceipt, EngineDeps, ParticipationEngine, Settlement};
pub use error::{Error, Result};
pub use metrics::Metrics;
pub use notify::{LedgerNotification, MemoryNotifier, Notifier, TracingNotifier};
pub use policy::{Availability, LimiterTable, SettlementPolicy};
pub use services::{CustodyBook, Treasury, ValueTransfer, YieldDelivery};
