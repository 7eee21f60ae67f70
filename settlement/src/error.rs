//! Error types for the participation engine

use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Engine errors
#[derive(Error, Debug)]
pub enum Error {
    /// Precondition on amount, address or account existence not met
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Caller identity does not match a privileged or service-restricted entry point
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Value transfer service could not move the requested value
    #[error("Value transfer failed: {0}")]
    TransferFailed(String),

    /// Yield delivery service failed outright
    #[error("Yield delivery failed: {0}")]
    DeliveryFailed(String),

    /// External service broke its interface contract
    #[error("Service contract violated: {0}")]
    ServiceContract(String),

    /// Nested call into the engine while an operation is in flight
    #[error("Reentrant call rejected: {attempted} while {active} is in progress")]
    Reentrancy {
        /// Operation in flight
        active: &'static str,
        /// Operation that tried to enter
        attempted: &'static str,
    },

    /// Ledger arithmetic or consistency violation
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Ledger store error
    #[error("Ledger error: {0}")]
    Ledger(ledger_core::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ledger_core::Error> for Error {
    fn from(err: ledger_core::Error) -> Self {
        match err {
            ledger_core::Error::InvariantViolation(msg) => Error::InvariantViolation(msg),
            other => Error::Ledger(other),
        }
    }
}

impl Error {
    /// True for errors the caller can fix by retrying with different input
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}
