//! Configuration for the participation engine

use crate::policy::LimiterTable;
use ledger_core::{tokens, AccountId, Amount, StoreConfig};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Privileged identity allowed to run administrative operations
    pub owner: AccountId,

    /// Accrual and limiter parameters
    pub policy: PolicyConfig,

    /// Deposit and payout ceilings
    pub limits: LimitConfig,

    /// Custodial pools receiving deposits
    pub pools: PoolConfig,

    /// Ledger store
    #[serde(default)]
    pub store: StoreConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "participation-engine".to_string(),
            owner: AccountId::new("0x00000000000000000000000000000000000000ad"),
            policy: PolicyConfig::default(),
            limits: LimitConfig::default(),
            pools: PoolConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

/// One limiter bracket: surplus at or above `lower_bound` is throttled by `rate` percent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimiterBracket {
    /// Inclusive lower bound of compound surplus
    pub lower_bound: Amount,

    /// Percentage withheld from gross yield
    pub rate: u32,
}

impl LimiterBracket {
    /// Bracket starting at `whole_tokens`
    pub fn new(whole_tokens: u64, rate: u32) -> Self {
        Self {
            lower_bound: tokens(whole_tokens),
            rate,
        }
    }
}

/// Accrual configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Annual reference rate in percent (daily percent * 365)
    pub reference_apr: Decimal,

    /// Ceiling on gross yield per settlement
    pub max_available: Amount,

    /// Limiter brackets, ascending by lower bound
    pub limiter: Vec<LimiterBracket>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            reference_apr: Decimal::new(1825, 1), // 0.5% daily
            max_available: tokens(50_000),
            limiter: vec![
                LimiterBracket::new(0, 0),
                LimiterBracket::new(50_000, 10),
                LimiterBracket::new(250_000, 15),
                LimiterBracket::new(500_000, 25),
                LimiterBracket::new(750_000, 35),
                LimiterBracket::new(1_000_000, 50),
            ],
        }
    }
}

/// Deposit and payout limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitConfig {
    /// Smallest accepted deposit while enforcement is on
    pub min_deposit: Amount,

    /// Largest balance an account may reach through deposits
    pub max_balance: Amount,

    /// Lifetime payout ceiling per account
    pub max_payouts: Amount,

    /// Enforce `min_deposit`
    pub enforce_minimum: bool,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            min_deposit: tokens(200),
            max_balance: tokens(1_000_000),
            max_payouts: tokens(5_000_000),
            enforce_minimum: true,
        }
    }
}

/// Custodial pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Pool receiving the main share of each deposit
    pub primary_pool: AccountId,

    /// Pool receiving the remainder
    pub buffer_pool: AccountId,

    /// Percent of each deposit routed to the primary pool
    pub primary_share_percent: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            primary_pool: AccountId::new("0x00000000000000000000000000000000000000f1"),
            buffer_pool: AccountId::new("0x00000000000000000000000000000000000000f2"),
            primary_share_percent: 90,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(owner) = std::env::var("PARTICIPATION_OWNER") {
            config.owner = AccountId::new(owner);
        }

        if let Ok(pool) = std::env::var("PARTICIPATION_PRIMARY_POOL") {
            config.pools.primary_pool = AccountId::new(pool);
        }

        if let Ok(pool) = std::env::var("PARTICIPATION_BUFFER_POOL") {
            config.pools.buffer_pool = AccountId::new(pool);
        }

        if let Ok(flag) = std::env::var("PARTICIPATION_ENFORCE_MINIMUM") {
            config.limits.enforce_minimum = flag.parse().map_err(|_| {
                crate::Error::Config(format!("PARTICIPATION_ENFORCE_MINIMUM must be a bool: {}", flag))
            })?;
        }

        config.store.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency
    pub fn validate(&self) -> crate::Result<()> {
        LimiterTable::new(&self.policy.limiter)?;

        if self.policy.reference_apr.is_sign_negative() {
            return Err(crate::Error::Config("reference_apr must not be negative".to_string()));
        }
        if self.policy.max_available.is_sign_negative() {
            return Err(crate::Error::Config("max_available must not be negative".to_string()));
        }
        if self.limits.min_deposit.is_sign_negative()
            || self.limits.max_balance <= Decimal::ZERO
            || self.limits.max_payouts <= Decimal::ZERO
        {
            return Err(crate::Error::Config(
                "min_deposit must be non-negative, max_balance and max_payouts positive".to_string(),
            ));
        }
        if self.pools.primary_share_percent > 100 {
            return Err(crate::Error::Config(format!(
                "primary_share_percent {} exceeds 100",
                self.pools.primary_share_percent
            )));
        }
        if self.owner.is_null() || self.pools.primary_pool.is_null() || self.pools.buffer_pool.is_null() {
            return Err(crate::Error::Config(
                "owner and pool addresses must not be null".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service_name, "participation-engine");
        assert_eq!(config.pools.primary_share_percent, 90);
        assert_eq!(config.policy.limiter.len(), 6);
        assert!(config.limits.enforce_minimum);
        config.validate().unwrap();
    }

    #[test]
    fn test_rejects_bad_share() {
        let mut config = Config::default();
        config.pools.primary_share_percent = 120;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_null_owner() {
        let mut config = Config::default();
        config.owner = AccountId::zero();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_toml() {
        let config: Config = toml::from_str(
            r#"
            service_name = "staging"
            owner = "0x00000000000000000000000000000000000000aa"

            [policy]
            reference_apr = "182.5"
            max_available = "1000"
            limiter = [
                { lower_bound = "0", rate = 0 },
                { lower_bound = "500", rate = 20 },
            ]

            [limits]
            min_deposit = "10"
            max_balance = "100000"
            max_payouts = "500000"
            enforce_minimum = false

            [pools]
            primary_pool = "0x00000000000000000000000000000000000000b1"
            buffer_pool = "0x00000000000000000000000000000000000000b2"
            primary_share_percent = 90

            [store]
            backend = "memory"
            data_dir = "/tmp/unused"
            "#,
        )
        .unwrap();

        config.validate().unwrap();
        assert_eq!(config.service_name, "staging");
        assert_eq!(config.policy.limiter[1].rate, 20);
        assert_eq!(config.limits.min_deposit, Decimal::from(10));
        assert!(!config.limits.enforce_minimum);
    }
}
