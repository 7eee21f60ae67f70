//! Referral reward ingestion
//!
//! Only the active yield delivery service may report rewards. Reports are
//! admitted while another operation is in flight because the delivery service
//! typically reports them from inside a payout.

use crate::{
    engine::{require_base_units, ParticipationEngine},
    notify::LedgerNotification,
    Error, Result,
};
use ledger_core::{types::credit, AccountId, Amount, UnitOfWork};
use rust_decimal::Decimal;

impl ParticipationEngine {
    /// Credit referral rewards reported by the yield delivery service
    ///
    /// Rewards addressed to an address with no account are dropped. Returns
    /// the total actually credited.
    pub fn reward_distribution(
        &self,
        caller: &AccountId,
        referrer: &AccountId,
        user: &AccountId,
        referrer_reward: Amount,
        user_reward: Amount,
    ) -> Result<Amount> {
        let _held = self.lock.enter_nested();
        let (store, service) = {
            let wiring = self.wiring.read();
            (wiring.store.clone(), wiring.yield_delivery.identity())
        };

        if *caller != service {
            tracing::warn!(caller = %caller, service = %service, "Reward report from unknown caller");
            return Err(Error::Unauthorized(format!(
                "{} is not the yield delivery service",
                caller
            )));
        }
        if referrer.is_null() || user.is_null() {
            return Err(Error::Validation("reward recipients must not be null".to_string()));
        }
        if referrer_reward.is_sign_negative() || user_reward.is_sign_negative() {
            return Err(Error::Validation("rewards must not be negative".to_string()));
        }
        require_base_units("referrer reward", referrer_reward)?;
        require_base_units("user reward", user_reward)?;

        let parties: Vec<(&AccountId, Amount)> = if referrer == user {
            vec![(referrer, credit("rewards", referrer_reward, user_reward)?)]
        } else {
            vec![(referrer, referrer_reward), (user, user_reward)]
        };

        let mut work = UnitOfWork::new();
        let mut credited = Vec::with_capacity(parties.len());
        for (id, amount) in parties {
            if amount.is_zero() {
                credited.push(Decimal::ZERO);
                continue;
            }
            let mut record = store.account(id)?;
            if !record.exists {
                tracing::warn!(account = %id, amount = %amount, "Reward for unknown account dropped");
                credited.push(Decimal::ZERO);
                continue;
            }
            record.rewards = credit("rewards", record.rewards, amount)?;
            work = work.put_account(id, &record);
            credited.push(amount);
        }

        let total = credited.iter().copied().sum::<Decimal>();
        if work.is_empty() {
            tracing::debug!(referrer = %referrer, user = %user, "No rewards credited");
            return Ok(total);
        }

        let mut globals = store.globals()?;
        globals.total_rewards = credit("total_rewards", globals.total_rewards, total)?;
        store.commit(work.put_globals(&globals))?;

        let (referrer_credited, user_credited) = match credited.as_slice() {
            [both] => (referrer_reward.min(*both), *both - referrer_reward.min(*both)),
            [r, u] => (*r, *u),
            _ => (Decimal::ZERO, Decimal::ZERO),
        };

        self.notifier.notify(&LedgerNotification::RewardDistribution {
            referrer: referrer.clone(),
            user: user.clone(),
            referrer_reward: referrer_credited,
            user_reward: user_credited,
        });

        Ok(total)
    }
}
