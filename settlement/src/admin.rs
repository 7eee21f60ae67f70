//! Owner-only configuration changes

use crate::{
    engine::ParticipationEngine, notify::LedgerNotification, services::YieldDelivery, Error,
    Result,
};
use ledger_core::{AccountId, LedgerStore};
use std::sync::Arc;

impl ParticipationEngine {
    /// Administrative owner
    pub fn owner(&self) -> &AccountId {
        &self.owner
    }

    fn authorize(&self, caller: &AccountId) -> Result<()> {
        if *caller != self.owner {
            tracing::warn!(caller = %caller, "Administrative call rejected");
            return Err(Error::Unauthorized(format!("{} is not the owner", caller)));
        }
        Ok(())
    }

    /// Replace the yield delivery service
    pub fn set_yield_delivery(&self, caller: &AccountId, service: Arc<dyn YieldDelivery>) -> Result<()> {
        let _guard = self.lock.enter("set_yield_delivery")?;
        self.authorize(caller)?;

        let after = service.identity();
        let before = {
            let mut wiring = self.wiring.write();
            std::mem::replace(&mut wiring.yield_delivery, service).identity()
        };

        self.notifier
            .notify(&LedgerNotification::YieldDeliveryChanged { before, after });
        Ok(())
    }

    /// Replace the ledger store
    ///
    /// Records are not migrated; the new store is used as-is.
    pub fn set_store(&self, caller: &AccountId, store: Arc<dyn LedgerStore>) -> Result<()> {
        let _guard = self.lock.enter("set_store")?;
        self.authorize(caller)?;

        let after = store.name().to_string();
        let before = {
            let mut wiring = self.wiring.write();
            std::mem::replace(&mut wiring.store, store).name().to_string()
        };

        self.notifier
            .notify(&LedgerNotification::StoreChanged { before, after });
        Ok(())
    }

    /// Toggle MIN_DEPOSIT enforcement
    pub fn set_minimum_enforcement(&self, caller: &AccountId, enforce: bool) -> Result<()> {
        let _guard = self.lock.enter("set_minimum_enforcement")?;
        self.authorize(caller)?;

        let before = std::mem::replace(&mut self.wiring.write().enforce_minimum, enforce);

        self.notifier.notify(&LedgerNotification::MinimumEnforcementChanged {
            before,
            after: enforce,
        });
        Ok(())
    }
}
