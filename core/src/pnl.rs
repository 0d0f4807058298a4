//! P&L Tracker (C6, §4.6). Realized per-account daily P&L, persisted on
//! every mutation; session date comes from the Clock & Timezone Service
//! so a reset at 17:00 local cleanly starts the next day's bucket.

use crate::clock::{EngineClock, TzConverter};
use riskguard_sdk::{AccountId, Money};
use riskguard_store::Store;
use std::sync::Arc;

pub struct PnlTracker {
    store: Arc<dyn Store>,
    clock: Arc<dyn EngineClock>,
    tz: TzConverter,
}

impl std::fmt::Debug for PnlTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PnlTracker").finish_non_exhaustive()
    }
}

impl PnlTracker {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn EngineClock>, tz: TzConverter) -> Self {
        Self { store, clock, tz }
    }

    /// Applies a realized P&L delta for the current session date. Callers
    /// are responsible for only calling this on events carrying a
    /// non-null realized amount - "the tracker never infers P&L from
    /// prices" (§4.6).
    pub async fn add_trade_pnl(&self, account: &AccountId, delta: Money) -> Result<Money, riskguard_store::StoreError> {
        let session_date = self.tz.session_date(self.clock.now());
        self.store.add_daily_pnl(account, session_date, delta).await
    }

    pub async fn get_daily_pnl(&self, account: &AccountId) -> Result<Money, riskguard_store::StoreError> {
        let session_date = self.tz.session_date(self.clock.now());
        Ok(self.store.get_daily_pnl(account, session_date).await?.realized_pnl)
    }

    pub async fn get_trade_count(&self, account: &AccountId) -> Result<u32, riskguard_store::StoreError> {
        let session_date = self.tz.session_date(self.clock.now());
        Ok(self.store.get_daily_pnl(account, session_date).await?.trade_count)
    }

    pub async fn reset_daily_pnl(&self, account: &AccountId) -> Result<(), riskguard_store::StoreError> {
        let session_date = self.tz.session_date(self.clock.now());
        self.store.reset_daily_pnl(account, session_date).await
    }
}
