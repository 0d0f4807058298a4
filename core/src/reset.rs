//! Reset Scheduler (C7, §4.7). Idempotence is by ledger row, not by
//! clock - critical on DST spring-forward (target hour may not exist
//! locally) and fall-back (target hour occurs twice).

use crate::{clock::TzConverter, pnl::PnlTracker};
use chrono::{Duration, NaiveTime, Utc};
use riskguard_store::{ResetKind, ResetLedgerRow, Store};
use std::sync::Arc;

/// ±30s window around the computed target instant within which the
/// reset is allowed to fire (§4.7).
const RESET_WINDOW: Duration = Duration::seconds(30);

#[derive(Debug, Clone)]
pub struct ResetConfig {
    pub daily_reset_time: NaiveTime,
    pub tz: TzConverter,
}

pub struct ResetScheduler {
    config: ResetConfig,
    store: Arc<dyn Store>,
    pnl: Arc<PnlTracker>,
}

impl std::fmt::Debug for ResetScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResetScheduler").finish_non_exhaustive()
    }
}

impl ResetScheduler {
    pub fn new(config: ResetConfig, store: Arc<dyn Store>, pnl: Arc<PnlTracker>) -> Self {
        Self { config, store, pnl }
    }

    /// Called once a minute by the engine's scheduling loop (driven by
    /// the Timer Manager's sweep, not a separate loop - SPEC_FULL.md).
    /// Returns the accounts reset this tick, if any.
    pub async fn tick(&self) -> Result<Vec<riskguard_sdk::AccountId>, riskguard_store::StoreError> {
        let now = Utc::now();
        let target = self.config.tz.next_occurrence_of(self.config.daily_reset_time, now - Duration::minutes(2));
        if (now - target).abs() > RESET_WINDOW {
            return Ok(Vec::new());
        }
        self.execute_reset(now).await
    }

    /// Shares the ledger-gated path with the scheduled tick (§4.7).
    pub async fn trigger_reset_manually(&self) -> Result<Vec<riskguard_sdk::AccountId>, riskguard_store::StoreError> {
        self.execute_reset(Utc::now()).await
    }

    async fn execute_reset(&self, now: chrono::DateTime<Utc>) -> Result<Vec<riskguard_sdk::AccountId>, riskguard_store::StoreError> {
        let session_date = self.config.tz.session_date(now);
        let mut reset_accounts = Vec::new();

        for account in self.store.list_known_accounts().await? {
            if self.store.has_reset_ledger_row(&account, session_date, ResetKind::Daily).await? {
                continue;
            }
            self.pnl.reset_daily_pnl(&account).await?;
            self.store
                .insert_reset_ledger_row(ResetLedgerRow {
                    account_id: account.clone(),
                    session_date,
                    reset_kind: ResetKind::Daily,
                })
                .await?;
            reset_accounts.push(account);
        }

        if !reset_accounts.is_empty() {
            self.store.clear_daily_lockouts().await?;
            tracing::info!(accounts = reset_accounts.len(), session_date = %session_date, "daily reset executed");
        }
        Ok(reset_accounts)
    }
}
