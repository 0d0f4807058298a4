//! Lockout Manager (C5, §4.5). Hard lockouts (fixed `expires_at`) and
//! cooldowns (internally a hard lockout whose `expires_at = now +
//! duration`) backed by [`riskguard_store::Store`], with the Timer
//! Manager's 1s sweep as an idempotent fallback unlock path alongside
//! `is_locked_out`'s own lazy-expiry check (SPEC_FULL.md's supplemental
//! note: whichever path clears it first wins, the other is a no-op).

use chrono::{DateTime, Duration, Utc};
use riskguard_risk::{context::LockoutCommand, rule_id::RuleId};
use riskguard_sdk::AccountId;
use riskguard_store::{LockoutCategory, LockoutKind, LockoutRow, Store};
use std::sync::Arc;

/// Read-only snapshot of an account's lockout, for the admin `status`/
/// `lockout list` surface (§6, SUPPLEMENTAL).
#[derive(Debug, Clone, PartialEq)]
pub struct LockoutInfo {
    pub reason: String,
    pub locked_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub kind: LockoutKind,
}

pub struct LockoutManager {
    store: Arc<dyn Store>,
}

impl std::fmt::Debug for LockoutManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockoutManager").finish_non_exhaustive()
    }
}

impl LockoutManager {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Reloads active lockouts on process start (§4.5), marking expired
    /// rows inactive as it goes.
    pub async fn load_active(&self) -> Result<u32, riskguard_store::StoreError> {
        let now = Utc::now();
        let mut live = 0;
        for row in self.store.get_all_active_lockouts().await? {
            if row.expires_at <= now {
                self.store.clear_lockout(&row.account_id).await?;
            } else {
                live += 1;
            }
        }
        Ok(live)
    }

    pub async fn set_lockout(
        &self,
        account: &AccountId,
        rule: RuleId,
        reason: &str,
        until: DateTime<Utc>,
    ) -> Result<(), riskguard_store::StoreError> {
        self.store
            .upsert_lockout(account, rule.as_str(), reason, Utc::now(), until, LockoutKind::Hard, LockoutCategory::Daily)
            .await
    }

    pub async fn set_cooldown(
        &self,
        account: &AccountId,
        rule: RuleId,
        reason: &str,
        duration: Duration,
    ) -> Result<(), riskguard_store::StoreError> {
        let now = Utc::now();
        self.store
            .upsert_lockout(
                account,
                rule.as_str(),
                reason,
                now,
                now + duration,
                LockoutKind::Cooldown,
                LockoutCategory::Cooldown,
            )
            .await
    }

    /// True iff an active lockout exists with `expires_at > now`; an
    /// expired record found along the way is cleared transactionally
    /// before returning `false` (§4.5).
    pub async fn is_locked_out(&self, account: &AccountId) -> Result<bool, riskguard_store::StoreError> {
        match self.store.get_active_lockout(account).await? {
            Some(row) if row.expires_at > Utc::now() => Ok(true),
            Some(_) => {
                self.store.clear_lockout(account).await?;
                Ok(false)
            }
            None => Ok(false),
        }
    }

    pub async fn clear_lockout(&self, account: &AccountId) -> Result<(), riskguard_store::StoreError> {
        self.store.clear_lockout(account).await
    }

    pub async fn get_lockout_info(&self, account: &AccountId) -> Result<Option<LockoutInfo>, riskguard_store::StoreError> {
        Ok(self.store.get_active_lockout(account).await?.map(|row: LockoutRow| LockoutInfo {
            reason: row.reason,
            locked_at: row.locked_at,
            expires_at: row.expires_at,
            kind: row.kind,
        }))
    }

    pub async fn get_remaining_time(&self, account: &AccountId) -> Result<Option<Duration>, riskguard_store::StoreError> {
        Ok(self
            .store
            .get_active_lockout(account)
            .await?
            .map(|row| row.expires_at - Utc::now())
            .filter(|d| *d > Duration::zero()))
    }

    /// Clears every active daily-category lockout - the Reset Scheduler's
    /// hook (§4.7). Cooldowns are left to expire on their own.
    pub async fn clear_daily_lockouts(&self) -> Result<u32, riskguard_store::StoreError> {
        self.store.clear_daily_lockouts().await
    }
}

/// Synchronous [`LockoutCommand`] adapter for rule `enforce` calls, which
/// cannot await (§9's borrowed-context pattern). Mutations are queued and
/// flushed by the engine loop immediately after the enforce call returns,
/// keeping all state mutation pinned to the one engine task (§5).
pub struct QueuedLockoutCommand {
    queue: parking_lot::Mutex<Vec<QueuedLockoutOp>>,
}

enum QueuedLockoutOp {
    SetLockout { account: AccountId, rule: RuleId, reason: String, until: DateTime<Utc> },
    SetCooldown { account: AccountId, rule: RuleId, reason: String, duration: Duration },
}

impl Default for QueuedLockoutCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl QueuedLockoutCommand {
    pub fn new() -> Self {
        Self { queue: parking_lot::Mutex::new(Vec::new()) }
    }

    /// Applies every queued mutation against the real manager, in order,
    /// then clears the queue.
    pub async fn flush(&self, manager: &LockoutManager) -> Result<(), riskguard_store::StoreError> {
        let ops = std::mem::take(&mut *self.queue.lock());
        for op in ops {
            match op {
                QueuedLockoutOp::SetLockout { account, rule, reason, until } => {
                    manager.set_lockout(&account, rule, &reason, until).await?;
                }
                QueuedLockoutOp::SetCooldown { account, rule, reason, duration } => {
                    manager.set_cooldown(&account, rule, &reason, duration).await?;
                }
            }
        }
        Ok(())
    }
}

impl LockoutCommand for QueuedLockoutCommand {
    fn set_lockout(&self, account: &AccountId, rule: RuleId, reason: &str, until: DateTime<Utc>) {
        self.queue.lock().push(QueuedLockoutOp::SetLockout {
            account: account.clone(),
            rule,
            reason: reason.to_string(),
            until,
        });
    }

    fn set_cooldown(&self, account: &AccountId, rule: RuleId, reason: &str, duration: Duration) {
        self.queue.lock().push(QueuedLockoutOp::SetCooldown {
            account: account.clone(),
            rule,
            reason: reason.to_string(),
            duration,
        });
    }
}
