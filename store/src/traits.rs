use crate::{
    error::StoreError,
    rows::{DailyPnlRow, LockoutCategory, LockoutKind, LockoutRow, ResetKind, ResetLedgerRow, TradeRow},
};
use chrono::{DateTime, NaiveDate, Utc};
use riskguard_sdk::{AccountId, Money};

/// Durable storage for P&L, lockouts, trade history, and the reset ledger
/// (C1, §6). All operations are fallible and meant to be awaited from the
/// single engine task; the `rusqlite`-backed implementation moves the
/// actual blocking I/O onto `spawn_blocking` so this trait can stay async
/// without inventing a fake async SQL driver (SPEC_FULL.md).
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// Adds `delta` to the account's running total for `session_date`,
    /// creating the row lazily on first trade (§4.6). Returns the new
    /// total.
    async fn add_daily_pnl(
        &self,
        account: &AccountId,
        session_date: NaiveDate,
        delta: Money,
    ) -> Result<Money, StoreError>;

    async fn get_daily_pnl(&self, account: &AccountId, session_date: NaiveDate) -> Result<DailyPnlRow, StoreError>;

    async fn reset_daily_pnl(&self, account: &AccountId, session_date: NaiveDate) -> Result<(), StoreError>;

    /// All accounts with a daily_pnl row - used by the reset scheduler to
    /// know which accounts to reset (§4.7).
    async fn list_known_accounts(&self) -> Result<Vec<AccountId>, StoreError>;

    /// Replaces any existing lockout for the account (§4.5: "at most one
    /// active lockout per account ... setting a new one replaces the
    /// previous").
    async fn upsert_lockout(
        &self,
        account: &AccountId,
        rule_id: &str,
        reason: &str,
        locked_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        kind: LockoutKind,
        category: LockoutCategory,
    ) -> Result<(), StoreError>;

    async fn get_active_lockout(&self, account: &AccountId) -> Result<Option<LockoutRow>, StoreError>;

    async fn get_all_active_lockouts(&self) -> Result<Vec<LockoutRow>, StoreError>;

    async fn clear_lockout(&self, account: &AccountId) -> Result<(), StoreError>;

    /// Clears every active lockout whose category is `daily` - used by the
    /// reset scheduler (§4.7). Cooldown lockouts are left to expire on
    /// their own.
    async fn clear_daily_lockouts(&self) -> Result<u32, StoreError>;

    async fn insert_trade(&self, trade: TradeRow) -> Result<(), StoreError>;

    async fn get_trade_count(&self, account: &AccountId, session_date: NaiveDate) -> Result<u32, StoreError>;

    /// Rolling trade count for an account within `window` ending now - used
    /// by `trade_frequency_limit` (§4.11 #6), since "rolling counts come
    /// from the trade store, not event-local counters".
    async fn count_trades_since(
        &self,
        account: &AccountId,
        since: DateTime<Utc>,
    ) -> Result<u32, StoreError>;

    async fn has_reset_ledger_row(
        &self,
        account: &AccountId,
        session_date: NaiveDate,
        kind: ResetKind,
    ) -> Result<bool, StoreError>;

    async fn insert_reset_ledger_row(&self, row: ResetLedgerRow) -> Result<(), StoreError>;

    /// Flushes any buffered writes before shutdown (§5). A no-op for
    /// stores that write synchronously on every mutation.
    async fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
