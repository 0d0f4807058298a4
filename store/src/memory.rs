//! In-memory [`Store`] double, for unit tests that shouldn't touch disk.

use crate::{
    error::StoreError,
    rows::{DailyPnlRow, LockoutCategory, LockoutKind, LockoutRow, ResetKind, ResetLedgerRow, TradeRow},
    traits::Store,
};
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use riskguard_sdk::{AccountId, Money};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
struct Inner {
    daily_pnl: HashMap<(AccountId, NaiveDate), DailyPnlRow>,
    lockouts: HashMap<AccountId, LockoutRow>,
    trades: Vec<TradeRow>,
    reset_ledger: HashSet<(AccountId, NaiveDate, &'static str)>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn add_daily_pnl(
        &self,
        account: &AccountId,
        session_date: NaiveDate,
        delta: Money,
    ) -> Result<Money, StoreError> {
        let mut inner = self.inner.lock();
        let row = inner
            .daily_pnl
            .entry((account.clone(), session_date))
            .or_insert_with(|| DailyPnlRow {
                account_id: account.clone(),
                session_date,
                realized_pnl: Money::ZERO,
                trade_count: 0,
            });
        row.realized_pnl += delta;
        row.trade_count += 1;
        Ok(row.realized_pnl)
    }

    async fn get_daily_pnl(&self, account: &AccountId, session_date: NaiveDate) -> Result<DailyPnlRow, StoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .daily_pnl
            .get(&(account.clone(), session_date))
            .cloned()
            .unwrap_or(DailyPnlRow {
                account_id: account.clone(),
                session_date,
                realized_pnl: Money::ZERO,
                trade_count: 0,
            }))
    }

    async fn reset_daily_pnl(&self, account: &AccountId, session_date: NaiveDate) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.daily_pnl.insert(
            (account.clone(), session_date),
            DailyPnlRow {
                account_id: account.clone(),
                session_date,
                realized_pnl: Money::ZERO,
                trade_count: 0,
            },
        );
        Ok(())
    }

    async fn list_known_accounts(&self) -> Result<Vec<AccountId>, StoreError> {
        let inner = self.inner.lock();
        let mut accounts: Vec<AccountId> = inner.daily_pnl.keys().map(|(a, _)| a.clone()).collect();
        accounts.sort();
        accounts.dedup();
        Ok(accounts)
    }

    async fn upsert_lockout(
        &self,
        account: &AccountId,
        rule_id: &str,
        reason: &str,
        locked_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        kind: LockoutKind,
        category: LockoutCategory,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.lockouts.insert(
            account.clone(),
            LockoutRow {
                account_id: account.clone(),
                rule_id: rule_id.to_string(),
                reason: reason.to_string(),
                locked_at,
                expires_at,
                kind,
                category,
                active: true,
            },
        );
        Ok(())
    }

    async fn get_active_lockout(&self, account: &AccountId) -> Result<Option<LockoutRow>, StoreError> {
        let inner = self.inner.lock();
        Ok(inner.lockouts.get(account).filter(|row| row.active).cloned())
    }

    async fn get_all_active_lockouts(&self) -> Result<Vec<LockoutRow>, StoreError> {
        let inner = self.inner.lock();
        Ok(inner.lockouts.values().filter(|row| row.active).cloned().collect())
    }

    async fn clear_lockout(&self, account: &AccountId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if let Some(row) = inner.lockouts.get_mut(account) {
            row.active = false;
        }
        Ok(())
    }

    async fn clear_daily_lockouts(&self) -> Result<u32, StoreError> {
        let mut inner = self.inner.lock();
        let mut cleared = 0;
        for row in inner.lockouts.values_mut() {
            if row.active && matches!(row.category, LockoutCategory::Daily) {
                row.active = false;
                cleared += 1;
            }
        }
        Ok(cleared)
    }

    async fn insert_trade(&self, trade: TradeRow) -> Result<(), StoreError> {
        self.inner.lock().trades.push(trade);
        Ok(())
    }

    async fn get_trade_count(&self, account: &AccountId, session_date: NaiveDate) -> Result<u32, StoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .trades
            .iter()
            .filter(|t| &t.account_id == account && t.timestamp.date_naive() == session_date)
            .count() as u32)
    }

    async fn count_trades_since(&self, account: &AccountId, since: DateTime<Utc>) -> Result<u32, StoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .trades
            .iter()
            .filter(|t| &t.account_id == account && t.timestamp >= since)
            .count() as u32)
    }

    async fn has_reset_ledger_row(
        &self,
        account: &AccountId,
        session_date: NaiveDate,
        kind: ResetKind,
    ) -> Result<bool, StoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .reset_ledger
            .contains(&(account.clone(), session_date, kind.as_str())))
    }

    async fn insert_reset_ledger_row(&self, row: ResetLedgerRow) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner
            .reset_ledger
            .insert((row.account_id, row.session_date, row.reset_kind.as_str()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn add_daily_pnl_accumulates_and_reset_zeroes() {
        let store = MemoryStore::new();
        let account = AccountId::from("acct-1".to_string());
        let date = Utc.with_ymd_and_hms(2026, 7, 28, 0, 0, 0).unwrap().date_naive();

        let total = store.add_daily_pnl(&account, date, Money::from(-700)).await.unwrap();
        assert_eq!(total, Money::from(-700));
        let total = store.add_daily_pnl(&account, date, Money::from(-400)).await.unwrap();
        assert_eq!(total, Money::from(-1100));

        store.reset_daily_pnl(&account, date).await.unwrap();
        let row = store.get_daily_pnl(&account, date).await.unwrap();
        assert_eq!(row.realized_pnl, Money::ZERO);
        assert_eq!(row.trade_count, 0);
    }

    #[tokio::test]
    async fn reset_ledger_is_idempotent_per_kind() {
        let store = MemoryStore::new();
        let account = AccountId::from("acct-1".to_string());
        let date = Utc.with_ymd_and_hms(2026, 7, 28, 0, 0, 0).unwrap().date_naive();

        assert!(!store.has_reset_ledger_row(&account, date, ResetKind::Daily).await.unwrap());
        store
            .insert_reset_ledger_row(ResetLedgerRow {
                account_id: account.clone(),
                session_date: date,
                reset_kind: ResetKind::Daily,
            })
            .await
            .unwrap();
        assert!(store.has_reset_ledger_row(&account, date, ResetKind::Daily).await.unwrap());
    }
}
