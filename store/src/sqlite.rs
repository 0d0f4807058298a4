//! `rusqlite`-backed [`Store`] implementation. `rusqlite` is synchronous;
//! every call moves onto `spawn_blocking` so the store can be awaited from
//! the engine's single task without blocking it (§5, SPEC_FULL.md).

use crate::{
    error::StoreError,
    rows::{DailyPnlRow, LockoutCategory, LockoutKind, LockoutRow, ResetKind, ResetLedgerRow, TradeRow},
    traits::Store,
};
use chrono::{DateTime, NaiveDate, Utc};
use riskguard_sdk::{AccountId, Money};
use rusqlite::{params, Connection, OptionalExtension};
use std::{path::Path, str::FromStr, sync::Arc};
use tokio::task;

pub struct SqliteStore {
    conn: Arc<std::sync::Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS daily_pnl (
    account_id TEXT NOT NULL,
    session_date TEXT NOT NULL,
    realized_pnl TEXT NOT NULL,
    trade_count INTEGER NOT NULL,
    PRIMARY KEY (account_id, session_date)
);

CREATE TABLE IF NOT EXISTS lockouts (
    account_id TEXT PRIMARY KEY,
    rule_id TEXT NOT NULL,
    reason TEXT NOT NULL,
    locked_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    kind TEXT NOT NULL,
    category TEXT NOT NULL,
    active INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_lockouts_active ON lockouts(active, account_id);

CREATE TABLE IF NOT EXISTS trades (
    account_id TEXT NOT NULL,
    trade_id TEXT NOT NULL UNIQUE,
    symbol TEXT NOT NULL,
    side TEXT NOT NULL,
    quantity INTEGER NOT NULL,
    price TEXT NOT NULL,
    timestamp TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_trades_account_time ON trades(account_id, timestamp);

CREATE TABLE IF NOT EXISTS reset_ledger (
    account_id TEXT NOT NULL,
    session_date TEXT NOT NULL,
    reset_kind TEXT NOT NULL,
    PRIMARY KEY (account_id, session_date, reset_kind)
);
"#;

fn parse_decimal(column: &'static str, value: &str) -> Result<Money, StoreError> {
    Money::from_str(value).map_err(|_| StoreError::InvalidDecimal {
        column,
        value: value.to_string(),
    })
}

fn parse_timestamp(column: &'static str, value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StoreError::InvalidTimestamp {
            column,
            value: value.to_string(),
        })
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(std::sync::Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(std::sync::Mutex::new(conn)),
        })
    }

    /// Runs `f` with the connection locked, on a blocking thread.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        task::spawn_blocking(move || {
            let guard = conn.lock().unwrap_or_else(|poison| poison.into_inner());
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::TaskJoin(e.to_string()))?
    }
}

#[async_trait::async_trait]
impl Store for SqliteStore {
    async fn add_daily_pnl(
        &self,
        account: &AccountId,
        session_date: NaiveDate,
        delta: Money,
    ) -> Result<Money, StoreError> {
        // rusqlite/SQLite can't do decimal arithmetic server-side, so this
        // is a read-modify-write inside one transaction rather than a
        // single `UPDATE ... SET x = x + ?`.
        let account = account.clone();
        self.with_conn(move |conn| {
            let tx = conn.unchecked_transaction()?;
            let existing: Option<(String, i64)> = tx
                .query_row(
                    "SELECT realized_pnl, trade_count FROM daily_pnl WHERE account_id = ?1 AND session_date = ?2",
                    params![account.as_str(), session_date.to_string()],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            let (current, count) = match existing {
                Some((pnl, count)) => (parse_decimal("daily_pnl.realized_pnl", &pnl)?, count),
                None => (Money::ZERO, 0),
            };
            let new_total = current + delta;
            let new_count = count + 1;
            tx.execute(
                "INSERT INTO daily_pnl (account_id, session_date, realized_pnl, trade_count)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(account_id, session_date) DO UPDATE SET
                   realized_pnl = excluded.realized_pnl,
                   trade_count = excluded.trade_count",
                params![account.as_str(), session_date.to_string(), new_total.to_string(), new_count],
            )?;
            tx.commit()?;
            Ok(new_total)
        })
        .await
    }

    async fn get_daily_pnl(&self, account: &AccountId, session_date: NaiveDate) -> Result<DailyPnlRow, StoreError> {
        let account = account.clone();
        self.with_conn(move |conn| {
            let row: Option<(String, i64)> = conn
                .query_row(
                    "SELECT realized_pnl, trade_count FROM daily_pnl WHERE account_id = ?1 AND session_date = ?2",
                    params![account.as_str(), session_date.to_string()],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            let (pnl, count) = match row {
                Some((pnl, count)) => (parse_decimal("daily_pnl.realized_pnl", &pnl)?, count as u32),
                None => (Money::ZERO, 0),
            };
            Ok(DailyPnlRow {
                account_id: account,
                session_date,
                realized_pnl: pnl,
                trade_count: count,
            })
        })
        .await
    }

    async fn reset_daily_pnl(&self, account: &AccountId, session_date: NaiveDate) -> Result<(), StoreError> {
        let account = account.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO daily_pnl (account_id, session_date, realized_pnl, trade_count)
                 VALUES (?1, ?2, '0', 0)
                 ON CONFLICT(account_id, session_date) DO UPDATE SET realized_pnl = '0', trade_count = 0",
                params![account.as_str(), session_date.to_string()],
            )?;
            Ok(())
        })
        .await
    }

    async fn list_known_accounts(&self) -> Result<Vec<AccountId>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT DISTINCT account_id FROM daily_pnl")?;
            let accounts = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(accounts.into_iter().map(AccountId::from).collect())
        })
        .await
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
        let account = account.clone();
        let rule_id = rule_id.to_string();
        let reason = reason.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO lockouts (account_id, rule_id, reason, locked_at, expires_at, kind, category, active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1)
                 ON CONFLICT(account_id) DO UPDATE SET
                   rule_id = excluded.rule_id, reason = excluded.reason, locked_at = excluded.locked_at,
                   expires_at = excluded.expires_at, kind = excluded.kind, category = excluded.category,
                   active = 1",
                params![
                    account.as_str(),
                    rule_id,
                    reason,
                    locked_at.to_rfc3339(),
                    expires_at.to_rfc3339(),
                    kind.as_str(),
                    category.as_str(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_active_lockout(&self, account: &AccountId) -> Result<Option<LockoutRow>, StoreError> {
        let account = account.clone();
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    "SELECT rule_id, reason, locked_at, expires_at, kind, category, active
                     FROM lockouts WHERE account_id = ?1 AND active = 1",
                    params![account.as_str()],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, String>(4)?,
                            row.get::<_, String>(5)?,
                            row.get::<_, bool>(6)?,
                        ))
                    },
                )
                .optional()?;
            row.map(|(rule_id, reason, locked_at, expires_at, kind, category, active)| {
                Ok(LockoutRow {
                    account_id: account.clone(),
                    rule_id,
                    reason,
                    locked_at: parse_timestamp("lockouts.locked_at", &locked_at)?,
                    expires_at: parse_timestamp("lockouts.expires_at", &expires_at)?,
                    kind: LockoutKind::parse(&kind).unwrap_or(LockoutKind::Hard),
                    category: LockoutCategory::parse(&category).unwrap_or(LockoutCategory::Daily),
                    active,
                })
            })
            .transpose()
        })
        .await
    }

    async fn get_all_active_lockouts(&self) -> Result<Vec<LockoutRow>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT account_id, rule_id, reason, locked_at, expires_at, kind, category, active
                 FROM lockouts WHERE active = 1",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, bool>(7)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter()
                .map(|(account_id, rule_id, reason, locked_at, expires_at, kind, category, active)| {
                    Ok(LockoutRow {
                        account_id: AccountId::from(account_id),
                        rule_id,
                        reason,
                        locked_at: parse_timestamp("lockouts.locked_at", &locked_at)?,
                        expires_at: parse_timestamp("lockouts.expires_at", &expires_at)?,
                        kind: LockoutKind::parse(&kind).unwrap_or(LockoutKind::Hard),
                        category: LockoutCategory::parse(&category).unwrap_or(LockoutCategory::Daily),
                        active,
                    })
                })
                .collect()
        })
        .await
    }

    async fn clear_lockout(&self, account: &AccountId) -> Result<(), StoreError> {
        let account = account.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE lockouts SET active = 0 WHERE account_id = ?1",
                params![account.as_str()],
            )?;
            Ok(())
        })
        .await
    }

    async fn clear_daily_lockouts(&self) -> Result<u32, StoreError> {
        self.with_conn(|conn| {
            let count = conn.execute(
                "UPDATE lockouts SET active = 0 WHERE active = 1 AND category = 'daily'",
                [],
            )?;
            Ok(count as u32)
        })
        .await
    }

    async fn insert_trade(&self, trade: TradeRow) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO trades (account_id, trade_id, symbol, side, quantity, price, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    trade.account_id.as_str(),
                    trade.trade_id,
                    trade.symbol,
                    trade.side,
                    trade.quantity,
                    trade.price.to_string(),
                    trade.timestamp.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_trade_count(&self, account: &AccountId, session_date: NaiveDate) -> Result<u32, StoreError> {
        let account = account.clone();
        let prefix = session_date.to_string();
        self.with_conn(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM trades WHERE account_id = ?1 AND timestamp LIKE ?2",
                params![account.as_str(), format!("{prefix}%")],
                |row| row.get(0),
            )?;
            Ok(count as u32)
        })
        .await
    }

    async fn count_trades_since(&self, account: &AccountId, since: DateTime<Utc>) -> Result<u32, StoreError> {
        let account = account.clone();
        self.with_conn(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM trades WHERE account_id = ?1 AND timestamp >= ?2",
                params![account.as_str(), since.to_rfc3339()],
                |row| row.get(0),
            )?;
            Ok(count as u32)
        })
        .await
    }

    async fn has_reset_ledger_row(
        &self,
        account: &AccountId,
        session_date: NaiveDate,
        kind: ResetKind,
    ) -> Result<bool, StoreError> {
        let account = account.clone();
        self.with_conn(move |conn| {
            let exists: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM reset_ledger WHERE account_id = ?1 AND session_date = ?2 AND reset_kind = ?3",
                    params![account.as_str(), session_date.to_string(), kind.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(exists.is_some())
        })
        .await
    }

    async fn insert_reset_ledger_row(&self, row: ResetLedgerRow) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO reset_ledger (account_id, session_date, reset_kind) VALUES (?1, ?2, ?3)",
                params![row.account_id.as_str(), row.session_date.to_string(), row.reset_kind.as_str()],
            )?;
            Ok(())
        })
        .await
    }

    async fn flush(&self) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);").ok();
            Ok(())
        })
        .await
    }
}
