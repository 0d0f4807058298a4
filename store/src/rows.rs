//! Row shapes matching the schemas in spec §3/§6 exactly, including their
//! uniqueness constraints.

use chrono::{DateTime, NaiveDate, Utc};
use riskguard_sdk::{AccountId, Money};
use serde::{Deserialize, Serialize};

/// `daily_pnl(account_id, session_date, realized_pnl, trade_count)`,
/// unique on `(account_id, session_date)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPnlRow {
    pub account_id: AccountId,
    pub session_date: NaiveDate,
    pub realized_pnl: Money,
    pub trade_count: u32,
}

/// Lockout kind: `HARD` (expires at a fixed instant) or `COOLDOWN`
/// (internally a hard lockout whose `expires_at = now + duration`, §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockoutKind {
    Hard,
    Cooldown,
}

impl LockoutKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LockoutKind::Hard => "HARD",
            LockoutKind::Cooldown => "COOLDOWN",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "HARD" => Some(LockoutKind::Hard),
            "COOLDOWN" => Some(LockoutKind::Cooldown),
            _ => None,
        }
    }
}

/// Lockout reason category - the reset scheduler clears only rows whose
/// category is `Daily` (§4.7); cooldowns set by trade-frequency/loss rules
/// are `Cooldown` and expire on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockoutCategory {
    Daily,
    Cooldown,
}

impl LockoutCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            LockoutCategory::Daily => "daily",
            LockoutCategory::Cooldown => "cooldown",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "daily" => Some(LockoutCategory::Daily),
            "cooldown" => Some(LockoutCategory::Cooldown),
            _ => None,
        }
    }
}

/// `lockouts(account_id, rule_id, reason, locked_at, expires_at,
/// unlock_condition, active)`. At most one active row per account (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockoutRow {
    pub account_id: AccountId,
    pub rule_id: String,
    pub reason: String,
    pub locked_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub kind: LockoutKind,
    pub category: LockoutCategory,
    pub active: bool,
}

/// `trades(account_id, trade_id, symbol, side, quantity, price,
/// timestamp)`, unique on `trade_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRow {
    pub account_id: AccountId,
    pub trade_id: String,
    pub symbol: String,
    pub side: String,
    pub quantity: u32,
    pub price: Money,
    pub timestamp: DateTime<Utc>,
}

/// `reset_ledger(account_id, session_date, reset_kind)`, unique on
/// `(account_id, session_date, reset_kind)` - the idempotence mechanism
/// for the reset scheduler (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResetKind {
    Daily,
    Session,
}

impl ResetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResetKind::Daily => "daily",
            ResetKind::Session => "session",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResetLedgerRow {
    pub account_id: AccountId,
    pub session_date: NaiveDate,
    pub reset_kind: ResetKind,
}
