//! The borrowed, per-evaluation context rules read from and write side
//! effects through (§9, "Cyclic ownership ... rules receive a lightweight
//! borrowed context object at evaluation time rather than holding
//! long-lived references to engine internals").
//!
//! Each trait here is implemented by a concrete manager living in
//! `riskguard-core`; `riskguard-risk` never depends on `riskguard-core`,
//! which is what keeps `core -> risk` from becoming a cycle.

use crate::rule_id::RuleId;
use chrono::{DateTime, Duration, Utc};
use riskguard_sdk::{AccountId, ContractId, Money, OrderId, Position, SymbolRoot, TickInfo};

/// Read-only lockout check (§4.5): "an account that is already in a hard
/// lockout short-circuits rules that check it".
pub trait LockoutQuery {
    fn is_locked_out(&self, account: &AccountId) -> bool;
}

/// Read-only daily P&L / trade-count check (§4.6).
pub trait PnlQuery {
    fn daily_pnl(&self, account: &AccountId) -> Money;
    fn trade_count(&self, account: &AccountId) -> u32;
}

/// Rolling trade-count windows for `trade_frequency_limit` (§4.11 #6):
/// "rolling counts come from the trade store, not event-local counters".
pub trait TradeFrequencyQuery {
    fn trade_count_within(&self, account: &AccountId, window: Duration) -> u32;
}

/// A working protective order as the cache (C8) currently knows it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedOrderInfo {
    pub order_id_present: bool,
    pub price: rust_decimal::Decimal,
}

/// Read-only protective-order cache lookups (§4.8). Implementations are
/// responsible for the on-demand SDK fallback query and the invalidate-on-
/// `POSITION_UPDATED` rule themselves - by the time a rule calls this, the
/// answer must already be synchronously available (§5: rules decide
/// without suspending).
pub trait ProtectiveOrderQuery {
    fn stop_loss(&self, contract_id: &ContractId) -> Option<CachedOrderInfo>;
    fn take_profit(&self, contract_id: &ContractId) -> Option<CachedOrderInfo>;
}

/// Read-only last-price lookups (§4.9).
pub trait MarketDataQuery {
    fn last_price(&self, symbol: &SymbolRoot) -> Option<Money>;
}

/// Read-only tick economics lookups (§3).
pub trait TickTableQuery {
    fn tick_info(&self, symbol: &SymbolRoot) -> Option<TickInfo>;
}

/// Read-only SDK connection state, for `auth_loss_guard` (§4.11 #10).
pub trait ConnectionQuery {
    fn is_connected(&self, account: &AccountId) -> bool;
}

/// The next daily-reset instant, for `daily_realized_loss`/
/// `daily_realized_profit`'s `lockout_until` (§4.11 #3/#13: "hard-lockout
/// until next reset").
pub trait ResetQuery {
    fn next_daily_reset(&self) -> DateTime<Utc>;
}

/// What should happen when a rule-started timer fires. Carried as data
/// (rather than a boxed closure) because the callback set is closed and
/// small, and because it must be `Send` across the timer sweep task
/// without dragging rule state along with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerCallback {
    /// `no_stop_loss_grace` (§4.11 #8): close the position if no stop-loss
    /// was classified before the grace period elapsed.
    CloseOnGraceExpiry {
        account_id: AccountId,
        symbol: SymbolRoot,
        contract_id: ContractId,
    },
}

/// Side-effecting timer operations a rule's `evaluate` may need (starting
/// a grace-period timer on `POSITION_OPENED`, cancelling it once a stop
/// loss shows up). Implementations use interior mutability so the trait
/// can be called through a shared `&dyn` reference (§9).
pub trait TimerCommand {
    fn start_timer(&self, name: String, duration: std::time::Duration, callback: TimerCallback);
    fn cancel_timer(&self, name: &str);
    fn has_timer(&self, name: &str) -> bool;
}

/// The borrowed context passed to [`crate::Rule::evaluate`].
pub struct EngineContext<'a> {
    pub now: DateTime<Utc>,
    pub account_id: &'a AccountId,
    /// Currently open positions for `account_id`, keyed by contract.
    pub positions: &'a [Position],
    pub tick_table: &'a dyn TickTableQuery,
    pub lockouts: &'a dyn LockoutQuery,
    pub pnl: &'a dyn PnlQuery,
    pub trade_frequency: &'a dyn TradeFrequencyQuery,
    pub protective_orders: &'a dyn ProtectiveOrderQuery,
    pub market_data: &'a dyn MarketDataQuery,
    pub connection: &'a dyn ConnectionQuery,
    pub timers: &'a dyn TimerCommand,
    pub reset: &'a dyn ResetQuery,
}

impl<'a> EngineContext<'a> {
    pub fn position(&self, contract_id: &ContractId) -> Option<&Position> {
        self.positions.iter().find(|p| &p.contract_id == contract_id)
    }

    pub fn sum_abs_size(&self) -> u32 {
        self.positions.iter().map(|p| p.quantity).sum()
    }

    pub fn abs_size_for_symbol(&self, symbol: &SymbolRoot) -> u32 {
        self.positions
            .iter()
            .filter(|p| &p.symbol_root == symbol)
            .map(|p| p.quantity)
            .sum()
    }
}

/// Side-effecting lockout/cooldown commands, called from `enforce` (§4.5).
pub trait LockoutCommand {
    fn set_lockout(&self, account: &AccountId, rule: RuleId, reason: &str, until: DateTime<Utc>);
    fn set_cooldown(&self, account: &AccountId, rule: RuleId, reason: &str, duration: Duration);
}

/// What the `trade_management` automation rule resolves to, carried on a
/// distinct channel from `ResolvedAction` (§4.11 #12).
pub use crate::violation::AutomationAction;

/// The fully resolved action an [`crate::Rule::enforce`] call hands to the
/// executor - one step more concrete than [`crate::violation::ActionKind`]
/// since it carries the target identifiers the executor needs.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedAction {
    ClosePosition {
        symbol: SymbolRoot,
        contract_id: ContractId,
        reason: String,
    },
    Flatten {
        symbol: Option<SymbolRoot>,
    },
    FlattenAndCancel {
        symbol: Option<SymbolRoot>,
    },
    Cancel {
        symbol: SymbolRoot,
        order_id: OrderId,
    },
    CancelAll {
        symbol: Option<SymbolRoot>,
    },
    AlertOnly {
        message: String,
    },
    Automation(AutomationAction),
}

/// Mutable sink `enforce` writes resolved actions and lockout/cooldown
/// requests into.
pub struct EnforcementContext<'a> {
    pub actions: Vec<ResolvedAction>,
    pub lockouts: &'a dyn LockoutCommand,
}

impl<'a> EnforcementContext<'a> {
    pub fn new(lockouts: &'a dyn LockoutCommand) -> Self {
        Self {
            actions: Vec::new(),
            lockouts,
        }
    }

    /// Default enforcement: turn the violation's coarse `action` into a
    /// `ResolvedAction` and apply any lockout/cooldown it calls for. Most
    /// rules can just call this; a few (`trade_management`) override it
    /// entirely.
    pub fn apply_default(&mut self, violation: &crate::violation::Violation) {
        use crate::violation::ActionKind;

        let resolved = match violation.action {
            ActionKind::ClosePosition => violation.symbol.clone().zip(violation.contract_id.clone()).map(
                |(symbol, contract_id)| ResolvedAction::ClosePosition {
                    symbol,
                    contract_id,
                    reason: violation.message.clone(),
                },
            ),
            ActionKind::Flatten => Some(ResolvedAction::Flatten {
                symbol: violation.symbol.clone(),
            }),
            ActionKind::FlattenAndCancel => Some(ResolvedAction::FlattenAndCancel {
                symbol: violation.symbol.clone(),
            }),
            ActionKind::Cancel => violation.symbol.clone().zip(violation.order_id.clone()).map(
                |(symbol, order_id)| ResolvedAction::Cancel { symbol, order_id },
            ),
            ActionKind::Cooldown => None,
            ActionKind::AlertOnly => Some(ResolvedAction::AlertOnly {
                message: violation.message.clone(),
            }),
        };
        if let Some(action) = resolved {
            self.actions.push(action);
        }

        if violation.lockout_required {
            if let Some(until) = violation.lockout_until {
                self.lockouts
                    .set_lockout(&violation.account_id, violation.rule, &violation.message, until);
            }
        }
        if let Some(seconds) = violation.cooldown_seconds {
            self.lockouts.set_cooldown(
                &violation.account_id,
                violation.rule,
                &violation.message,
                Duration::seconds(seconds as i64),
            );
        }
    }
}
