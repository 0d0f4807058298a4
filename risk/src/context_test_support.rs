//! Minimal stub implementations of the `EngineContext` query/command
//! traits, shared by each rule's `#[cfg(test)]` module so individual rule
//! tests don't have to re-implement the full manager surface.

use crate::context::{
    CachedOrderInfo, ConnectionQuery, EngineContext, LockoutQuery, MarketDataQuery, PnlQuery, ProtectiveOrderQuery,
    ResetQuery, TickTableQuery, TimerCallback, TimerCommand, TradeFrequencyQuery,
};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use riskguard_sdk::{AccountId, ContractId, Money, Position, SymbolRoot, TickInfo};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct StubState {
    pub locked_out: bool,
    pub daily_pnl: Money,
    pub trade_count: u32,
    pub trade_count_within: u32,
    pub last_prices: HashMap<SymbolRoot, Money>,
    pub tick_table: HashMap<SymbolRoot, TickInfo>,
    pub stop_losses: HashMap<ContractId, CachedOrderInfo>,
    pub take_profits: HashMap<ContractId, CachedOrderInfo>,
    pub connected: bool,
    pub next_reset: Option<DateTime<Utc>>,
    pub started_timers: Mutex<Vec<(String, std::time::Duration, TimerCallback)>>,
    pub cancelled_timers: Mutex<Vec<String>>,
}

impl LockoutQuery for StubState {
    fn is_locked_out(&self, _account: &AccountId) -> bool {
        self.locked_out
    }
}

impl PnlQuery for StubState {
    fn daily_pnl(&self, _account: &AccountId) -> Money {
        self.daily_pnl
    }
    fn trade_count(&self, _account: &AccountId) -> u32 {
        self.trade_count
    }
}

impl TradeFrequencyQuery for StubState {
    fn trade_count_within(&self, _account: &AccountId, _window: Duration) -> u32 {
        self.trade_count_within
    }
}

impl ProtectiveOrderQuery for StubState {
    fn stop_loss(&self, contract_id: &ContractId) -> Option<CachedOrderInfo> {
        self.stop_losses.get(contract_id).copied()
    }
    fn take_profit(&self, contract_id: &ContractId) -> Option<CachedOrderInfo> {
        self.take_profits.get(contract_id).copied()
    }
}

impl MarketDataQuery for StubState {
    fn last_price(&self, symbol: &SymbolRoot) -> Option<Money> {
        self.last_prices.get(symbol).copied()
    }
}

impl TickTableQuery for StubState {
    fn tick_info(&self, symbol: &SymbolRoot) -> Option<TickInfo> {
        self.tick_table.get(symbol).copied()
    }
}

impl ConnectionQuery for StubState {
    fn is_connected(&self, _account: &AccountId) -> bool {
        self.connected
    }
}

impl ResetQuery for StubState {
    fn next_daily_reset(&self) -> DateTime<Utc> {
        self.next_reset.unwrap_or_else(Utc::now)
    }
}

impl TimerCommand for StubState {
    fn start_timer(&self, name: String, duration: std::time::Duration, callback: TimerCallback) {
        self.started_timers.lock().push((name, duration, callback));
    }
    fn cancel_timer(&self, name: &str) {
        self.cancelled_timers.lock().push(name.to_string());
    }
    fn has_timer(&self, name: &str) -> bool {
        self.started_timers.lock().iter().any(|(n, _, _)| n == name)
            && !self.cancelled_timers.lock().iter().any(|n| n == name)
    }
}

pub fn test_context<'a>(account: &'a AccountId, positions: &'a [Position], stub: &'a StubState) -> EngineContext<'a> {
    EngineContext {
        now: Utc::now(),
        account_id: account,
        positions,
        tick_table: stub,
        lockouts: stub,
        pnl: stub,
        trade_frequency: stub,
        protective_orders: stub,
        market_data: stub,
        connection: stub,
        timers: stub,
        reset: stub,
    }
}
