//! Risk Engine (C12, §4.11-§4.12). Owns the rule registry and the
//! per-account position book, fans every bus event out to the thirteen
//! rules plus `trade_management`'s automation channel, and hands the
//! resulting actions to the [`crate::executor::EnforcementExecutor`].
//!
//! State mutation is pinned to this single consumer (§5, §9): the bridge
//! and the SDK callbacks only ever produce [`Event`]s onto the bus, and
//! everything that reads or writes position/P&L/lockout/cache state does
//! so from inside [`RiskEngine::process_event`].

use crate::{
    bridge::SdkEventBridge,
    clock::{EngineClock, TzConverter},
    error::EngineError,
    lockout::{LockoutManager, QueuedLockoutCommand},
    market_data::{MarketDataSubsystem, QuoteOutcome},
    pnl::PnlTracker,
    protective_orders::ProtectiveOrderCache,
    reset::{ResetConfig, ResetScheduler},
    timer::TimerManager,
};
use crate::executor::EnforcementExecutor;
use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Utc};
use parking_lot::Mutex;
use riskguard_integration::collection::FnvIndexMap;
use riskguard_risk::{
    context::{ConnectionQuery, EngineContext, EnforcementContext, LockoutQuery, PnlQuery, ResetQuery, ResolvedAction, TickTableQuery, TimerCallback, TradeFrequencyQuery},
    AutomationRule, Rule,
};
use riskguard_sdk::{
    event::{MarketDataUpdated, QuoteUpdate, UnrealizedPnlUpdate},
    raw::RawSdkCallback,
    AccountId, BrokerSdk, ContractId, Event, EventKind, EventSource, Money, Position, SymbolRoot, TickInfo,
};
use riskguard_store::Store;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Tick economics for every configured instrument (§3), looked up by a
/// local wrapper so [`TickTableQuery`] can be implemented on it without
/// hitting the orphan rule (`riskguard-risk`'s trait, `riskguard-core`'s
/// type, both foreign to each other's crate if we tried the map directly).
#[derive(Debug, Default, Clone)]
pub struct TickTable(pub FnvIndexMap<SymbolRoot, TickInfo>);

impl TickTableQuery for TickTable {
    fn tick_info(&self, symbol: &SymbolRoot) -> Option<TickInfo> {
        self.0.get(symbol).copied()
    }
}

struct LockoutSnapshot {
    locked: bool,
}

impl LockoutQuery for LockoutSnapshot {
    fn is_locked_out(&self, _account: &AccountId) -> bool {
        self.locked
    }
}

struct PnlSnapshot {
    daily_pnl: Money,
    trade_count: u32,
}

impl PnlQuery for PnlSnapshot {
    fn daily_pnl(&self, _account: &AccountId) -> Money {
        self.daily_pnl
    }

    fn trade_count(&self, _account: &AccountId) -> u32 {
        self.trade_count
    }
}

/// Rolling trade counts for exactly the windows `trade_frequency_limit`
/// was configured with, resolved from the store before `evaluate` runs
/// since rules never await (§5, §9). A window not in `counts` (shouldn't
/// happen - the engine is built from the same tier list the rule uses)
/// reads as zero rather than panicking.
#[derive(Default)]
struct TradeFrequencySnapshot {
    counts: FnvIndexMap<i64, u32>,
}

impl TradeFrequencyQuery for TradeFrequencySnapshot {
    fn trade_count_within(&self, _account: &AccountId, window: ChronoDuration) -> u32 {
        self.counts.get(&window.num_seconds()).copied().unwrap_or(0)
    }
}

struct ConnectionSnapshot {
    connected: bool,
}

impl ConnectionQuery for ConnectionSnapshot {
    fn is_connected(&self, _account: &AccountId) -> bool {
        self.connected
    }
}

struct ResetSnapshot {
    next: DateTime<Utc>,
}

impl ResetQuery for ResetSnapshot {
    fn next_daily_reset(&self) -> DateTime<Utc> {
        self.next
    }
}

/// Configuration the engine needs beyond the rule registry itself.
#[derive(Debug)]
pub struct EngineConfig {
    pub tick_table: TickTable,
    pub daily_reset_time: NaiveTime,
    pub tz: TzConverter,
    /// The exact rolling-window tiers `trade_frequency_limit` was built
    /// with, mirrored here so the engine knows which windows to resolve
    /// from the store before each `TRADE_EXECUTED` evaluation.
    pub trade_frequency_windows: Vec<ChronoDuration>,
    /// Cadence of the market-data polling fallback (§4.9). Clamped to
    /// ≥1s by [`crate::config::RiskConfig::engine_config`].
    pub market_data_poll_interval: std::time::Duration,
}

/// The C12 orchestrator: registry + position book + the state managers
/// every rule's [`EngineContext`] borrows from for one evaluation.
pub struct RiskEngine {
    rules: Vec<Box<dyn Rule>>,
    automation_rules: Vec<Box<dyn AutomationRule>>,
    tick_table: TickTable,
    daily_reset_time: NaiveTime,
    tz: TzConverter,
    trade_frequency_windows: Vec<ChronoDuration>,
    market_data_poll_interval: std::time::Duration,
    positions: Mutex<FnvIndexMap<AccountId, FnvIndexMap<ContractId, Position>>>,
    connected: AtomicBool,
    clock: Arc<dyn EngineClock>,
    store: Arc<dyn Store>,
    sdk: Arc<dyn BrokerSdk>,
    bridge: SdkEventBridge,
    lockouts: LockoutManager,
    pnl: Arc<PnlTracker>,
    timers: Arc<TimerManager>,
    protective_orders: Arc<ProtectiveOrderCache>,
    market_data: Arc<MarketDataSubsystem>,
    reset: ResetScheduler,
    executor: EnforcementExecutor,
}

impl std::fmt::Debug for RiskEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiskEngine").finish_non_exhaustive()
    }
}

impl RiskEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rules: Vec<Box<dyn Rule>>,
        automation_rules: Vec<Box<dyn AutomationRule>>,
        config: EngineConfig,
        store: Arc<dyn Store>,
        clock: Arc<dyn EngineClock>,
        sdk: Arc<dyn BrokerSdk>,
    ) -> Self {
        let pnl = Arc::new(PnlTracker::new(Arc::clone(&store), Arc::clone(&clock), config.tz));
        let reset = ResetScheduler::new(
            ResetConfig { daily_reset_time: config.daily_reset_time, tz: config.tz },
            Arc::clone(&store),
            Arc::clone(&pnl),
        );
        Self {
            rules,
            automation_rules,
            tick_table: config.tick_table,
            daily_reset_time: config.daily_reset_time,
            tz: config.tz,
            trade_frequency_windows: config.trade_frequency_windows,
            market_data_poll_interval: config.market_data_poll_interval,
            positions: Mutex::new(FnvIndexMap::default()),
            connected: AtomicBool::new(true),
            clock,
            store,
            sdk: Arc::clone(&sdk),
            bridge: SdkEventBridge::new(),
            lockouts: LockoutManager::new(Arc::clone(&store)),
            pnl,
            timers: Arc::new(TimerManager::new()),
            protective_orders: Arc::new(ProtectiveOrderCache::new(Arc::clone(&sdk))),
            market_data: Arc::new(MarketDataSubsystem::new()),
            reset,
            executor: EnforcementExecutor::new(sdk),
        }
    }

    pub fn timers(&self) -> &Arc<TimerManager> {
        &self.timers
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Reloads active lockouts from the store (§4.5). Call once before
    /// accepting events.
    pub async fn bootstrap(&self) -> Result<(), EngineError> {
        let live = self.lockouts.load_active().await?;
        tracing::info!(live_lockouts = live, "engine bootstrap complete");
        Ok(())
    }

    /// Translates one raw SDK callback and, if it yields an event, applies
    /// it immediately - the bridge itself never touches engine state
    /// (§4.10), only [`Self::process_event`] does.
    pub async fn ingest_raw(&self, raw: RawSdkCallback) -> Result<(), EngineError> {
        let now = self.clock.now();
        match self.bridge.translate(raw, now) {
            Ok(Some(event)) => self.process_event(event).await,
            Ok(None) => Ok(()),
            Err(err) => {
                tracing::warn!(error = %err, "dropping malformed SDK callback");
                Ok(())
            }
        }
    }

    /// The main per-event entry point: updates read-side state, then runs
    /// every enabled rule/automation for each account the event concerns.
    pub async fn process_event(&self, event: Event) -> Result<(), EngineError> {
        let derived = self.apply_state_update(&event).await?;

        let accounts = self.accounts_for(&event);
        for account in &accounts {
            self.run_rules_for_account(&event, account).await?;
        }

        for event in derived {
            Box::pin(self.process_event(event)).await?;
        }
        Ok(())
    }

    /// Drains fired grace-period timers and runs the reset scheduler's
    /// once-a-tick check. Intended to be called on a ~1s cadence from
    /// [`Self::run`].
    pub async fn run_housekeeping(&self) {
        for callback in self.timers.drain_fired() {
            match callback {
                TimerCallback::CloseOnGraceExpiry { account_id, symbol, contract_id } => {
                    tracing::warn!(
                        account = %account_id,
                        symbol = %symbol,
                        contract = %contract_id,
                        "no_stop_loss_grace expired without a classified stop - closing position"
                    );
                    let action =
                        ResolvedAction::ClosePosition { symbol, contract_id, reason: "no_stop_loss_grace expired".to_string() };
                    self.executor.execute(&action).await;
                }
            }
        }

        match self.reset.tick().await {
            Ok(accounts) if !accounts.is_empty() => {
                tracing::info!(accounts = accounts.len(), "daily reset executed by housekeeping tick");
            }
            Ok(_) => {}
            Err(err) => tracing::error!(error = %err, "reset scheduler tick failed"),
        }
    }

    /// Market-data polling fallback (§4.9): "a background task at ≤2 Hz
    /// fetches the SDK-maintained last price for each subscribed symbol
    /// and drives the same update path as quote events." Strictly
    /// redundant with the quote stream - `update_from_quote` is idempotent
    /// for a repeated price, so polling never double-counts a move the
    /// stream already delivered.
    fn spawn_market_data_poll(self: &Arc<Self>) {
        let symbols: Vec<SymbolRoot> = self.tick_table.0.keys().cloned().collect();
        if symbols.is_empty() {
            return;
        }
        let engine = Arc::clone(self);
        let interval = self.market_data_poll_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                for symbol in &symbols {
                    match engine.sdk.last_price(symbol).await {
                        Ok(Some(price)) => {
                            let now = engine.clock.now();
                            let event = Event::new(
                                EventKind::QuoteUpdate(QuoteUpdate { symbol_root: symbol.clone(), last_price: Some(price), bid: None, ask: None }),
                                now,
                                EventSource::MarketData,
                            );
                            if let Err(err) = engine.process_event(event).await {
                                tracing::error!(symbol = %symbol, error = %err, "market data poll failed to process a quote");
                            }
                        }
                        Ok(None) => {}
                        Err(err) => tracing::warn!(symbol = %symbol, error = %err, "market data poll fallback query failed"),
                    }
                }
            }
        });
    }

    /// Drives the engine forever: fans in `events`, and on a 1s cadence
    /// runs [`Self::run_housekeeping`]. Returns once `events` closes (the
    /// event bus forwarders having no more senders, i.e. shutdown).
    pub async fn run(self: Arc<Self>, mut events: tokio::sync::mpsc::Receiver<Event>) {
        self.timers.spawn_sweep();
        self.spawn_market_data_poll();
        let mut housekeeping = tokio::time::interval(std::time::Duration::from_secs(1));
        loop {
            tokio::select! {
                maybe_event = events.recv() => {
                    match maybe_event {
                        Some(event) => {
                            if let Err(err) = self.process_event(event).await {
                                tracing::error!(error = %err, "event processing failed");
                            }
                        }
                        None => break,
                    }
                }
                _ = housekeeping.tick() => {
                    self.run_housekeeping().await;
                }
            }
        }
    }

    /// Updates position/P&L/protective-order/connection state for one
    /// event, returning any derived events (`UNREALIZED_PNL_UPDATE`,
    /// `MARKET_DATA_UPDATED`) to be processed as their own events next.
    async fn apply_state_update(&self, event: &Event) -> Result<Vec<Event>, EngineError> {
        let now = event.timestamp;
        let mut derived = Vec::new();

        match &event.kind {
            EventKind::PositionOpened(e) => {
                self.upsert_position(&e.account_id, e.position.clone());
            }
            EventKind::PositionUpdated(e) => {
                // Must run before any rule reads the cache for this event
                // (§4.8's critical invalidation rule).
                self.protective_orders.invalidate(&e.position.contract_id);
                self.upsert_position(&e.account_id, e.position.clone());
            }
            EventKind::PositionClosed(e) => {
                self.remove_position(&e.account_id, &e.contract_id);
                self.protective_orders.invalidate(&e.contract_id);
                if let Some(realized) = e.realized_pnl {
                    self.pnl.add_trade_pnl(&e.account_id, realized).await?;
                }
            }
            EventKind::OrderPlaced(e) => {
                let entry_price = e
                    .position_entry_price
                    .or_else(|| self.position_for(&e.account_id, &e.order.contract_id).map(|p| p.entry_price));
                if let Some(entry_price) = entry_price {
                    self.protective_orders.on_order_placed(
                        &e.order.contract_id,
                        e.order.order_type,
                        e.order.side,
                        e.order.limit_price,
                        entry_price,
                    );
                }
            }
            EventKind::OrderFilled(e) => {
                self.protective_orders.on_order_terminal(&e.contract_id, riskguard_sdk::OrderStatus::Filled);
            }
            EventKind::OrderCancelled(e) => {
                self.protective_orders.on_order_terminal(&e.contract_id, riskguard_sdk::OrderStatus::Cancelled);
            }
            EventKind::OrderRejected(e) => {
                self.protective_orders.on_order_terminal(&e.contract_id, riskguard_sdk::OrderStatus::Rejected);
            }
            EventKind::TradeExecuted(e) => {
                self.store
                    .insert_trade(riskguard_store::TradeRow {
                        account_id: e.account_id.clone(),
                        trade_id: e.trade_id.to_string(),
                        symbol: e.symbol_root.to_string(),
                        side: format!("{:?}", e.side),
                        quantity: e.quantity,
                        price: e.price,
                        timestamp: now,
                    })
                    .await?;
                if let Some(realized) = e.realized_pnl {
                    self.pnl.add_trade_pnl(&e.account_id, realized).await?;
                }
            }
            EventKind::QuoteUpdate(e) => {
                let outcome = self.market_data.update_from_quote(&e.symbol_root, e.last_price, e.bid, e.ask);
                if let QuoteOutcome::Updated { last_price } = outcome {
                    let mut positions = self.positions.lock();
                    for (account_id, contracts) in positions.iter_mut() {
                        for (contract_id, position) in contracts.iter_mut() {
                            if position.symbol_root != e.symbol_root {
                                continue;
                            }
                            let Some(tick) = self.tick_table.0.get(&position.symbol_root).copied() else {
                                continue;
                            };
                            let pnl = MarketDataSubsystem::unrealized_pnl(
                                position.side,
                                position.quantity,
                                position.entry_price,
                                last_price,
                                tick,
                            );
                            position.last_known_market_price = Some(last_price);
                            position.unrealized_pnl = pnl;
                            if self.market_data.should_publish_pnl_update(contract_id, pnl) {
                                derived.push(Event::new(
                                    EventKind::UnrealizedPnlUpdate(UnrealizedPnlUpdate {
                                        account_id: account_id.clone(),
                                        contract_id: contract_id.clone(),
                                        symbol_root: position.symbol_root.clone(),
                                        unrealized_pnl: pnl,
                                    }),
                                    now,
                                    EventSource::Internal,
                                ));
                            }
                        }
                    }
                    drop(positions);
                    derived.push(Event::new(
                        EventKind::MarketDataUpdated(MarketDataUpdated { symbol_root: e.symbol_root.clone(), last_price }),
                        now,
                        EventSource::Internal,
                    ));
                }
            }
            EventKind::SdkConnected(_) | EventKind::AuthSuccess(_) => {
                self.connected.store(true, Ordering::Relaxed);
            }
            EventKind::SdkDisconnected(_) | EventKind::AuthFailed(_) => {
                self.connected.store(false, Ordering::Relaxed);
            }
            _ => {}
        }

        Ok(derived)
    }

    /// Every account this event's rule evaluation should run against.
    /// Account-scoped events concern exactly their own account;
    /// `QUOTE_UPDATE` concerns every account currently holding that
    /// symbol; connection/system events with no single owner concern
    /// every known account (so `auth_loss_guard` can alert each one) and
    /// are simply dropped when no account is known yet.
    fn accounts_for(&self, event: &Event) -> Vec<AccountId> {
        if let Some(account) = event.kind.account_id() {
            return vec![account.clone()];
        }
        match &event.kind {
            EventKind::QuoteUpdate(e) => self
                .positions
                .lock()
                .iter()
                .filter(|(_, contracts)| contracts.values().any(|p| p.symbol_root == e.symbol_root))
                .map(|(account, _)| account.clone())
                .collect(),
            EventKind::MarketDataUpdated(_) => Vec::new(),
            _ => self.positions.lock().keys().cloned().collect(),
        }
    }

    async fn run_rules_for_account(&self, event: &Event, account: &AccountId) -> Result<(), EngineError> {
        let now = self.clock.now();
        let positions = self.positions_snapshot(account);
        let lockout_snapshot = LockoutSnapshot { locked: self.lockouts.is_locked_out(account).await? };
        let pnl_snapshot =
            PnlSnapshot { daily_pnl: self.pnl.get_daily_pnl(account).await?, trade_count: self.pnl.get_trade_count(account).await? };
        let trade_frequency_snapshot = self.trade_frequency_snapshot(account, event).await?;
        let connection_snapshot = ConnectionSnapshot { connected: self.connected.load(Ordering::Relaxed) };
        let protective_snapshot = self.protective_orders.snapshot();
        let reset_snapshot = ResetSnapshot { next: self.tz.next_occurrence_of(self.daily_reset_time, now) };
        let queued_lockouts = QueuedLockoutCommand::new();

        let ctx = EngineContext {
            now,
            account_id: account,
            positions: &positions,
            tick_table: &self.tick_table,
            lockouts: &lockout_snapshot,
            pnl: &pnl_snapshot,
            trade_frequency: &trade_frequency_snapshot,
            protective_orders: &protective_snapshot,
            market_data: &*self.market_data,
            connection: &connection_snapshot,
            timers: &*self.timers,
            reset: &reset_snapshot,
        };

        let mut resolved = Vec::new();
        for rule in &self.rules {
            if !rule.enabled() {
                continue;
            }
            if let Some(violation) = rule.evaluate(event, &ctx) {
                tracing::info!(
                    rule = rule.id().as_str(),
                    account = %account,
                    severity = ?violation.severity,
                    action = ?violation.action,
                    message = %violation.message,
                    "rule violated"
                );
                let mut enforcement = EnforcementContext::new(&queued_lockouts);
                rule.enforce(account, &violation, &mut enforcement);
                resolved.extend(enforcement.actions);
            }
        }

        let mut automations = Vec::new();
        for rule in &self.automation_rules {
            if !rule.enabled() {
                continue;
            }
            automations.extend(rule.automate(event, &ctx));
        }

        queued_lockouts.flush(&self.lockouts).await?;

        // §4.11's priority rule resolves multiple violations on the same
        // event down to the single most severe action; automation actions
        // ride a separate channel and are never coalesced away by it.
        if let Some(winner) = resolved.into_iter().max_by_key(Self::action_priority) {
            tracing::info!(account = %account, action = ?winner, "dispatching enforcement action");
            self.executor.execute(&winner).await;
        }
        for automation in automations {
            let action = ResolvedAction::Automation(automation);
            self.executor.execute(&action).await;
        }

        Ok(())
    }

    fn action_priority(action: &ResolvedAction) -> u8 {
        match action {
            ResolvedAction::FlattenAndCancel { .. } => 4,
            ResolvedAction::Flatten { .. } | ResolvedAction::ClosePosition { .. } => 3,
            ResolvedAction::Cancel { .. } | ResolvedAction::CancelAll { .. } => 2,
            ResolvedAction::AlertOnly { .. } => 0,
            ResolvedAction::Automation(_) => 0,
        }
    }

    async fn trade_frequency_snapshot(&self, account: &AccountId, event: &Event) -> Result<TradeFrequencySnapshot, EngineError> {
        if !matches!(event.kind, EventKind::TradeExecuted(_)) {
            return Ok(TradeFrequencySnapshot::default());
        }
        let now = self.clock.now();
        let mut counts = FnvIndexMap::default();
        for window in &self.trade_frequency_windows {
            let since = now - *window;
            let count = self.store.count_trades_since(account, since).await?;
            counts.insert(window.num_seconds(), count);
        }
        Ok(TradeFrequencySnapshot { counts })
    }

    fn upsert_position(&self, account: &AccountId, position: Position) {
        self.positions
            .lock()
            .entry(account.clone())
            .or_default()
            .insert(position.contract_id.clone(), position);
    }

    fn remove_position(&self, account: &AccountId, contract_id: &ContractId) {
        if let Some(contracts) = self.positions.lock().get_mut(account) {
            contracts.shift_remove(contract_id);
        }
    }

    fn position_for(&self, account: &AccountId, contract_id: &ContractId) -> Option<Position> {
        self.positions.lock().get(account).and_then(|contracts| contracts.get(contract_id)).cloned()
    }

    fn positions_snapshot(&self, account: &AccountId) -> Vec<Position> {
        self.positions.lock().get(account).map(|contracts| contracts.values().cloned().collect()).unwrap_or_default()
    }
}

/// Fans every event kind's broadcast channel into a single mpsc receiver
/// so [`RiskEngine::run`] can consume one closed-over stream instead of
/// juggling seventeen receivers itself.
pub fn fan_in(event_bus: &Arc<crate::event_bus::EventBus>, buffer: usize) -> tokio::sync::mpsc::Receiver<Event> {
    let (tx, rx) = tokio::sync::mpsc::channel(buffer);
    for mut receiver in event_bus.subscribe_all() {
        let tx = tx.clone();
        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "event bus forwarder lagged, dropping oldest events");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TestClock;
    use riskguard_risk::rules::MaxContracts;
    use riskguard_sdk::{event::PositionOpened, MockSdk, Side};
    use riskguard_store::MemoryStore;
    use rust_decimal::Decimal;

    fn engine_with(rules: Vec<Box<dyn Rule>>, sdk: Arc<MockSdk>) -> RiskEngine {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let clock: Arc<dyn EngineClock> = Arc::new(TestClock::new(Utc::now()));
        let mut tick_table = FnvIndexMap::default();
        tick_table.insert(SymbolRoot::from("MNQ".to_string()), TickInfo::new(Decimal::new(25, 2), Decimal::new(500, 2)));
        RiskEngine::new(
            rules,
            Vec::new(),
            EngineConfig {
                tick_table: TickTable(tick_table),
                daily_reset_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
                tz: TzConverter::new(chrono_tz::America::New_York),
                trade_frequency_windows: vec![ChronoDuration::seconds(60)],
                market_data_poll_interval: std::time::Duration::from_secs(2),
            },
            store,
            clock,
            sdk,
        )
    }

    fn position_opened_event(account: &AccountId, contract: &str, size: u32) -> Event {
        let position = Position::new(SymbolRoot::from("MNQ".to_string()), contract.to_string().into(), Side::Long, size, Decimal::new(2000000, 2));
        Event::new(EventKind::PositionOpened(PositionOpened { account_id: account.clone(), position }), Utc::now(), EventSource::Sdk)
    }

    #[tokio::test]
    async fn max_contracts_breach_dispatches_a_flatten() {
        let sdk = Arc::new(MockSdk::new());
        let engine = engine_with(vec![Box::new(MaxContracts { enabled: true, limit: 3 })], Arc::clone(&sdk));
        let account = AccountId::from("A".to_string());

        engine.process_event(position_opened_event(&account, "MNQZ25", 2)).await.unwrap();
        assert!(sdk.calls.lock().is_empty());

        engine.process_event(position_opened_event(&account, "MNQH26", 2)).await.unwrap();
        assert_eq!(sdk.calls.lock().len(), 2, "FlattenAndCancel dispatches both close_all_positions and cancel_all_orders");
    }

    #[tokio::test]
    async fn position_closed_removes_it_from_the_book() {
        let sdk = Arc::new(MockSdk::new());
        let engine = engine_with(Vec::new(), sdk);
        let account = AccountId::from("A".to_string());
        engine.process_event(position_opened_event(&account, "MNQZ25", 1)).await.unwrap();
        assert_eq!(engine.positions_snapshot(&account).len(), 1);

        let closed = Event::new(
            EventKind::PositionClosed(riskguard_sdk::event::PositionClosed {
                account_id: account.clone(),
                symbol_root: SymbolRoot::from("MNQ".to_string()),
                contract_id: "MNQZ25".to_string().into(),
                side: Side::Long,
                realized_pnl: None,
            }),
            Utc::now(),
            EventSource::Sdk,
        );
        engine.process_event(closed).await.unwrap();
        assert!(engine.positions_snapshot(&account).is_empty());
    }

    #[tokio::test]
    async fn quote_update_fans_out_to_every_account_holding_the_symbol() {
        let sdk = Arc::new(MockSdk::new());
        let engine = engine_with(Vec::new(), sdk);
        let a = AccountId::from("A".to_string());
        let b = AccountId::from("B".to_string());
        engine.process_event(position_opened_event(&a, "MNQZ25", 1)).await.unwrap();
        engine.process_event(position_opened_event(&b, "MNQZ25", 1)).await.unwrap();

        let quote = Event::new(
            EventKind::QuoteUpdate(riskguard_sdk::event::QuoteUpdate {
                symbol_root: SymbolRoot::from("MNQ".to_string()),
                last_price: Some(Decimal::new(1990000, 2)),
                bid: None,
                ask: None,
            }),
            Utc::now(),
            EventSource::MarketData,
        );
        engine.process_event(quote).await.unwrap();

        assert_eq!(engine.positions_snapshot(&a)[0].unrealized_pnl, Decimal::new(-200000, 2));
        assert_eq!(engine.positions_snapshot(&b)[0].unrealized_pnl, Decimal::new(-200000, 2));
    }

    #[tokio::test(start_paused = true)]
    async fn market_data_poll_drives_unrealized_pnl_without_a_quote_event() {
        let sdk = Arc::new(MockSdk::new());
        let symbol = SymbolRoot::from("MNQ".to_string());
        sdk.seed_last_price(symbol.clone(), Decimal::new(499925, 2));
        let engine = Arc::new(engine_with(Vec::new(), Arc::clone(&sdk)));
        let account = AccountId::from("A".to_string());

        let position = Position::new(symbol, "MNQZ25".to_string().into(), Side::Long, 2, Decimal::new(499800, 2));
        engine
            .process_event(Event::new(
                EventKind::PositionOpened(PositionOpened { account_id: account.clone(), position }),
                Utc::now(),
                EventSource::Sdk,
            ))
            .await
            .unwrap();
        assert_eq!(engine.positions_snapshot(&account)[0].unrealized_pnl, Decimal::ZERO);

        Arc::clone(&engine).spawn_market_data_poll();
        tokio::time::advance(std::time::Duration::from_secs(3)).await;
        tokio::task::yield_now().await;

        // ticks = (4999.25 - 4998.00) / 0.25 = 5; pnl = 5 * 2 * 5.00 = 50.00
        assert_eq!(engine.positions_snapshot(&account)[0].unrealized_pnl, Decimal::new(5000, 2));
    }
}
