//! The engine's closed event model (§4.3).
//!
//! Every SDK callback, timer firing, and internal state transition that the
//! rest of the pipeline needs to see is translated into one of these
//! variants before it reaches the [`crate::broker::EventBus`]-shaped
//! plumbing in `riskguard-core`. Kept here (rather than in `riskguard-core`)
//! so `riskguard-risk`'s `Rule` trait can depend on it without creating a
//! crate cycle - see DESIGN.md.

use crate::{
    domain::{Money, Order, Position, Side},
    ids::{AccountId, ContractId, OrderId, SymbolRoot, TradeId},
};
use chrono::{DateTime, Utc};
use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Where an event originated - used for the bus's "in-order per (kind,
/// source)" delivery guarantee (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum EventSource {
    Sdk,
    Timer,
    Reset,
    MarketData,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionOpened {
    pub account_id: AccountId,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionUpdated {
    pub account_id: AccountId,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionClosed {
    pub account_id: AccountId,
    pub symbol_root: SymbolRoot,
    pub contract_id: ContractId,
    pub side: Side,
    /// Broker-reported realized P&L for this close, when the broker sends
    /// one. `None` marks a half-turn (position-opening) trade.
    pub realized_pnl: Option<Money>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub account_id: AccountId,
    pub order: Order,
    /// Position context needed for semantic classification (§4.8), when
    /// known at translation time.
    pub position_entry_price: Option<Decimal>,
    pub position_side: Option<Side>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderFilled {
    pub account_id: AccountId,
    pub order_id: OrderId,
    pub contract_id: ContractId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCancelled {
    pub account_id: AccountId,
    pub order_id: OrderId,
    pub contract_id: ContractId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRejected {
    pub account_id: AccountId,
    pub order_id: OrderId,
    pub contract_id: ContractId,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeExecuted {
    pub account_id: AccountId,
    pub trade_id: TradeId,
    pub symbol_root: SymbolRoot,
    pub side: Side,
    pub quantity: u32,
    pub price: Decimal,
    /// `None` for a half-turn (position-opening) trade.
    pub realized_pnl: Option<Money>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteUpdate {
    pub symbol_root: SymbolRoot,
    pub last_price: Option<Decimal>,
    pub bid: Option<Decimal>,
    pub ask: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnrealizedPnlUpdate {
    pub account_id: AccountId,
    pub contract_id: ContractId,
    pub symbol_root: SymbolRoot,
    pub unrealized_pnl: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDataUpdated {
    pub symbol_root: SymbolRoot,
    pub last_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnlUpdated {
    pub account_id: AccountId,
    pub realized_pnl: Money,
    pub trade_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkConnected {
    pub reconnect: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkDisconnected {
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthFailed {
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSuccess;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemStarted;

/// Closed set of event kinds from §4.3. `Event` pairs a variant with the
/// envelope fields (`timestamp`, `source`) common to all of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Display)]
pub enum EventKind {
    PositionOpened(PositionOpened),
    PositionUpdated(PositionUpdated),
    PositionClosed(PositionClosed),
    OrderPlaced(OrderPlaced),
    OrderFilled(OrderFilled),
    OrderCancelled(OrderCancelled),
    OrderRejected(OrderRejected),
    TradeExecuted(TradeExecuted),
    QuoteUpdate(QuoteUpdate),
    UnrealizedPnlUpdate(UnrealizedPnlUpdate),
    MarketDataUpdated(MarketDataUpdated),
    PnlUpdated(PnlUpdated),
    SdkConnected(SdkConnected),
    SdkDisconnected(SdkDisconnected),
    AuthFailed(AuthFailed),
    AuthSuccess(AuthSuccess),
    SystemStarted(SystemStarted),
}

impl EventKind {
    /// The account this event concerns, when the variant carries one.
    /// Market-data/system-level variants have no single owning account.
    pub fn account_id(&self) -> Option<&AccountId> {
        match self {
            EventKind::PositionOpened(e) => Some(&e.account_id),
            EventKind::PositionUpdated(e) => Some(&e.account_id),
            EventKind::PositionClosed(e) => Some(&e.account_id),
            EventKind::OrderPlaced(e) => Some(&e.account_id),
            EventKind::OrderFilled(e) => Some(&e.account_id),
            EventKind::OrderCancelled(e) => Some(&e.account_id),
            EventKind::OrderRejected(e) => Some(&e.account_id),
            EventKind::TradeExecuted(e) => Some(&e.account_id),
            EventKind::UnrealizedPnlUpdate(e) => Some(&e.account_id),
            EventKind::PnlUpdated(e) => Some(&e.account_id),
            _ => None,
        }
    }

    /// Short tag matching the spec's `SCREAMING_CASE` kind names, used in
    /// log lines and the admin surface.
    pub fn tag(&self) -> &'static str {
        match self {
            EventKind::PositionOpened(_) => "POSITION_OPENED",
            EventKind::PositionUpdated(_) => "POSITION_UPDATED",
            EventKind::PositionClosed(_) => "POSITION_CLOSED",
            EventKind::OrderPlaced(_) => "ORDER_PLACED",
            EventKind::OrderFilled(_) => "ORDER_FILLED",
            EventKind::OrderCancelled(_) => "ORDER_CANCELLED",
            EventKind::OrderRejected(_) => "ORDER_REJECTED",
            EventKind::TradeExecuted(_) => "TRADE_EXECUTED",
            EventKind::QuoteUpdate(_) => "QUOTE_UPDATE",
            EventKind::UnrealizedPnlUpdate(_) => "UNREALIZED_PNL_UPDATE",
            EventKind::MarketDataUpdated(_) => "MARKET_DATA_UPDATED",
            EventKind::PnlUpdated(_) => "PNL_UPDATED",
            EventKind::SdkConnected(_) => "SDK_CONNECTED",
            EventKind::SdkDisconnected(_) => "SDK_DISCONNECTED",
            EventKind::AuthFailed(_) => "AUTH_FAILED",
            EventKind::AuthSuccess(_) => "AUTH_SUCCESS",
            EventKind::SystemStarted(_) => "SYSTEM_STARTED",
        }
    }
}

/// An event on the bus: an `EventKind` plus the envelope fields every
/// variant shares (§4.3: `Event = { kind, data, timestamp, source }`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    pub source: EventSource,
}

impl Event {
    pub fn new(kind: EventKind, timestamp: DateTime<Utc>, source: EventSource) -> Self {
        Self {
            kind,
            timestamp,
            source,
        }
    }
}
