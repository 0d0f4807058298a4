//! Raw broker callback payloads, pre-translation (§4.10, §6).
//!
//! These mirror what the broker SDK actually hands back: signed sizes
//! instead of an explicit `Side`, the broker's own symbol spelling
//! (`F.US.MNQ`) instead of a stripped [`crate::ids::SymbolRoot`], and an
//! explicit `remove` flag for position closes. [`crate::bridge`]-shaped
//! code in `riskguard-core` normalizes these into [`crate::event::Event`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPositionPayload {
    pub account_id: String,
    /// Broker spelling, e.g. `F.US.MNQ`.
    pub symbol: String,
    pub contract_id: String,
    /// Signed: positive long, negative short. Never inferred from this
    /// alone downstream - `side` is authoritative when present.
    pub size: i64,
    pub side: Option<super::domain::Side>,
    pub entry_price: Decimal,
    /// Explicit broker "remove this position" action, independent of
    /// `size == 0` (§4.10).
    pub removed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOrderPayload {
    pub account_id: String,
    pub order_id: String,
    pub symbol: String,
    pub contract_id: String,
    pub order_type: super::domain::OrderType,
    pub side: super::domain::Side,
    pub size: i64,
    pub stop_price: Option<Decimal>,
    pub limit_price: Option<Decimal>,
    pub status: super::domain::OrderStatus,
    pub filled_quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTradePayload {
    pub account_id: String,
    pub trade_id: String,
    pub symbol: String,
    pub side: super::domain::Side,
    pub quantity: u32,
    pub price: Decimal,
    pub realized_pnl: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawQuotePayload {
    pub symbol: String,
    pub last_price: Option<Decimal>,
    pub bid: Option<Decimal>,
    pub ask: Option<Decimal>,
}

/// Balance snapshot callback - dropped by the bridge (§4.10): "the engine
/// does not need it".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAccountPayload {
    pub account_id: String,
    pub balance: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawConnectionPayload {
    Connected { reconnect: bool },
    Disconnected,
    AuthFailed,
    AuthSuccess,
}

/// Tagged union of everything the broker can push down a callback
/// channel, before translation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawSdkCallback {
    Position(RawPositionPayload),
    Order(RawOrderPayload),
    Trade(RawTradePayload),
    Quote(RawQuotePayload),
    Account(RawAccountPayload),
    Connection { account_id: String, payload: RawConnectionPayload },
}
