//! Domain types shared by the event model, the rule set, and the broker
//! boundary: sides, money, tick economics, and the in-memory position/order
//! shapes described in spec §3.

use crate::ids::{ContractId, OrderId, SymbolRoot};
use derive_more::{Constructor, Display};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Fixed-point rational used everywhere §3 requires "Money": prices, P&L,
/// tick values. Never `f64` on a persisted or rule-decision path.
pub type Money = Decimal;

/// `LONG` or `SHORT` per §3. Rules must consult this field rather than
/// infer side from the sign of a size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for LONG, -1 for SHORT - the sign used in the unrealized-P&L
    /// formula (§4.9).
    pub fn sign(self) -> i64 {
        match self {
            Side::Long => 1,
            Side::Short => -1,
        }
    }

    /// Derives side from a broker's signed size. Only the SDK bridge (C10)
    /// is allowed to do this - rules elsewhere must read the explicit
    /// `side` field instead of re-deriving it.
    pub fn from_signed_size(size: i64) -> Option<Self> {
        if size > 0 {
            Some(Side::Long)
        } else if size < 0 {
            Some(Side::Short)
        } else {
            None
        }
    }
}

/// Working-order type, per §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum OrderType {
    Limit,
    Market,
    Stop,
    StopLimit,
    TrailingStop,
}

impl OrderType {
    /// Whether this order type is unconditionally a stop-loss candidate
    /// under the semantic classification table (§4.8).
    pub fn is_unconditional_stop(self) -> bool {
        matches!(self, OrderType::Stop | OrderType::StopLimit | OrderType::TrailingStop)
    }
}

/// What a working order's purpose appears to be, given a known position
/// (§4.8's semantic classification table). A pure function of domain
/// types, so it lives here rather than in `riskguard-core`: both the
/// protective-order cache (C8) and the `no_stop_loss_grace` rule need it,
/// and `riskguard-risk` must not depend on `riskguard-core` (§9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum OrderIntent {
    StopLoss,
    TakeProfit,
    /// A LIMIT order on the entry side of the position - not protective.
    Entry,
    /// A MARKET order, or a LIMIT order with no price to compare.
    Unknown,
}

/// Classifies a working order per §4.8's table.
pub fn classify_order_intent(
    order_type: OrderType,
    side: Side,
    limit_price: Option<Decimal>,
    entry_price: Decimal,
) -> OrderIntent {
    if order_type.is_unconditional_stop() {
        return OrderIntent::StopLoss;
    }
    match (order_type, side, limit_price) {
        (OrderType::Limit, Side::Long, Some(limit)) if limit > entry_price => OrderIntent::TakeProfit,
        (OrderType::Limit, Side::Long, Some(_)) => OrderIntent::Entry,
        (OrderType::Limit, Side::Short, Some(limit)) if limit < entry_price => OrderIntent::TakeProfit,
        (OrderType::Limit, Side::Short, Some(_)) => OrderIntent::Entry,
        _ => OrderIntent::Unknown,
    }
}

/// Order lifecycle status, per §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum OrderStatus {
    Working,
    Accepted,
    Filled,
    Cancelled,
    Rejected,
}

/// Tick economics for a symbol root: minimum price increment and currency
/// value per tick per contract (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Constructor, Serialize, Deserialize)]
pub struct TickInfo {
    pub tick_size: Decimal,
    pub tick_value: Decimal,
}

impl TickInfo {
    /// Aligns a price to the nearest tick, used to validate §3's
    /// "`entry_price` aligned to tick_size" invariant.
    pub fn is_aligned(&self, price: Decimal) -> bool {
        if self.tick_size.is_zero() {
            return true;
        }
        (price / self.tick_size).round() * self.tick_size == price
    }
}

/// In-memory position snapshot, per §3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol_root: SymbolRoot,
    pub contract_id: ContractId,
    pub side: Side,
    pub quantity: u32,
    pub entry_price: Decimal,
    pub unrealized_pnl: Decimal,
    pub last_known_market_price: Option<Decimal>,
    pub stop_order_id: Option<OrderId>,
    pub target_order_id: Option<OrderId>,
}

impl Position {
    pub fn new(
        symbol_root: SymbolRoot,
        contract_id: ContractId,
        side: Side,
        quantity: u32,
        entry_price: Decimal,
    ) -> Self {
        Self {
            symbol_root,
            contract_id,
            side,
            quantity,
            entry_price,
            unrealized_pnl: Decimal::ZERO,
            last_known_market_price: None,
            stop_order_id: None,
            target_order_id: None,
        }
    }
}

/// Order as carried by events, per §3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub contract_id: ContractId,
    pub order_type: OrderType,
    pub side: Side,
    pub size: u32,
    pub stop_price: Option<Decimal>,
    pub limit_price: Option<Decimal>,
    pub status: OrderStatus,
    pub filled_quantity: u32,
}
