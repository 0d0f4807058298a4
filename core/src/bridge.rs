//! SDK Event Bridge (C10, §4.10). Translates [`RawSdkCallback`] payloads
//! into the engine's closed [`Event`] model: normalizes signed sizes into
//! an explicit `Side`, strips the broker's symbol prefix, detects position
//! close from either an explicit `removed` flag or `size == 0`, and drops
//! account-balance callbacks entirely.

use crate::error::EngineError;
use riskguard_sdk::{
    domain::{Order, Position},
    event::{
        AuthFailed, AuthSuccess, Event, EventKind, EventSource, OrderCancelled, OrderFilled, OrderPlaced,
        OrderRejected, PositionClosed, PositionOpened, PositionUpdated, QuoteUpdate, SdkConnected, SdkDisconnected,
        TradeExecuted,
    },
    raw::{RawConnectionPayload, RawOrderPayload, RawPositionPayload, RawQuotePayload, RawSdkCallback, RawTradePayload},
    AccountId, ContractId, Money, OrderId, Side, SymbolRoot, TradeId,
};
use rust_decimal::Decimal;

/// Tracks whether the last position payload seen for a contract was
/// already open, so a payload carrying `size != 0` after one that closed
/// the position is still translated as `PositionOpened` rather than
/// `PositionUpdated` (§4.10's close-detection needs this to be
/// stateful across callbacks, not purely payload-local).
#[derive(Debug, Default)]
pub struct SdkEventBridge {
    known_open: parking_lot::Mutex<riskguard_integration::collection::FnvIndexMap<ContractId, ()>>,
}

impl SdkEventBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translates one raw callback into zero or one engine events. Returns
    /// `Ok(None)` for callbacks the bridge intentionally drops (account
    /// balance snapshots, §4.10) and `Err` for payloads that don't make
    /// sense (a [`EngineError::ProtocolError`], logged and dropped by the
    /// caller rather than propagated).
    pub fn translate(&self, raw: RawSdkCallback, now: chrono::DateTime<chrono::Utc>) -> Result<Option<Event>, EngineError> {
        let kind = match raw {
            RawSdkCallback::Position(payload) => return Ok(self.translate_position(payload)?.map(|kind| Event::new(kind, now, EventSource::Sdk))),
            RawSdkCallback::Order(payload) => self.translate_order(payload)?,
            RawSdkCallback::Trade(payload) => self.translate_trade(payload)?,
            RawSdkCallback::Quote(payload) => self.translate_quote(payload),
            RawSdkCallback::Account(_) => return Ok(None),
            RawSdkCallback::Connection { account_id: _, payload } => self.translate_connection(payload),
        };
        Ok(Some(Event::new(kind, now, EventSource::Sdk)))
    }

    fn translate_position(&self, payload: RawPositionPayload) -> Result<Option<EventKind>, EngineError> {
        let account_id = AccountId::from(payload.account_id);
        let symbol_root = SymbolRoot::from_broker_symbol(&payload.symbol);
        let contract_id = ContractId::from(payload.contract_id);

        // Explicit "remove" action or a zero size both mean the position
        // closed, whichever arrives (§4.10). Emitted regardless of whether
        // this contract was tracked as open, so downstream cache/position
        // invalidation always runs.
        if payload.removed || payload.size == 0 {
            self.known_open.lock().shift_remove(&contract_id);
            let side = payload.side.unwrap_or(Side::Long);
            return Ok(Some(EventKind::PositionClosed(PositionClosed {
                account_id,
                symbol_root,
                contract_id,
                side,
                realized_pnl: None,
            })));
        }

        let side = payload
            .side
            .or_else(|| Side::from_signed_size(payload.size))
            .ok_or_else(|| EngineError::ProtocolError(format!("position payload for {contract_id} has no derivable side")))?;
        let quantity = payload.size.unsigned_abs() as u32;

        let position = Position {
            symbol_root,
            contract_id: contract_id.clone(),
            side,
            quantity,
            entry_price: payload.entry_price,
            unrealized_pnl: Decimal::ZERO,
            last_known_market_price: None,
            stop_order_id: None,
            target_order_id: None,
        };

        let mut known = self.known_open.lock();
        let first_seen = known.insert(contract_id, ()).is_none();
        drop(known);

        Ok(Some(if first_seen {
            EventKind::PositionOpened(PositionOpened { account_id, position })
        } else {
            EventKind::PositionUpdated(PositionUpdated { account_id, position })
        }))
    }

    fn translate_order(&self, payload: RawOrderPayload) -> Result<EventKind, EngineError> {
        let account_id = AccountId::from(payload.account_id);
        let contract_id = ContractId::from(payload.contract_id);
        let order_id = OrderId::from(payload.order_id);

        Ok(match payload.status {
            riskguard_sdk::OrderStatus::Filled => EventKind::OrderFilled(OrderFilled { account_id, order_id, contract_id }),
            riskguard_sdk::OrderStatus::Cancelled => EventKind::OrderCancelled(OrderCancelled { account_id, order_id, contract_id }),
            riskguard_sdk::OrderStatus::Rejected => EventKind::OrderRejected(OrderRejected {
                account_id,
                order_id,
                contract_id,
                reason: "rejected by broker".to_string(),
            }),
            riskguard_sdk::OrderStatus::Working | riskguard_sdk::OrderStatus::Accepted => {
                let order = Order {
                    order_id,
                    contract_id,
                    order_type: payload.order_type,
                    side: payload.side,
                    size: payload.size.unsigned_abs() as u32,
                    stop_price: payload.stop_price,
                    limit_price: payload.limit_price,
                    status: payload.status,
                    filled_quantity: payload.filled_quantity,
                };
                EventKind::OrderPlaced(OrderPlaced {
                    account_id,
                    order,
                    position_entry_price: None,
                    position_side: None,
                })
            }
        })
    }

    fn translate_trade(&self, payload: RawTradePayload) -> Result<EventKind, EngineError> {
        Ok(EventKind::TradeExecuted(TradeExecuted {
            account_id: AccountId::from(payload.account_id),
            trade_id: TradeId::from(payload.trade_id),
            symbol_root: SymbolRoot::from_broker_symbol(&payload.symbol),
            side: payload.side,
            quantity: payload.quantity,
            price: payload.price,
            realized_pnl: payload.realized_pnl.map(Money::from),
        }))
    }

    fn translate_quote(&self, payload: RawQuotePayload) -> EventKind {
        EventKind::QuoteUpdate(QuoteUpdate {
            symbol_root: SymbolRoot::from_broker_symbol(&payload.symbol),
            last_price: payload.last_price,
            bid: payload.bid,
            ask: payload.ask,
        })
    }

    fn translate_connection(&self, payload: RawConnectionPayload) -> EventKind {
        match payload {
            RawConnectionPayload::Connected { reconnect } => EventKind::SdkConnected(SdkConnected { reconnect }),
            RawConnectionPayload::Disconnected => EventKind::SdkDisconnected(SdkDisconnected { reason: "disconnected".to_string() }),
            RawConnectionPayload::AuthFailed => EventKind::AuthFailed(AuthFailed { reason: "authentication failed".to_string() }),
            RawConnectionPayload::AuthSuccess => EventKind::AuthSuccess(AuthSuccess),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn account_payload_is_dropped() {
        let bridge = SdkEventBridge::new();
        let raw = RawSdkCallback::Account(riskguard_sdk::raw::RawAccountPayload {
            account_id: "A".to_string(),
            balance: Decimal::new(100000, 2),
        });
        assert!(bridge.translate(raw, Utc::now()).unwrap().is_none());
    }

    #[test]
    fn strips_broker_symbol_prefix() {
        let bridge = SdkEventBridge::new();
        let raw = RawSdkCallback::Position(RawPositionPayload {
            account_id: "A".to_string(),
            symbol: "F.US.MNQ".to_string(),
            contract_id: "MNQZ25".to_string(),
            size: 2,
            side: Some(Side::Long),
            entry_price: Decimal::new(2000000, 2),
            removed: false,
        });
        let event = bridge.translate(raw, Utc::now()).unwrap().unwrap();
        match event.kind {
            EventKind::PositionOpened(opened) => assert_eq!(opened.position.symbol_root, SymbolRoot::from("MNQ".to_string())),
            other => panic!("expected PositionOpened, got {other:?}"),
        }
    }

    #[test]
    fn zero_size_always_closes_even_without_remove_flag() {
        let bridge = SdkEventBridge::new();
        let raw = RawSdkCallback::Position(RawPositionPayload {
            account_id: "A".to_string(),
            symbol: "MNQ".to_string(),
            contract_id: "MNQZ25".to_string(),
            size: 0,
            side: Some(Side::Long),
            entry_price: Decimal::new(2000000, 2),
            removed: false,
        });
        let event = bridge.translate(raw, Utc::now()).unwrap().unwrap();
        assert!(matches!(event.kind, EventKind::PositionClosed(_)));
    }

    #[test]
    fn second_payload_for_same_contract_is_an_update_not_opened() {
        let bridge = SdkEventBridge::new();
        let first = RawSdkCallback::Position(RawPositionPayload {
            account_id: "A".to_string(),
            symbol: "MNQ".to_string(),
            contract_id: "MNQZ25".to_string(),
            size: 2,
            side: Some(Side::Long),
            entry_price: Decimal::new(2000000, 2),
            removed: false,
        });
        bridge.translate(first.clone(), Utc::now()).unwrap();
        let second = bridge.translate(first, Utc::now()).unwrap().unwrap();
        assert!(matches!(second.kind, EventKind::PositionUpdated(_)));
    }
}
