//! §4.11 #12: automation, not enforcement. Computes bracket stop/target
//! prices from tick distances on `POSITION_OPENED`, and tightens a
//! trailing stop on `POSITION_UPDATED` as the position moves further
//! in-profit - never loosening it. Produces [`AutomationAction`]s on the
//! distinct channel described in [`crate::rule::AutomationRule`], never a
//! `Violation`.

use crate::{
    context::EngineContext,
    rule::AutomationRule,
    violation::AutomationAction,
};
use parking_lot::Mutex;
use riskguard_integration::collection::FnvIndexMap;
use riskguard_sdk::{ContractId, Event, EventKind, Side};
use rust_decimal::Decimal;

#[derive(Debug)]
pub struct TradeManagement {
    pub enabled: bool,
    pub stop_distance_ticks: u32,
    pub target_distance_ticks: u32,
    pub trailing_stop_enabled: bool,
    pub trailing_distance_ticks: u32,
    /// This rule's own bookkeeping of the last stop price it placed or
    /// trailed to, per contract - not shared engine state (§9).
    trailed: Mutex<FnvIndexMap<ContractId, Decimal>>,
}

impl TradeManagement {
    pub fn new(
        enabled: bool,
        stop_distance_ticks: u32,
        target_distance_ticks: u32,
        trailing_stop_enabled: bool,
        trailing_distance_ticks: u32,
    ) -> Self {
        Self {
            enabled,
            stop_distance_ticks,
            target_distance_ticks,
            trailing_stop_enabled,
            trailing_distance_ticks,
            trailed: Mutex::new(FnvIndexMap::default()),
        }
    }

    fn stop_and_target(&self, side: Side, entry_price: Decimal, tick_size: Decimal) -> (Decimal, Decimal) {
        let sign = Decimal::from(side.sign());
        let stop = entry_price - sign * Decimal::from(self.stop_distance_ticks) * tick_size;
        let target = entry_price + sign * Decimal::from(self.target_distance_ticks) * tick_size;
        (stop, target)
    }

    fn trail(&self, side: Side, current_price: Decimal, tick_size: Decimal) -> Decimal {
        let sign = Decimal::from(side.sign());
        current_price - sign * Decimal::from(self.trailing_distance_ticks) * tick_size
    }

    /// A trail only ever tightens: moves up for longs, down for shorts.
    fn improves(side: Side, candidate: Decimal, current: Decimal) -> bool {
        match side {
            Side::Long => candidate > current,
            Side::Short => candidate < current,
        }
    }
}

impl AutomationRule for TradeManagement {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn automate(&self, event: &Event, ctx: &EngineContext<'_>) -> Vec<AutomationAction> {
        match &event.kind {
            EventKind::PositionOpened(e) => {
                let Some(tick) = ctx.tick_table.tick_info(&e.position.symbol_root) else {
                    return Vec::new();
                };
                let (stop, target) = self.stop_and_target(e.position.side, e.position.entry_price, tick.tick_size);
                self.trailed.lock().insert(e.position.contract_id.clone(), stop);
                vec![AutomationAction::PlaceBracketOrder {
                    account_id: e.account_id.clone(),
                    symbol: e.position.symbol_root.clone(),
                    contract_id: e.position.contract_id.clone(),
                    stop_price: stop,
                    target_price: target,
                }]
            }
            EventKind::PositionUpdated(e) => {
                if !self.trailing_stop_enabled {
                    return Vec::new();
                }
                let Some(current_price) = e.position.last_known_market_price else {
                    return Vec::new();
                };
                let Some(tick) = ctx.tick_table.tick_info(&e.position.symbol_root) else {
                    return Vec::new();
                };
                let candidate = self.trail(e.position.side, current_price, tick.tick_size);

                let mut trailed = self.trailed.lock();
                let improved = match trailed.get(&e.position.contract_id) {
                    Some(&last) => Self::improves(e.position.side, candidate, last),
                    None => true,
                };
                if !improved {
                    return Vec::new();
                }
                trailed.insert(e.position.contract_id.clone(), candidate);
                drop(trailed);

                let Some(order_id) = e.position.stop_order_id.clone() else {
                    return Vec::new();
                };
                vec![AutomationAction::AdjustTrailingStop {
                    account_id: e.account_id.clone(),
                    symbol: e.position.symbol_root.clone(),
                    order_id,
                    new_stop_price: candidate,
                }]
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context_test_support::{test_context, StubState};
    use chrono::Utc;
    use riskguard_sdk::{
        event::{PositionOpened, PositionUpdated},
        AccountId, Position, SymbolRoot, TickInfo,
    };

    fn mnq_tick() -> TickInfo {
        TickInfo::new(Decimal::new(25, 2), Decimal::new(500, 2))
    }

    #[test]
    fn position_opened_emits_bracket_order() {
        let rule = TradeManagement::new(true, 20, 40, true, 10);
        let account = AccountId::from("A".to_string());
        let mut stub = StubState::default();
        stub.tick_table.insert(SymbolRoot::from("MNQ".to_string()), mnq_tick());
        let positions = vec![];
        let ctx = test_context(&account, &positions, &stub);

        let position = Position::new(
            SymbolRoot::from("MNQ".to_string()),
            ContractId::from("MNQZ25".to_string()),
            Side::Long,
            1,
            Decimal::new(2000000, 2),
        );
        let event = Event::new(
            EventKind::PositionOpened(PositionOpened {
                account_id: account.clone(),
                position,
            }),
            Utc::now(),
            riskguard_sdk::EventSource::Sdk,
        );

        let actions = rule.automate(&event, &ctx);
        assert_eq!(actions.len(), 1);
        match &actions[0] {
            AutomationAction::PlaceBracketOrder { stop_price, target_price, .. } => {
                assert_eq!(*stop_price, Decimal::new(2000000, 2) - Decimal::new(500, 2));
                assert_eq!(*target_price, Decimal::new(2000000, 2) + Decimal::new(1000, 2));
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn trailing_stop_tightens_but_never_loosens() {
        let rule = TradeManagement::new(true, 20, 40, true, 10);
        let account = AccountId::from("A".to_string());
        let mut stub = StubState::default();
        stub.tick_table.insert(SymbolRoot::from("MNQ".to_string()), mnq_tick());
        let positions = vec![];
        let ctx = test_context(&account, &positions, &stub);

        let mut position = Position::new(
            SymbolRoot::from("MNQ".to_string()),
            ContractId::from("MNQZ25".to_string()),
            Side::Long,
            1,
            Decimal::new(2000000, 2),
        );
        position.stop_order_id = Some("stop-1".to_string().into());

        let opened = Event::new(
            EventKind::PositionOpened(PositionOpened {
                account_id: account.clone(),
                position: position.clone(),
            }),
            Utc::now(),
            riskguard_sdk::EventSource::Sdk,
        );
        rule.automate(&opened, &ctx);

        // Price moves up - trail should tighten.
        position.last_known_market_price = Some(Decimal::new(2010000, 2));
        let updated = Event::new(
            EventKind::PositionUpdated(PositionUpdated {
                account_id: account.clone(),
                position: position.clone(),
            }),
            Utc::now(),
            riskguard_sdk::EventSource::Sdk,
        );
        let actions = rule.automate(&updated, &ctx);
        assert_eq!(actions.len(), 1);

        // Price pulls back - trail must not loosen, so no action emitted.
        position.last_known_market_price = Some(Decimal::new(2005000, 2));
        let pullback = Event::new(
            EventKind::PositionUpdated(PositionUpdated {
                account_id: account.clone(),
                position,
            }),
            Utc::now(),
            riskguard_sdk::EventSource::Sdk,
        );
        assert!(rule.automate(&pullback, &ctx).is_empty());
    }
}
