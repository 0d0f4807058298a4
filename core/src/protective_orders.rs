//! Protective-Order Cache (C8, §4.8). Answers "does this position have a
//! working stop loss / take profit, and at what price?" in O(1) for rule
//! evaluation, with an on-demand SDK fallback for orders placed outside
//! the event stream (the broker's own UI, SPEC_FULL.md).

use parking_lot::RwLock;
use riskguard_integration::collection::FnvIndexMap;
use riskguard_risk::context::{CachedOrderInfo, ProtectiveOrderQuery};
use riskguard_sdk::{
    domain::{classify_order_intent, OrderIntent},
    BrokerSdk, ContractId, Money, OrderStatus, OrderType, Side,
};
use rust_decimal::Decimal;
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
struct CachedOrder {
    order_id_present: bool,
    price: Decimal,
}

#[derive(Default)]
struct Maps {
    stop_losses: FnvIndexMap<ContractId, CachedOrder>,
    take_profits: FnvIndexMap<ContractId, CachedOrder>,
}

pub struct ProtectiveOrderCache {
    sdk: Arc<dyn BrokerSdk>,
    maps: RwLock<Maps>,
}

impl std::fmt::Debug for ProtectiveOrderCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtectiveOrderCache").finish_non_exhaustive()
    }
}

impl ProtectiveOrderCache {
    pub fn new(sdk: Arc<dyn BrokerSdk>) -> Self {
        Self { sdk, maps: RwLock::new(Maps::default()) }
    }

    /// Event-driven fast path: `ORDER_PLACED` with a known position
    /// context (§4.8's classification table).
    pub fn on_order_placed(&self, contract_id: &ContractId, order_type: OrderType, side: Side, limit_price: Option<Decimal>, entry_price: Decimal) {
        match classify_order_intent(order_type, side, limit_price, entry_price) {
            OrderIntent::StopLoss => {
                let price = if order_type.is_unconditional_stop() { limit_price.unwrap_or(entry_price) } else { entry_price };
                self.maps.write().stop_losses.insert(contract_id.clone(), CachedOrder { order_id_present: true, price });
            }
            OrderIntent::TakeProfit => {
                let price = limit_price.unwrap_or(entry_price);
                self.maps.write().take_profits.insert(contract_id.clone(), CachedOrder { order_id_present: true, price });
            }
            OrderIntent::Entry | OrderIntent::Unknown => {}
        }
    }

    pub fn on_order_terminal(&self, contract_id: &ContractId, status: OrderStatus) {
        if matches!(status, OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected) {
            let mut maps = self.maps.write();
            maps.stop_losses.shift_remove(contract_id);
            maps.take_profits.shift_remove(contract_id);
        }
    }

    /// Invalidates both map entries for a contract - must run *before* a
    /// rule reads the cache for the same `POSITION_UPDATED` event (§4.8's
    /// critical invalidation rule).
    pub fn invalidate(&self, contract_id: &ContractId) {
        let mut maps = self.maps.write();
        maps.stop_losses.shift_remove(contract_id);
        maps.take_profits.shift_remove(contract_id);
    }

    /// On a cache miss, runs a live SDK query for all working orders on
    /// the contract and repopulates both maps from one classification
    /// pass - `get_take_profit` on a miss runs the same full pass as
    /// `get_stop_loss`, not a take-profit-only query (SPEC_FULL.md).
    async fn classify_contract(&self, contract_id: &ContractId, _side: Side, entry_price: Decimal) -> Result<(), riskguard_sdk::SdkError> {
        let orders = self.sdk.get_position_orders(contract_id).await?;
        let mut maps = self.maps.write();
        for order in orders {
            match classify_order_intent(order.order_type, order.side, order.limit_price, entry_price) {
                OrderIntent::StopLoss => {
                    let price = order.stop_price.or(order.limit_price).unwrap_or(entry_price);
                    maps.stop_losses.insert(contract_id.clone(), CachedOrder { order_id_present: true, price });
                }
                OrderIntent::TakeProfit => {
                    let price = order.limit_price.unwrap_or(entry_price);
                    maps.take_profits.insert(contract_id.clone(), CachedOrder { order_id_present: true, price });
                }
                OrderIntent::Entry | OrderIntent::Unknown => {}
            }
        }
        Ok(())
    }

    pub async fn get_stop_loss(&self, contract_id: &ContractId, side: Side, entry_price: Decimal) -> Option<CachedOrderInfo> {
        if let Some(cached) = self.maps.read().stop_losses.get(contract_id).copied() {
            return Some(CachedOrderInfo { order_id_present: cached.order_id_present, price: cached.price });
        }
        let _ = self.classify_contract(contract_id, side, entry_price).await;
        self.maps.read().stop_losses.get(contract_id).copied().map(|c| CachedOrderInfo { order_id_present: c.order_id_present, price: c.price })
    }

    pub async fn get_take_profit(&self, contract_id: &ContractId, side: Side, entry_price: Decimal) -> Option<CachedOrderInfo> {
        if let Some(cached) = self.maps.read().take_profits.get(contract_id).copied() {
            return Some(CachedOrderInfo { order_id_present: cached.order_id_present, price: cached.price });
        }
        let _ = self.classify_contract(contract_id, side, entry_price).await;
        self.maps.read().take_profits.get(contract_id).copied().map(|c| CachedOrderInfo { order_id_present: c.order_id_present, price: c.price })
    }

    /// Synchronous view for [`riskguard_risk::context::EngineContext`] -
    /// rules never await (§5), so this never triggers the SDK fallback;
    /// it's the responsibility of the bridge/engine to have already
    /// resolved a miss before a rule's `evaluate` runs for that event.
    pub fn snapshot(&self) -> ProtectiveOrderSnapshot {
        let maps = self.maps.read();
        ProtectiveOrderSnapshot {
            stop_losses: maps.stop_losses.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            take_profits: maps.take_profits.iter().map(|(k, v)| (k.clone(), *v)).collect(),
        }
    }
}

/// An immutable, synchronously-queryable view of the cache taken at the
/// start of one event's evaluation (§9's borrowed-context pattern).
pub struct ProtectiveOrderSnapshot {
    stop_losses: FnvIndexMap<ContractId, CachedOrder>,
    take_profits: FnvIndexMap<ContractId, CachedOrder>,
}

impl ProtectiveOrderQuery for ProtectiveOrderSnapshot {
    fn stop_loss(&self, contract_id: &ContractId) -> Option<CachedOrderInfo> {
        self.stop_losses.get(contract_id).map(|c| CachedOrderInfo { order_id_present: c.order_id_present, price: c.price })
    }

    fn take_profit(&self, contract_id: &ContractId) -> Option<CachedOrderInfo> {
        self.take_profits.get(contract_id).map(|c| CachedOrderInfo { order_id_present: c.order_id_present, price: c.price })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskguard_sdk::MockSdk;

    #[test]
    fn order_placed_stop_populates_stop_loss_map() {
        let cache = ProtectiveOrderCache::new(Arc::new(MockSdk::new()));
        let contract = ContractId::from("MNQZ25".to_string());
        cache.on_order_placed(&contract, OrderType::Stop, Side::Long, Some(Decimal::new(498000, 2)), Decimal::new(500000, 2));
        let snapshot = cache.snapshot();
        assert!(snapshot.stop_loss(&contract).is_some());
    }

    #[test]
    fn invalidate_clears_both_maps() {
        let cache = ProtectiveOrderCache::new(Arc::new(MockSdk::new()));
        let contract = ContractId::from("MNQZ25".to_string());
        cache.on_order_placed(&contract, OrderType::Stop, Side::Long, None, Decimal::new(500000, 2));
        cache.invalidate(&contract);
        assert!(cache.snapshot().stop_loss(&contract).is_none());
    }

    #[tokio::test]
    async fn cache_miss_falls_back_to_live_sdk_query() {
        use riskguard_sdk::{broker::WorkingOrderSnapshot, OrderId};

        let sdk = Arc::new(MockSdk::new());
        let contract = ContractId::from("MNQZ25".to_string());
        sdk.seed_working_orders(
            contract.clone(),
            vec![WorkingOrderSnapshot {
                order_id: OrderId::from("o1".to_string()),
                contract_id: contract.clone(),
                order_type: OrderType::Stop,
                side: Side::Long,
                stop_price: Some(Decimal::new(498000, 2)),
                limit_price: None,
            }],
        );
        let cache = ProtectiveOrderCache::new(sdk);
        let result = cache.get_stop_loss(&contract, Side::Long, Decimal::new(500000, 2)).await;
        assert!(result.is_some());
    }
}
