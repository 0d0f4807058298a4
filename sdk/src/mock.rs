//! Deterministic [`BrokerSdk`] test double, grounded in
//! `profitdll::mock::ProfitConnector`: a canned, in-memory backend with an
//! injectable event channel, used by unit tests and local runs without a
//! real broker connection.

use crate::{
    broker::{BrokerSdk, SdkError, SdkOpResult, WorkingOrderSnapshot},
    domain::{Money, Position},
    ids::{AccountId, ContractId, OrderId, SymbolRoot},
    raw::RawSdkCallback,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// In-memory broker double. Canned responses are seeded via the `with_*`
/// builders; [`MockSdk::push_callback`] drives the callback stream a test
/// wants the bridge to observe.
#[derive(Debug, Default)]
pub struct MockSdk {
    positions: Mutex<HashMap<AccountId, Vec<Position>>>,
    working_orders: Mutex<HashMap<ContractId, Vec<WorkingOrderSnapshot>>>,
    last_prices: Mutex<HashMap<SymbolRoot, Money>>,
    callback_tx: Mutex<Option<UnboundedSender<RawSdkCallback>>>,
    /// Records every enforcement call the executor made, for assertions.
    pub calls: Mutex<Vec<String>>,
}

impl MockSdk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_positions(&self, account: AccountId, positions: Vec<Position>) {
        self.positions.lock().insert(account, positions);
    }

    pub fn seed_working_orders(&self, contract_id: ContractId, orders: Vec<WorkingOrderSnapshot>) {
        self.working_orders.lock().insert(contract_id, orders);
    }

    pub fn seed_last_price(&self, symbol: SymbolRoot, price: Money) {
        self.last_prices.lock().insert(symbol, price);
    }

    /// Pushes a raw callback to whichever receiver is currently subscribed,
    /// if any. Silently dropped if nothing has subscribed yet.
    pub fn push_callback(&self, callback: RawSdkCallback) {
        if let Some(tx) = self.callback_tx.lock().as_ref() {
            let _ = tx.send(callback);
        }
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }
}

#[async_trait::async_trait]
impl BrokerSdk for MockSdk {
    async fn subscribe_callbacks(&self) -> Result<UnboundedReceiver<RawSdkCallback>, SdkError> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.callback_tx.lock() = Some(tx);
        Ok(rx)
    }

    async fn get_all_positions(&self, account: &AccountId) -> Result<Vec<Position>, SdkError> {
        Ok(self.positions.lock().get(account).cloned().unwrap_or_default())
    }

    async fn get_working_orders(&self, contract_id: &ContractId) -> Result<Vec<WorkingOrderSnapshot>, SdkError> {
        Ok(self.working_orders.lock().get(contract_id).cloned().unwrap_or_default())
    }

    async fn search_open_orders(&self, _account: &AccountId) -> Result<Vec<WorkingOrderSnapshot>, SdkError> {
        Ok(self.working_orders.lock().values().flatten().cloned().collect())
    }

    async fn get_position_orders(&self, contract_id: &ContractId) -> Result<Vec<WorkingOrderSnapshot>, SdkError> {
        self.get_working_orders(contract_id).await
    }

    async fn last_price(&self, symbol: &SymbolRoot) -> Result<Option<Money>, SdkError> {
        Ok(self.last_prices.lock().get(symbol).copied())
    }

    async fn close_position(
        &self,
        symbol: &SymbolRoot,
        contract_id: &ContractId,
        reason: &str,
    ) -> Result<SdkOpResult, SdkError> {
        self.record(format!("close_position({symbol}, {contract_id}, {reason})"));
        Ok(SdkOpResult::ok(1))
    }

    async fn reduce_position_to_limit(
        &self,
        symbol: &SymbolRoot,
        contract_id: &ContractId,
        target_abs_size: u32,
    ) -> Result<SdkOpResult, SdkError> {
        self.record(format!("reduce_position_to_limit({symbol}, {contract_id}, {target_abs_size})"));
        Ok(SdkOpResult::ok(1))
    }

    async fn cancel_order(&self, symbol: &SymbolRoot, order_id: &OrderId) -> Result<SdkOpResult, SdkError> {
        self.record(format!("cancel_order({symbol}, {order_id})"));
        Ok(SdkOpResult::ok(1))
    }

    async fn close_all_positions(&self, symbol: Option<&SymbolRoot>) -> Result<SdkOpResult, SdkError> {
        self.record(format!("close_all_positions({symbol:?})"));
        Ok(SdkOpResult::ok(1))
    }

    async fn cancel_all_orders(&self, symbol: Option<&SymbolRoot>) -> Result<SdkOpResult, SdkError> {
        self.record(format!("cancel_all_orders({symbol:?})"));
        Ok(SdkOpResult::ok(1))
    }

    async fn place_bracket_order(
        &self,
        symbol: &SymbolRoot,
        contract_id: &ContractId,
        stop_price: Decimal,
        target_price: Decimal,
    ) -> Result<SdkOpResult, SdkError> {
        self.record(format!(
            "place_bracket_order({symbol}, {contract_id}, stop={stop_price}, target={target_price})"
        ));
        Ok(SdkOpResult::ok(1))
    }

    async fn adjust_trailing_stop(
        &self,
        symbol: &SymbolRoot,
        order_id: &OrderId,
        new_stop_price: Decimal,
    ) -> Result<SdkOpResult, SdkError> {
        self.record(format!("adjust_trailing_stop({symbol}, {order_id}, {new_stop_price})"));
        Ok(SdkOpResult::ok(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn flatten_and_cancel_runs_both_steps_even_if_one_fails() {
        let sdk = MockSdk::new();
        let result = sdk.flatten_and_cancel(None).await.unwrap();
        assert!(result.success);
        assert_eq!(result.affected_count, 2);
        assert_eq!(sdk.calls.lock().len(), 2);
    }
}
