//! The broker SDK boundary (§6): everything the engine consumes from, and
//! dispatches to, the brokerage SDK. Grounded in `profitdll`'s
//! `ProfitBackend` trait (async login/subscribe/order methods behind a
//! mock-or-real backend) - generalized from one DLL to a transport-agnostic
//! async trait, per SPEC_FULL.md.

use crate::{
    domain::Money,
    ids::{AccountId, ContractId, OrderId, SymbolRoot},
    raw::RawSdkCallback,
};
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;

/// Error taxonomy at the SDK boundary (§7's `TransientSDK` / `ProtocolError`
/// / `AuthLost` kinds, narrowed to this crate's concerns).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SdkError {
    /// Retryable broker/network failure - the executor retries with
    /// jitter before surfacing a partial failure (§7).
    #[error("transient broker error: {0}")]
    Transient(String),
    /// The broker rejected the operation outright (bad contract id,
    /// insufficient margin, etc.) - not retried.
    #[error("broker rejected operation: {0}")]
    Rejected(String),
    /// Connection or authentication is down.
    #[error("not connected to broker")]
    NotConnected,
    /// Per-operation timeout elapsed (default 10s, §5).
    #[error("broker operation timed out")]
    Timeout,
}

/// Result of one SDK-side enforcement operation (§4.13): the executor
/// never raises on SDK error, it always gets one of these back.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SdkOpResult {
    pub success: bool,
    pub affected_count: u32,
    pub errors: Vec<String>,
}

impl SdkOpResult {
    pub fn ok(affected_count: u32) -> Self {
        Self {
            success: true,
            affected_count,
            errors: Vec::new(),
        }
    }

    pub fn failed(errors: Vec<String>) -> Self {
        Self {
            success: false,
            affected_count: 0,
            errors,
        }
    }

    pub fn merge(self, other: Self) -> Self {
        Self {
            success: self.success && other.success,
            affected_count: self.affected_count + other.affected_count,
            errors: self.errors.into_iter().chain(other.errors).collect(),
        }
    }
}

/// A working order as reported live by the broker (used by the protective
/// order cache's on-demand fallback query, §4.8).
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingOrderSnapshot {
    pub order_id: OrderId,
    pub contract_id: ContractId,
    pub order_type: crate::domain::OrderType,
    pub side: crate::domain::Side,
    pub stop_price: Option<Decimal>,
    pub limit_price: Option<Decimal>,
}

/// Transport-agnostic broker SDK boundary. Implemented by a real
/// connector (out of scope for the core, per spec.md §1) and by
/// [`crate::mock::MockSdk`] for tests and local development.
#[async_trait::async_trait]
pub trait BrokerSdk: Send + Sync {
    /// Begins streaming realtime callbacks for this account/instrument
    /// suite. Mirrors `ProfitBackend::initialize_login`'s
    /// "returns a receiver of events" shape.
    async fn subscribe_callbacks(&self) -> Result<UnboundedReceiver<RawSdkCallback>, SdkError>;

    async fn get_all_positions(&self, account: &AccountId) -> Result<Vec<crate::domain::Position>, SdkError>;

    async fn get_working_orders(&self, contract_id: &ContractId) -> Result<Vec<WorkingOrderSnapshot>, SdkError>;

    async fn search_open_orders(&self, account: &AccountId) -> Result<Vec<WorkingOrderSnapshot>, SdkError>;

    async fn get_position_orders(&self, contract_id: &ContractId) -> Result<Vec<WorkingOrderSnapshot>, SdkError>;

    async fn last_price(&self, symbol: &SymbolRoot) -> Result<Option<Money>, SdkError>;

    async fn close_position(
        &self,
        symbol: &SymbolRoot,
        contract_id: &ContractId,
        reason: &str,
    ) -> Result<SdkOpResult, SdkError>;

    async fn reduce_position_to_limit(
        &self,
        symbol: &SymbolRoot,
        contract_id: &ContractId,
        target_abs_size: u32,
    ) -> Result<SdkOpResult, SdkError>;

    async fn cancel_order(&self, symbol: &SymbolRoot, order_id: &OrderId) -> Result<SdkOpResult, SdkError>;

    async fn close_all_positions(&self, symbol: Option<&SymbolRoot>) -> Result<SdkOpResult, SdkError>;

    async fn cancel_all_orders(&self, symbol: Option<&SymbolRoot>) -> Result<SdkOpResult, SdkError>;

    /// Composite: both steps attempted regardless of individual failure
    /// (§4.13).
    async fn flatten_and_cancel(&self, symbol: Option<&SymbolRoot>) -> Result<SdkOpResult, SdkError> {
        let closed = self.close_all_positions(symbol).await;
        let cancelled = self.cancel_all_orders(symbol).await;
        match (closed, cancelled) {
            (Ok(a), Ok(b)) => Ok(a.merge(b)),
            (Err(e), Ok(b)) => Ok(SdkOpResult::failed(vec![e.to_string()]).merge(b)),
            (Ok(a), Err(e)) => Ok(a.merge(SdkOpResult::failed(vec![e.to_string()]))),
            (Err(e1), Err(e2)) => Ok(SdkOpResult::failed(vec![e1.to_string(), e2.to_string()])),
        }
    }

    async fn place_bracket_order(
        &self,
        symbol: &SymbolRoot,
        contract_id: &ContractId,
        stop_price: Decimal,
        target_price: Decimal,
    ) -> Result<SdkOpResult, SdkError>;

    async fn adjust_trailing_stop(
        &self,
        symbol: &SymbolRoot,
        order_id: &OrderId,
        new_stop_price: Decimal,
    ) -> Result<SdkOpResult, SdkError>;
}
