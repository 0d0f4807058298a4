//! Enforcement Executor (C13, §4.13). Resolves a [`ResolvedAction`] into
//! SDK calls, with bounded retry-with-jitter on transient failures (§7's
//! `TransientSDK` policy) and a per-operation timeout (default 10s, §5).
//! Never raises on SDK error - every call returns an [`SdkOpResult`].

use rand::Rng;
use riskguard_risk::context::ResolvedAction;
use riskguard_sdk::{broker::SdkOpResult, BrokerSdk, SdkError};
use std::sync::Arc;
use std::time::Duration;

/// Default per-operation SDK timeout (§5).
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(10);
/// Default bounded retry count for transient SDK failures (§7).
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

pub struct EnforcementExecutor {
    sdk: Arc<dyn BrokerSdk>,
    op_timeout: Duration,
    retry_attempts: u32,
}

impl std::fmt::Debug for EnforcementExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnforcementExecutor").finish_non_exhaustive()
    }
}

impl EnforcementExecutor {
    pub fn new(sdk: Arc<dyn BrokerSdk>) -> Self {
        Self {
            sdk,
            op_timeout: DEFAULT_OP_TIMEOUT,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        }
    }

    /// Dispatches one resolved action. `AlertOnly` and `Automation` never
    /// touch the SDK's destructive surface - they're handled separately by
    /// the caller (alert sink / automation placement).
    pub async fn execute(&self, action: &ResolvedAction) -> Option<SdkOpResult> {
        match action {
            ResolvedAction::ClosePosition { symbol, contract_id, reason } => {
                Some(self.with_retry(|| self.sdk.close_position(symbol, contract_id, reason)).await)
            }
            ResolvedAction::Flatten { symbol } => {
                Some(self.with_retry(|| self.sdk.close_all_positions(symbol.as_ref())).await)
            }
            ResolvedAction::FlattenAndCancel { symbol } => {
                Some(self.with_retry(|| self.sdk.flatten_and_cancel(symbol.as_ref())).await)
            }
            ResolvedAction::Cancel { symbol, order_id } => {
                Some(self.with_retry(|| self.sdk.cancel_order(symbol, order_id)).await)
            }
            ResolvedAction::CancelAll { symbol } => {
                Some(self.with_retry(|| self.sdk.cancel_all_orders(symbol.as_ref())).await)
            }
            ResolvedAction::AlertOnly { .. } => None,
            ResolvedAction::Automation(automation) => Some(self.execute_automation(automation).await),
        }
    }

    async fn execute_automation(&self, automation: &riskguard_risk::AutomationAction) -> SdkOpResult {
        match automation {
            riskguard_risk::AutomationAction::PlaceBracketOrder { symbol, contract_id, stop_price, target_price, .. } => {
                self.with_retry(|| self.sdk.place_bracket_order(symbol, contract_id, *stop_price, *target_price)).await
            }
            riskguard_risk::AutomationAction::AdjustTrailingStop { symbol, order_id, new_stop_price, .. } => {
                self.with_retry(|| self.sdk.adjust_trailing_stop(symbol, order_id, *new_stop_price)).await
            }
        }
    }

    /// Bounded retry with jitter for transient failures; rejected/timeout
    /// outcomes follow the same loop since a timeout is itself transient,
    /// but a `Rejected` response exhausts retries immediately (§7: "not
    /// retried").
    async fn with_retry<F, Fut>(&self, mut op: F) -> SdkOpResult
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<SdkOpResult, SdkError>>,
    {
        let mut last_error = None;
        for attempt in 0..self.retry_attempts {
            let call = tokio::time::timeout(self.op_timeout, op());
            match call.await {
                Ok(Ok(result)) => return result,
                Ok(Err(SdkError::Rejected(reason))) => return SdkOpResult::failed(vec![reason]),
                Ok(Err(err)) => last_error = Some(err.to_string()),
                Err(_) => last_error = Some("operation timed out".to_string()),
            }
            if attempt + 1 < self.retry_attempts {
                let jitter_ms = rand::rng().random_range(10..100);
                tokio::time::sleep(Duration::from_millis(jitter_ms)).await;
            }
        }
        SdkOpResult::failed(vec![last_error.unwrap_or_else(|| "exhausted retries".to_string())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskguard_sdk::{ContractId, MockSdk, SymbolRoot};

    #[tokio::test]
    async fn close_position_dispatches_to_sdk() {
        let sdk = Arc::new(MockSdk::new());
        let executor = EnforcementExecutor::new(sdk.clone());
        let action = ResolvedAction::ClosePosition {
            symbol: SymbolRoot::from("MNQ".to_string()),
            contract_id: ContractId::from("MNQZ25".to_string()),
            reason: "daily_unrealized_loss".to_string(),
        };
        let result = executor.execute(&action).await.unwrap();
        assert!(result.success);
        assert_eq!(sdk.calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn alert_only_never_touches_the_sdk() {
        let sdk = Arc::new(MockSdk::new());
        let executor = EnforcementExecutor::new(sdk.clone());
        let action = ResolvedAction::AlertOnly { message: "disconnected".to_string() };
        assert!(executor.execute(&action).await.is_none());
        assert!(sdk.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn flatten_and_cancel_dispatches_composite_call() {
        let sdk = Arc::new(MockSdk::new());
        let executor = EnforcementExecutor::new(sdk.clone());
        let action = ResolvedAction::FlattenAndCancel { symbol: None };
        let result = executor.execute(&action).await.unwrap();
        assert!(result.success);
        assert_eq!(result.affected_count, 2);
    }
}
