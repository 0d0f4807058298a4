//! Error taxonomy (§7). These are kinds, not a single catch-all type: each
//! variant carries the policy its section of the pipeline applies
//! (retry-then-surface, log-and-drop, exit-the-process), rather than
//! leaving callers to rediscover the policy from context.

use thiserror::Error;

/// Top-level error surfaced by the engine loop, the bridge, or the
/// executor. Most of these are logged and the pipeline continues; only
/// [`EngineError::ConfigInvalid`] is fatal (§7).
#[derive(Debug, Error)]
pub enum EngineError {
    /// Retryable broker/network failure. The executor retries with jitter
    /// (default 3 attempts) before surfacing a partial failure.
    #[error("transient SDK error: {0}")]
    TransientSdk(String),

    /// Persistent-store I/O failed. On the enforcement path: retry once,
    /// then log, publish an `alert_only` synthetic violation, and continue
    /// - never block the engine loop.
    #[error("store failure: {0}")]
    StoreFailure(#[from] riskguard_store::StoreError),

    /// Detected at config-load time. The process exits with code 2 (§6).
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// Unexpected payload shape from the SDK. Logged with the raw payload
    /// and the event is dropped; the engine does not crash.
    #[error("protocol error translating SDK payload: {0}")]
    ProtocolError(String),

    /// An exception escaped a rule's `evaluate` or `enforce`. Logged with
    /// full context; the engine continues with the next rule/event and the
    /// rule stays enabled.
    #[error("rule {rule} failed: {source}")]
    RuleBug {
        rule: riskguard_risk::RuleId,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Connection or authentication lost. Produces `SDK_DISCONNECTED` /
    /// `AUTH_FAILED` events; the engine itself never auto-flattens on this
    /// (§7: "to avoid fighting the broker mid-outage").
    #[error("SDK authentication/connection lost: {0}")]
    AuthLost(String),
}

impl From<riskguard_sdk::SdkError> for EngineError {
    fn from(value: riskguard_sdk::SdkError) -> Self {
        match value {
            riskguard_sdk::SdkError::NotConnected => EngineError::AuthLost(value.to_string()),
            riskguard_sdk::SdkError::Timeout | riskguard_sdk::SdkError::Transient(_) => {
                EngineError::TransientSdk(value.to_string())
            }
            riskguard_sdk::SdkError::Rejected(reason) => EngineError::TransientSdk(reason),
        }
    }
}

/// Process-level result for `main`/config loading: a [`EngineError::ConfigInvalid`]
/// should map to exit code 2, anything else to 1 (§6).
pub fn exit_code_for(err: &EngineError) -> i32 {
    match err {
        EngineError::ConfigInvalid(_) => 2,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_invalid_maps_to_exit_code_two() {
        let err = EngineError::ConfigInvalid("missing tick table entry for MNQ".to_string());
        assert_eq!(exit_code_for(&err), 2);
    }

    #[test]
    fn other_errors_map_to_exit_code_one() {
        let err = EngineError::TransientSdk("timeout".to_string());
        assert_eq!(exit_code_for(&err), 1);
    }
}
