//! §4.11 #10: connection/auth loss is alert-only, never destructive - the
//! engine does not auto-flatten on disconnect "to avoid fighting the
//! broker mid-outage" (§7, `AuthLost`). Connection state itself is
//! tracked by `riskguard-core`'s bridge/connection manager
//! ([`crate::context::ConnectionQuery`]); this rule only reacts to the
//! events that manager publishes.

use crate::{
    context::EngineContext,
    rule::Rule,
    rule_id::RuleId,
    violation::{ActionKind, Severity, Violation},
};
use riskguard_sdk::{Event, EventKind};

#[derive(Debug, Clone)]
pub struct AuthLossGuard {
    pub enabled: bool,
}

impl Rule for AuthLossGuard {
    fn id(&self) -> RuleId {
        RuleId::AuthLossGuard
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn evaluate(&self, event: &Event, ctx: &EngineContext<'_>) -> Option<Violation> {
        let message = match &event.kind {
            EventKind::SdkDisconnected(e) => format!("SDK disconnected: {}", e.reason),
            EventKind::AuthFailed(e) => format!("authentication failed: {}", e.reason),
            _ => return None,
        };

        Some(Violation::new(
            self.id(),
            ctx.account_id.clone(),
            ActionKind::AlertOnly,
            Severity::Critical,
            message,
            event.timestamp,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context_test_support::{test_context, StubState};
    use chrono::Utc;
    use riskguard_sdk::{
        event::{AuthFailed, SdkDisconnected},
        AccountId,
    };

    #[test]
    fn disconnect_produces_alert_only_never_destructive() {
        let rule = AuthLossGuard { enabled: true };
        let account = AccountId::from("A".to_string());
        let stub = StubState::default();
        let positions = vec![];
        let ctx = test_context(&account, &positions, &stub);

        let event = Event::new(
            EventKind::SdkDisconnected(SdkDisconnected {
                reason: "socket reset".to_string(),
            }),
            Utc::now(),
            riskguard_sdk::EventSource::Sdk,
        );
        let violation = rule.evaluate(&event, &ctx).expect("expected violation");
        assert_eq!(violation.action, ActionKind::AlertOnly);
    }

    #[test]
    fn auth_failed_also_alerts() {
        let rule = AuthLossGuard { enabled: true };
        let account = AccountId::from("A".to_string());
        let stub = StubState::default();
        let positions = vec![];
        let ctx = test_context(&account, &positions, &stub);

        let event = Event::new(
            EventKind::AuthFailed(AuthFailed {
                reason: "bad credentials".to_string(),
            }),
            Utc::now(),
            riskguard_sdk::EventSource::Sdk,
        );
        assert!(rule.evaluate(&event, &ctx).is_some());
    }

    #[test]
    fn unrelated_events_are_ignored() {
        let rule = AuthLossGuard { enabled: true };
        let account = AccountId::from("A".to_string());
        let stub = StubState::default();
        let positions = vec![];
        let ctx = test_context(&account, &positions, &stub);

        let event = Event::new(
            EventKind::SystemStarted(riskguard_sdk::event::SystemStarted),
            Utc::now(),
            riskguard_sdk::EventSource::Internal,
        );
        assert!(rule.evaluate(&event, &ctx).is_none());
    }
}
