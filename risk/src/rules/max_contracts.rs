//! §4.11 #1: total open size across all positions over an account-wide
//! limit triggers a full flatten - the blunt instrument, used when a
//! trader's aggregate exposure (not any one instrument) is the concern.

use crate::{
    context::EngineContext,
    rule::Rule,
    rule_id::RuleId,
    violation::{ActionKind, Severity, Violation},
};
use riskguard_sdk::{Event, EventKind};

#[derive(Debug, Clone)]
pub struct MaxContracts {
    pub enabled: bool,
    pub limit: u32,
}

impl Rule for MaxContracts {
    fn id(&self) -> RuleId {
        RuleId::MaxContracts
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn evaluate(&self, event: &Event, ctx: &EngineContext<'_>) -> Option<Violation> {
        if !matches!(event.kind, EventKind::PositionOpened(_) | EventKind::PositionUpdated(_)) {
            return None;
        }

        let total = ctx.sum_abs_size();
        if total <= self.limit {
            return None;
        }

        Some(Violation::new(
            self.id(),
            ctx.account_id.clone(),
            ActionKind::FlattenAndCancel,
            Severity::Critical,
            format!("total size {total} exceeds max_contracts limit {}", self.limit),
            event.timestamp,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context_test_support::{test_context, StubState};
    use chrono::Utc;
    use riskguard_sdk::{event::PositionUpdated, AccountId, ContractId, Position, Side, SymbolRoot};

    fn one_position(quantity: u32) -> Position {
        Position::new(
            SymbolRoot::from("MNQ".to_string()),
            ContractId::from("MNQZ25".to_string()),
            Side::Long,
            quantity,
            rust_decimal::Decimal::new(20000, 2),
        )
    }

    #[test]
    fn triggers_when_sum_exceeds_limit() {
        let rule = MaxContracts { enabled: true, limit: 2 };
        let account = AccountId::from("A".to_string());
        let positions = vec![one_position(3)];
        let stub = StubState::default();
        let ctx = test_context(&account, &positions, &stub);
        let event = Event::new(
            EventKind::PositionUpdated(PositionUpdated {
                account_id: account.clone(),
                position: positions[0].clone(),
            }),
            Utc::now(),
            riskguard_sdk::EventSource::Sdk,
        );
        let violation = rule.evaluate(&event, &ctx).expect("expected violation");
        assert_eq!(violation.action, ActionKind::FlattenAndCancel);
    }

    #[test]
    fn no_violation_at_exactly_the_limit() {
        let rule = MaxContracts { enabled: true, limit: 3 };
        let account = AccountId::from("A".to_string());
        let positions = vec![one_position(3)];
        let stub = StubState::default();
        let ctx = test_context(&account, &positions, &stub);
        let event = Event::new(
            EventKind::PositionUpdated(PositionUpdated {
                account_id: account.clone(),
                position: positions[0].clone(),
            }),
            Utc::now(),
            riskguard_sdk::EventSource::Sdk,
        );
        assert!(rule.evaluate(&event, &ctx).is_none());
    }
}
