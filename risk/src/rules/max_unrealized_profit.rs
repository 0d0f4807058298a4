//! §4.11 #5: per-position unrealized profit at or above a target closes
//! that contract only - no lockout. Mirrors `daily_unrealized_loss` with
//! the comparison flipped (§8: profit targets use `>=`).

use crate::{
    context::EngineContext,
    rule::Rule,
    rule_id::RuleId,
    violation::{ActionKind, Severity, Violation},
};
use riskguard_sdk::{Event, EventKind, Money};

#[derive(Debug, Clone)]
pub struct MaxUnrealizedProfit {
    pub enabled: bool,
    /// Positive. Triggers at `unrealized_pnl >= target`.
    pub target: Money,
}

impl Rule for MaxUnrealizedProfit {
    fn id(&self) -> RuleId {
        RuleId::MaxUnrealizedProfit
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn evaluate(&self, event: &Event, ctx: &EngineContext<'_>) -> Option<Violation> {
        let e = match &event.kind {
            EventKind::UnrealizedPnlUpdate(e) => e,
            _ => return None,
        };

        if e.unrealized_pnl < self.target {
            return None;
        }

        ctx.position(&e.contract_id)?;

        Some(
            Violation::new(
                self.id(),
                ctx.account_id.clone(),
                ActionKind::ClosePosition,
                Severity::Info,
                format!(
                    "{} unrealized profit {} reached target {}",
                    e.symbol_root, e.unrealized_pnl, self.target
                ),
                event.timestamp,
            )
            .with_symbol(e.symbol_root.clone())
            .with_contract(e.contract_id.clone()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context_test_support::{test_context, StubState};
    use chrono::Utc;
    use riskguard_sdk::{event::UnrealizedPnlUpdate, AccountId, ContractId, Position, Side, SymbolRoot};

    fn mnq_position() -> Position {
        Position::new(
            SymbolRoot::from("MNQ".to_string()),
            ContractId::from("MNQZ25".to_string()),
            Side::Long,
            1,
            rust_decimal::Decimal::new(2000000, 2),
        )
    }

    #[test]
    fn triggers_at_exactly_the_target() {
        let rule = MaxUnrealizedProfit {
            enabled: true,
            target: Money::new(50000, 2),
        };
        let account = AccountId::from("A".to_string());
        let positions = vec![mnq_position()];
        let stub = StubState::default();
        let ctx = test_context(&account, &positions, &stub);

        let event = Event::new(
            EventKind::UnrealizedPnlUpdate(UnrealizedPnlUpdate {
                account_id: account.clone(),
                contract_id: ContractId::from("MNQZ25".to_string()),
                symbol_root: SymbolRoot::from("MNQ".to_string()),
                unrealized_pnl: Money::new(50000, 2),
            }),
            Utc::now(),
            riskguard_sdk::EventSource::MarketData,
        );

        let violation = rule.evaluate(&event, &ctx).expect("expected violation");
        assert_eq!(violation.action, ActionKind::ClosePosition);
        assert!(!violation.lockout_required);
    }

    #[test]
    fn no_violation_below_target() {
        let rule = MaxUnrealizedProfit {
            enabled: true,
            target: Money::new(50000, 2),
        };
        let account = AccountId::from("A".to_string());
        let positions = vec![mnq_position()];
        let stub = StubState::default();
        let ctx = test_context(&account, &positions, &stub);

        let event = Event::new(
            EventKind::UnrealizedPnlUpdate(UnrealizedPnlUpdate {
                account_id: account.clone(),
                contract_id: ContractId::from("MNQZ25".to_string()),
                symbol_root: SymbolRoot::from("MNQ".to_string()),
                unrealized_pnl: Money::new(10000, 2),
            }),
            Utc::now(),
            riskguard_sdk::EventSource::MarketData,
        );

        assert!(rule.evaluate(&event, &ctx).is_none());
    }
}
