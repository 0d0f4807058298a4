//! §4.11 #4: per-position unrealized loss at or below a (negative) limit
//! closes that contract only - no account-wide flatten, no lockout. Only
//! evaluated once the market data subsystem has a current price for the
//! symbol (§4.9): without one there is nothing to compare.

use crate::{
    context::EngineContext,
    rule::Rule,
    rule_id::RuleId,
    violation::{ActionKind, Severity, Violation},
};
use riskguard_sdk::{Event, EventKind, Money};

#[derive(Debug, Clone)]
pub struct DailyUnrealizedLoss {
    pub enabled: bool,
    /// Negative. Triggers at `unrealized_pnl <= loss_limit` (§8: `<=`).
    pub loss_limit: Money,
}

impl Rule for DailyUnrealizedLoss {
    fn id(&self) -> RuleId {
        RuleId::DailyUnrealizedLoss
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn evaluate(&self, event: &Event, ctx: &EngineContext<'_>) -> Option<Violation> {
        let e = match &event.kind {
            EventKind::UnrealizedPnlUpdate(e) => e,
            _ => return None,
        };

        if e.unrealized_pnl > self.loss_limit {
            return None;
        }

        // §4.9's staleness handling: no price means no `UnrealizedPnlUpdate`
        // is ever published for the contract, so reaching here already
        // implies a current price exists.
        ctx.position(&e.contract_id)?;

        Some(
            Violation::new(
                self.id(),
                ctx.account_id.clone(),
                ActionKind::ClosePosition,
                Severity::Warning,
                format!(
                    "{} unrealized loss {} breached limit {}",
                    e.symbol_root, e.unrealized_pnl, self.loss_limit
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

    fn es_position() -> Position {
        Position::new(
            SymbolRoot::from("ES".to_string()),
            ContractId::from("ESZ25".to_string()),
            Side::Long,
            2,
            rust_decimal::Decimal::new(500000, 2),
        )
    }

    #[test]
    fn s3_scenario_closes_only_that_contract() {
        let rule = DailyUnrealizedLoss {
            enabled: true,
            loss_limit: Money::new(-30000, 2),
        };
        let account = AccountId::from("A".to_string());
        let positions = vec![es_position()];
        let stub = StubState::default();
        let ctx = test_context(&account, &positions, &stub);

        let event = Event::new(
            EventKind::UnrealizedPnlUpdate(UnrealizedPnlUpdate {
                account_id: account.clone(),
                contract_id: ContractId::from("ESZ25".to_string()),
                symbol_root: SymbolRoot::from("ES".to_string()),
                unrealized_pnl: Money::new(-30000, 2),
            }),
            Utc::now(),
            riskguard_sdk::EventSource::MarketData,
        );

        let violation = rule.evaluate(&event, &ctx).expect("expected violation");
        assert_eq!(violation.action, ActionKind::ClosePosition);
        assert_eq!(violation.contract_id, Some(ContractId::from("ESZ25".to_string())));
        assert!(!violation.lockout_required);
    }

    #[test]
    fn no_violation_above_limit() {
        let rule = DailyUnrealizedLoss {
            enabled: true,
            loss_limit: Money::new(-30000, 2),
        };
        let account = AccountId::from("A".to_string());
        let positions = vec![es_position()];
        let stub = StubState::default();
        let ctx = test_context(&account, &positions, &stub);

        let event = Event::new(
            EventKind::UnrealizedPnlUpdate(UnrealizedPnlUpdate {
                account_id: account.clone(),
                contract_id: ContractId::from("ESZ25".to_string()),
                symbol_root: SymbolRoot::from("ES".to_string()),
                unrealized_pnl: Money::new(-10000, 2),
            }),
            Utc::now(),
            riskguard_sdk::EventSource::MarketData,
        );

        assert!(rule.evaluate(&event, &ctx).is_none());
    }
}
