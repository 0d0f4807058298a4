//! §4.11 #13: realized daily P&L at or above a (positive) target triggers
//! the same enforcement as `daily_realized_loss`, framed as a win rather
//! than a violation message.

use crate::{
    context::EngineContext,
    rule::Rule,
    rule_id::RuleId,
    violation::{ActionKind, Severity, Violation},
};
use riskguard_sdk::{Event, EventKind, Money};

#[derive(Debug, Clone)]
pub struct DailyRealizedProfit {
    pub enabled: bool,
    /// Positive. Triggers at `daily_pnl >= target` (§8: profit
    /// comparisons use `>=`).
    pub target: Money,
}

impl Rule for DailyRealizedProfit {
    fn id(&self) -> RuleId {
        RuleId::DailyRealizedProfit
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn evaluate(&self, event: &Event, ctx: &EngineContext<'_>) -> Option<Violation> {
        let realized_pnl = match &event.kind {
            EventKind::PositionClosed(e) => e.realized_pnl,
            EventKind::TradeExecuted(e) => e.realized_pnl,
            _ => return None,
        };
        realized_pnl?;

        if ctx.lockouts.is_locked_out(ctx.account_id) {
            return None;
        }

        let total = ctx.pnl.daily_pnl(ctx.account_id);
        if total < self.target {
            return None;
        }

        Some(
            Violation::new(
                self.id(),
                ctx.account_id.clone(),
                ActionKind::FlattenAndCancel,
                Severity::Info,
                format!("daily profit target reached: {total} >= {}", self.target),
                event.timestamp,
            )
            .with_lockout_until(ctx.reset.next_daily_reset()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context_test_support::{test_context, StubState};
    use chrono::Utc;
    use riskguard_sdk::{event::PositionClosed, AccountId, ContractId, Side, SymbolRoot};

    #[test]
    fn triggers_at_exactly_the_target() {
        let rule = DailyRealizedProfit {
            enabled: true,
            target: Money::new(100000, 2),
        };
        let account = AccountId::from("A".to_string());
        let stub = StubState {
            daily_pnl: Money::new(100000, 2),
            ..Default::default()
        };
        let positions = vec![];
        let ctx = test_context(&account, &positions, &stub);
        let event = Event::new(
            EventKind::PositionClosed(PositionClosed {
                account_id: account.clone(),
                symbol_root: SymbolRoot::from("ES".to_string()),
                contract_id: ContractId::from("ESZ25".to_string()),
                side: Side::Long,
                realized_pnl: Some(Money::new(30000, 2)),
            }),
            Utc::now(),
            riskguard_sdk::EventSource::Sdk,
        );
        assert!(rule.evaluate(&event, &ctx).is_some());
    }
}
