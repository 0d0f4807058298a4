//! §4.11 #3: realized daily P&L at or below a (negative) limit triggers a
//! full flatten-and-cancel plus a hard lockout until the next daily reset.
//! Half-turn trades are ignored; an already-locked-out account short-
//! circuits (§4.5, §8 invariant 7).

use crate::{
    context::EngineContext,
    rule::Rule,
    rule_id::RuleId,
    violation::{ActionKind, Severity, Violation},
};
use riskguard_sdk::{Event, EventKind, Money};

#[derive(Debug, Clone)]
pub struct DailyRealizedLoss {
    pub enabled: bool,
    /// Negative. Triggers at `daily_pnl <= limit` (§8: loss comparisons
    /// use `<=`).
    pub limit: Money,
}

impl Rule for DailyRealizedLoss {
    fn id(&self) -> RuleId {
        RuleId::DailyRealizedLoss
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
        // Half-turn (position-opening) trades carry no realized P&L.
        realized_pnl?;

        if ctx.lockouts.is_locked_out(ctx.account_id) {
            return None;
        }

        let total = ctx.pnl.daily_pnl(ctx.account_id);
        if total > self.limit {
            return None;
        }

        Some(
            Violation::new(
                self.id(),
                ctx.account_id.clone(),
                ActionKind::FlattenAndCancel,
                Severity::Critical,
                format!("daily realized loss {total} breached limit {}", self.limit),
                event.timestamp,
            )
            .with_lockout_until(ctx.reset.next_daily_reset()),
        )
    }
}
