//! §4.11 #7: a single realized loss above a tiered magnitude starts a
//! cooldown, e.g. `>=$100 -> 5min`, `>=$200 -> 15min`, `>=$300 -> 30min`.
//! The highest applicable tier wins; half-turns are ignored and an
//! already-cooling-down account is skipped.

use crate::{
    context::EngineContext,
    rule::Rule,
    rule_id::RuleId,
    violation::{ActionKind, Severity, Violation},
};
use riskguard_sdk::{Event, EventKind, Money};

/// One `{loss_amount, cooldown_duration}` tier from the YAML config (§6).
/// `loss_amount` is a positive magnitude threshold.
#[derive(Debug, Clone, Copy)]
pub struct LossTier {
    pub loss_amount: Money,
    pub cooldown_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct CooldownAfterLoss {
    pub enabled: bool,
    /// Sorted highest-threshold-first at construction so evaluation picks
    /// the highest applicable tier.
    tiers: Vec<LossTier>,
}

impl CooldownAfterLoss {
    pub fn new(enabled: bool, mut tiers: Vec<LossTier>) -> Self {
        tiers.sort_by(|a, b| b.loss_amount.cmp(&a.loss_amount));
        Self { enabled, tiers }
    }
}

impl Rule for CooldownAfterLoss {
    fn id(&self) -> RuleId {
        RuleId::CooldownAfterLoss
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn evaluate(&self, event: &Event, ctx: &EngineContext<'_>) -> Option<Violation> {
        let realized_pnl = match &event.kind {
            EventKind::PositionClosed(e) => e.realized_pnl,
            EventKind::TradeExecuted(e) => e.realized_pnl,
            _ => return None,
        }?;

        if realized_pnl >= Money::ZERO {
            return None;
        }

        if ctx.lockouts.is_locked_out(ctx.account_id) {
            return None;
        }

        let magnitude = -realized_pnl;
        let tier = self.tiers.iter().find(|t| magnitude >= t.loss_amount)?;

        Some(
            Violation::new(
                self.id(),
                ctx.account_id.clone(),
                ActionKind::Cooldown,
                Severity::Warning,
                format!("loss of {magnitude} triggered a {}s cooldown", tier.cooldown_seconds),
                event.timestamp,
            )
            .with_cooldown_seconds(tier.cooldown_seconds),
        )
    }
}
