//! §4.11 #6: multi-tier rolling-window trade-count limits. The first tier
//! breached (by shortest window) selects the cooldown duration; rolling
//! counts come from the trade store via [`crate::context::TradeFrequencyQuery`],
//! never from event-local counters (§4.11: "Rolling counts come from the
//! trade store, not event-local counters").

use crate::{
    context::EngineContext,
    rule::Rule,
    rule_id::RuleId,
    violation::{ActionKind, Severity, Violation},
};
use chrono::Duration;
use riskguard_sdk::{Event, EventKind};

/// One rolling-window tier, e.g. `{per_minute: 3, per_minute_breach: 120}`
/// from the YAML config (§6).
#[derive(Debug, Clone)]
pub struct FrequencyTier {
    pub name: &'static str,
    pub window: Duration,
    pub limit: u32,
    pub cooldown_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct TradeFrequencyLimit {
    pub enabled: bool,
    /// Sorted shortest-window-first at construction time so evaluation
    /// can pick the first breach and have that be the shortest-window
    /// tier, per §4.11's priority rule.
    tiers: Vec<FrequencyTier>,
}

impl TradeFrequencyLimit {
    pub fn new(enabled: bool, mut tiers: Vec<FrequencyTier>) -> Self {
        tiers.sort_by_key(|t| t.window);
        Self { enabled, tiers }
    }
}

impl Rule for TradeFrequencyLimit {
    fn id(&self) -> RuleId {
        RuleId::TradeFrequencyLimit
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn evaluate(&self, event: &Event, ctx: &EngineContext<'_>) -> Option<Violation> {
        if !matches!(event.kind, EventKind::TradeExecuted(_)) {
            return None;
        }

        if ctx.lockouts.is_locked_out(ctx.account_id) {
            return None;
        }

        let breach = self
            .tiers
            .iter()
            .find(|tier| ctx.trade_frequency.trade_count_within(ctx.account_id, tier.window) > tier.limit)?;

        Some(
            Violation::new(
                self.id(),
                ctx.account_id.clone(),
                ActionKind::Flatten,
                Severity::Critical,
                format!("trade frequency breach: {} tier exceeded limit {}", breach.name, breach.limit),
                event.timestamp,
            )
            .with_cooldown_seconds(breach.cooldown_seconds),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context_test_support::{test_context, StubState};
    use chrono::Utc;
    use riskguard_sdk::{event::TradeExecuted, AccountId, Side, SymbolRoot};

    fn trade_event(account: &AccountId) -> Event {
        Event::new(
            EventKind::TradeExecuted(TradeExecuted {
                account_id: account.clone(),
                trade_id: "t4".to_string().into(),
                symbol_root: SymbolRoot::from("MNQ".to_string()),
                side: Side::Long,
                quantity: 1,
                price: rust_decimal::Decimal::new(2000000, 2),
                realized_pnl: None,
            }),
            Utc::now(),
            riskguard_sdk::EventSource::Sdk,
        )
    }

    #[test]
    fn s5_scenario_shortest_tier_wins() {
        let rule = TradeFrequencyLimit::new(
            true,
            vec![FrequencyTier {
                name: "per_minute",
                window: Duration::seconds(60),
                limit: 3,
                cooldown_seconds: 120,
            }],
        );
        let account = AccountId::from("A".to_string());
        let stub = StubState {
            trade_count_within: 4,
            ..Default::default()
        };
        let positions = vec![];
        let ctx = test_context(&account, &positions, &stub);

        let violation = rule.evaluate(&trade_event(&account), &ctx).expect("expected violation");
        assert_eq!(violation.action, ActionKind::Flatten);
        assert_eq!(violation.cooldown_seconds, Some(120));
    }

    #[test]
    fn already_locked_out_is_skipped() {
        let rule = TradeFrequencyLimit::new(
            true,
            vec![FrequencyTier {
                name: "per_minute",
                window: Duration::seconds(60),
                limit: 3,
                cooldown_seconds: 120,
            }],
        );
        let account = AccountId::from("A".to_string());
        let stub = StubState {
            trade_count_within: 10,
            locked_out: true,
            ..Default::default()
        };
        let positions = vec![];
        let ctx = test_context(&account, &positions, &stub);

        assert!(rule.evaluate(&trade_event(&account), &ctx).is_none());
    }

    #[test]
    fn no_breach_under_limit() {
        let rule = TradeFrequencyLimit::new(
            true,
            vec![FrequencyTier {
                name: "per_minute",
                window: Duration::seconds(60),
                limit: 3,
                cooldown_seconds: 120,
            }],
        );
        let account = AccountId::from("A".to_string());
        let stub = StubState {
            trade_count_within: 2,
            ..Default::default()
        };
        let positions = vec![];
        let ctx = test_context(&account, &positions, &stub);

        assert!(rule.evaluate(&trade_event(&account), &ctx).is_none());
    }
}
