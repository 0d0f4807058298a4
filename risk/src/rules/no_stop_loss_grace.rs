//! §4.11 #8: a grace-period timer started on `POSITION_OPENED`, cancelled
//! if a working order classifies as a stop loss for that contract before
//! it fires. This rule's `evaluate` never returns a `Violation` itself -
//! it only drives [`crate::context::TimerCommand`] side effects. The
//! actual `close_position` when the timer *fires* is resolved directly
//! from the [`crate::context::TimerCallback::CloseOnGraceExpiry`] payload
//! by the timer sweep in `riskguard-core`, since a timer firing has no
//! originating `Event` to run this rule's `evaluate` against (§5, §9).

use crate::{context::EngineContext, context::TimerCallback, rule::Rule, rule_id::RuleId, violation::Violation};
use riskguard_sdk::{classify_order_intent, Event, EventKind, OrderIntent};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct NoStopLossGrace {
    pub enabled: bool,
    pub require_within_seconds: u64,
}

impl NoStopLossGrace {
    fn timer_name(contract_id: &riskguard_sdk::ContractId) -> String {
        format!("no_stop_loss_grace_{contract_id}")
    }
}

impl Rule for NoStopLossGrace {
    fn id(&self) -> RuleId {
        RuleId::NoStopLossGrace
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn evaluate(&self, event: &Event, ctx: &EngineContext<'_>) -> Option<Violation> {
        match &event.kind {
            EventKind::PositionOpened(e) => {
                ctx.timers.start_timer(
                    Self::timer_name(&e.position.contract_id),
                    Duration::from_secs(self.require_within_seconds),
                    TimerCallback::CloseOnGraceExpiry {
                        account_id: e.account_id.clone(),
                        symbol: e.position.symbol_root.clone(),
                        contract_id: e.position.contract_id.clone(),
                    },
                );
                None
            }
            EventKind::OrderPlaced(e) => {
                // The bridge never populates `position_entry_price`/
                // `position_side` (§4.10 only carries the raw order), so
                // resolve the position the same way every other rule does:
                // from the engine's own book, not the event. The cache
                // check is a second, independent signal - it catches a
                // stop loss that was classified via the on-demand SDK
                // fallback (§4.8) rather than this event alone.
                let classifies_as_stop_loss = ctx.position(&e.order.contract_id).is_some_and(|position| {
                    matches!(
                        classify_order_intent(e.order.order_type, position.side, e.order.limit_price, position.entry_price),
                        OrderIntent::StopLoss
                    )
                });
                let cached_as_stop_loss = ctx.protective_orders.stop_loss(&e.order.contract_id).is_some();
                if classifies_as_stop_loss || cached_as_stop_loss {
                    ctx.timers.cancel_timer(&Self::timer_name(&e.order.contract_id));
                }
                None
            }
            _ => None,
        }
    }
}
