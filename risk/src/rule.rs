use crate::{
    context::{EngineContext, EnforcementContext},
    rule_id::RuleId,
    violation::{AutomationAction, Violation},
};
use riskguard_sdk::{AccountId, Event};

/// One of the thirteen concrete rule behaviors (§4.11). `evaluate` is a
/// pure function of its inputs - no suspension, no mutation of engine
/// state other than through the explicit `TimerCommand` handle on
/// `EngineContext` that a couple of rules need for grace-period
/// bookkeeping (§5, §9).
pub trait Rule: Send + Sync {
    fn id(&self) -> RuleId;
    fn enabled(&self) -> bool;

    fn evaluate(&self, event: &Event, ctx: &EngineContext<'_>) -> Option<Violation>;

    /// Executes this violation's side effects: pushes a `ResolvedAction`
    /// into `ctx.actions` and applies any lockout/cooldown it calls for.
    /// The default implementation covers every rule except
    /// `trade_management`, which overrides it to emit an `Automation`
    /// action instead of a `Violation`-shaped one.
    fn enforce(&self, _account: &AccountId, violation: &Violation, ctx: &mut EnforcementContext<'_>) {
        ctx.apply_default(violation);
    }
}

/// Automation, not enforcement (§4.11 #12): a second, distinct-channel
/// trait for `trade_management`, the one rule whose output is never a
/// `Violation`. The engine runs [`AutomationRule::automate`] for every
/// rule implementing it alongside the normal [`Rule`] fan-out, and hands
/// the resulting [`AutomationAction`]s straight to the executor without
/// publishing `RULE_VIOLATED` (§9).
pub trait AutomationRule: Send + Sync {
    fn enabled(&self) -> bool;
    fn automate(&self, event: &Event, ctx: &EngineContext<'_>) -> Vec<AutomationAction>;
}
