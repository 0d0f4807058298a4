//! §4.11 #2: per-symbol size limit, falling back to a default when the
//! symbol has no explicit override.

use crate::{
    context::EngineContext,
    rule::Rule,
    rule_id::RuleId,
    violation::{ActionKind, Severity, Violation},
};
use riskguard_integration::collection::FnvIndexMap;
use riskguard_sdk::{Event, EventKind, SymbolRoot};

#[derive(Debug, Clone)]
pub struct MaxContractsPerInstrument {
    pub enabled: bool,
    pub default_limit: u32,
    pub instrument_limits: FnvIndexMap<SymbolRoot, u32>,
}

impl MaxContractsPerInstrument {
    fn limit_for(&self, symbol: &SymbolRoot) -> u32 {
        self.instrument_limits.get(symbol).copied().unwrap_or(self.default_limit)
    }
}

impl Rule for MaxContractsPerInstrument {
    fn id(&self) -> RuleId {
        RuleId::MaxContractsPerInstrument
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn evaluate(&self, event: &Event, ctx: &EngineContext<'_>) -> Option<Violation> {
        let symbol = match &event.kind {
            EventKind::PositionOpened(e) => &e.position.symbol_root,
            EventKind::PositionUpdated(e) => &e.position.symbol_root,
            _ => return None,
        };

        let limit = self.limit_for(symbol);
        let size = ctx.abs_size_for_symbol(symbol);
        if size <= limit {
            return None;
        }

        Some(
            Violation::new(
                self.id(),
                ctx.account_id.clone(),
                ActionKind::FlattenAndCancel,
                Severity::Critical,
                format!("{symbol} size {size} exceeds per-instrument limit {limit}"),
                event.timestamp,
            )
            .with_symbol(symbol.clone()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context_test_support::{test_context, StubState};
    use chrono::Utc;
    use riskguard_sdk::{event::PositionUpdated, AccountId, ContractId, Position, Side};

    #[test]
    fn falls_back_to_default_limit_when_no_override() {
        let rule = MaxContractsPerInstrument {
            enabled: true,
            default_limit: 2,
            instrument_limits: FnvIndexMap::default(),
        };
        let account = AccountId::from("A".to_string());
        let positions = vec![Position::new(
            SymbolRoot::from("ES".to_string()),
            ContractId::from("ESZ25".to_string()),
            Side::Long,
            3,
            rust_decimal::Decimal::new(500000, 2),
        )];
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
        assert!(rule.evaluate(&event, &ctx).is_some());
    }

    #[test]
    fn per_instrument_override_wins_over_default() {
        let mut limits = FnvIndexMap::default();
        limits.insert(SymbolRoot::from("ES".to_string()), 5);
        let rule = MaxContractsPerInstrument {
            enabled: true,
            default_limit: 2,
            instrument_limits: limits,
        };
        let account = AccountId::from("A".to_string());
        let positions = vec![Position::new(
            SymbolRoot::from("ES".to_string()),
            ContractId::from("ESZ25".to_string()),
            Side::Long,
            3,
            rust_decimal::Decimal::new(500000, 2),
        )];
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
