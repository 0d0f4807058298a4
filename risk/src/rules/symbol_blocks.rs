//! §4.11 #11: a configured blocklist of symbol roots, supporting exact
//! match and `*`-wildcards (prefix, suffix, contains), case-insensitive.
//! Triggers `close_position` for the specific contract; no lockout.

use crate::{
    context::EngineContext,
    rule::Rule,
    rule_id::RuleId,
    violation::{ActionKind, Severity, Violation},
};
use riskguard_sdk::{Event, EventKind};

#[derive(Debug, Clone)]
pub struct SymbolBlocks {
    pub enabled: bool,
    /// Patterns as configured, e.g. `["MES", "MICRO*", "*FUT", "*ES*"]`.
    pub blocked_symbols: Vec<String>,
}

impl SymbolBlocks {
    fn is_blocked(&self, symbol: &str) -> bool {
        let symbol = symbol.to_ascii_uppercase();
        self.blocked_symbols
            .iter()
            .any(|pattern| Self::matches_pattern(&pattern.to_ascii_uppercase(), &symbol))
    }

    fn matches_pattern(pattern: &str, symbol: &str) -> bool {
        if pattern == "*" {
            return true;
        }
        let starts = pattern.starts_with('*');
        let ends = pattern.ends_with('*');
        match (starts, ends) {
            (true, true) if pattern.len() >= 2 => symbol.contains(&pattern[1..pattern.len() - 1]),
            (true, false) => symbol.ends_with(&pattern[1..]),
            (false, true) => symbol.starts_with(&pattern[..pattern.len() - 1]),
            _ => symbol == pattern,
        }
    }
}

impl Rule for SymbolBlocks {
    fn id(&self) -> RuleId {
        RuleId::SymbolBlocks
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn evaluate(&self, event: &Event, ctx: &EngineContext<'_>) -> Option<Violation> {
        let (symbol, contract_id) = match &event.kind {
            EventKind::PositionOpened(e) => (e.position.symbol_root.clone(), e.position.contract_id.clone()),
            EventKind::PositionUpdated(e) => (e.position.symbol_root.clone(), e.position.contract_id.clone()),
            // §4.11 #11: "on any position/order event" - an order against
            // a blocked contract is just as much a violation as the
            // position event itself, so resolve the symbol from the
            // engine's position book the same way `no_stop_loss_grace`
            // does rather than skipping every non-position event.
            EventKind::OrderPlaced(e) => {
                let position = ctx.position(&e.order.contract_id)?;
                (position.symbol_root.clone(), position.contract_id.clone())
            }
            _ => return None,
        };

        if !self.is_blocked(symbol.as_str()) {
            return None;
        }

        Some(
            Violation::new(
                self.id(),
                ctx.account_id.clone(),
                ActionKind::ClosePosition,
                Severity::Warning,
                format!("{symbol} is on the blocked-symbol list"),
                event.timestamp,
            )
            .with_symbol(symbol)
            .with_contract(contract_id),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context_test_support::{test_context, StubState};
    use chrono::Utc;
    use riskguard_sdk::{event::PositionOpened, AccountId, ContractId, Position, Side, SymbolRoot};

    fn opened(symbol: &str) -> (Event, AccountId) {
        let account = AccountId::from("A".to_string());
        (
            Event::new(
                EventKind::PositionOpened(PositionOpened {
                    account_id: account.clone(),
                    position: Position::new(
                        SymbolRoot::from(symbol.to_string()),
                        ContractId::from(format!("{symbol}Z25")),
                        Side::Long,
                        1,
                        rust_decimal::Decimal::new(500000, 2),
                    ),
                }),
                Utc::now(),
                riskguard_sdk::EventSource::Sdk,
            ),
            account,
        )
    }

    #[test]
    fn exact_match_case_insensitive() {
        let rule = SymbolBlocks {
            enabled: true,
            blocked_symbols: vec!["mes".to_string()],
        };
        let (event, account) = opened("MES");
        let stub = StubState::default();
        let positions = vec![];
        let ctx = test_context(&account, &positions, &stub);
        assert!(rule.evaluate(&event, &ctx).is_some());
    }

    #[test]
    fn prefix_wildcard() {
        let rule = SymbolBlocks {
            enabled: true,
            blocked_symbols: vec!["MI*".to_string()],
        };
        let (event, account) = opened("MICRO");
        let stub = StubState::default();
        let positions = vec![];
        let ctx = test_context(&account, &positions, &stub);
        assert!(rule.evaluate(&event, &ctx).is_some());
    }

    #[test]
    fn contains_wildcard() {
        let rule = SymbolBlocks {
            enabled: true,
            blocked_symbols: vec!["*ES*".to_string()],
        };
        let (event, account) = opened("MES");
        let stub = StubState::default();
        let positions = vec![];
        let ctx = test_context(&account, &positions, &stub);
        assert!(rule.evaluate(&event, &ctx).is_some());
    }

    #[test]
    fn non_matching_symbol_passes() {
        let rule = SymbolBlocks {
            enabled: true,
            blocked_symbols: vec!["MES".to_string()],
        };
        let (event, account) = opened("MNQ");
        let stub = StubState::default();
        let positions = vec![];
        let ctx = test_context(&account, &positions, &stub);
        assert!(rule.evaluate(&event, &ctx).is_none());
    }

    #[test]
    fn order_placed_against_a_blocked_contract_closes_it() {
        use riskguard_sdk::{event::OrderPlaced, Order, OrderStatus, OrderType};

        let rule = SymbolBlocks {
            enabled: true,
            blocked_symbols: vec!["MES".to_string()],
        };
        let account = AccountId::from("A".to_string());
        let contract = ContractId::from("MESZ25".to_string());
        let positions = vec![Position::new(SymbolRoot::from("MES".to_string()), contract.clone(), Side::Long, 1, rust_decimal::Decimal::new(500000, 2))];
        let stub = StubState::default();
        let ctx = test_context(&account, &positions, &stub);

        let event = Event::new(
            EventKind::OrderPlaced(OrderPlaced {
                account_id: account.clone(),
                order: Order {
                    order_id: "o1".to_string().into(),
                    contract_id: contract.clone(),
                    order_type: OrderType::Limit,
                    side: Side::Long,
                    size: 1,
                    stop_price: None,
                    limit_price: Some(rust_decimal::Decimal::new(505000, 2)),
                    status: OrderStatus::Working,
                    filled_quantity: 0,
                },
                position_entry_price: None,
                position_side: None,
            }),
            Utc::now(),
            riskguard_sdk::EventSource::Sdk,
        );

        let violation = rule.evaluate(&event, &ctx).expect("blocked symbol must violate on an order event too");
        assert_eq!(violation.action, ActionKind::ClosePosition);
        assert_eq!(violation.contract_id, Some(contract));
    }

    #[test]
    fn order_placed_with_no_known_position_is_ignored() {
        use riskguard_sdk::{event::OrderPlaced, Order, OrderStatus, OrderType};

        let rule = SymbolBlocks {
            enabled: true,
            blocked_symbols: vec!["MES".to_string()],
        };
        let account = AccountId::from("A".to_string());
        let contract = ContractId::from("MESZ25".to_string());
        let stub = StubState::default();
        let positions = vec![];
        let ctx = test_context(&account, &positions, &stub);

        let event = Event::new(
            EventKind::OrderPlaced(OrderPlaced {
                account_id: account.clone(),
                order: Order {
                    order_id: "o1".to_string().into(),
                    contract_id: contract.clone(),
                    order_type: OrderType::Limit,
                    side: Side::Long,
                    size: 1,
                    stop_price: None,
                    limit_price: Some(rust_decimal::Decimal::new(505000, 2)),
                    status: OrderStatus::Working,
                    filled_quantity: 0,
                },
                position_entry_price: None,
                position_side: None,
            }),
            Utc::now(),
            riskguard_sdk::EventSource::Sdk,
        );

        assert!(rule.evaluate(&event, &ctx).is_none());
    }
}
