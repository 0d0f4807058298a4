//! §4.11 #9: blocks trading activity outside an allowed local wall-clock
//! window (optionally restricted to certain weekdays), in a configured
//! timezone. Holiday handling is explicitly optional per §4.11 and not
//! implemented here.

use crate::{
    context::EngineContext,
    rule::Rule,
    rule_id::RuleId,
    violation::{ActionKind, Severity, Violation},
};
use chrono::{NaiveTime, Weekday};
use chrono_tz::Tz;
use riskguard_sdk::{Event, EventKind};

#[derive(Debug, Clone)]
pub struct SessionBlockOutside {
    pub enabled: bool,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub timezone: Tz,
    /// `None` means every weekday is allowed.
    pub allowed_weekdays: Option<Vec<Weekday>>,
}

impl SessionBlockOutside {
    fn is_outside(&self, timestamp: chrono::DateTime<chrono::Utc>) -> bool {
        let local = timestamp.with_timezone(&self.timezone);

        if let Some(weekdays) = &self.allowed_weekdays {
            if !weekdays.contains(&local.weekday()) {
                return true;
            }
        }

        let t = local.time();
        let inside = if self.start <= self.end {
            t >= self.start && t < self.end
        } else {
            // Overnight session, e.g. 18:00 -> 17:00 next day.
            t >= self.start || t < self.end
        };
        !inside
    }
}

impl Rule for SessionBlockOutside {
    fn id(&self) -> RuleId {
        RuleId::SessionBlockOutside
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn evaluate(&self, event: &Event, ctx: &EngineContext<'_>) -> Option<Violation> {
        if !self.is_outside(event.timestamp) {
            return None;
        }

        match &event.kind {
            EventKind::PositionOpened(e) => Some(
                Violation::new(
                    self.id(),
                    ctx.account_id.clone(),
                    ActionKind::ClosePosition,
                    Severity::Warning,
                    format!("{} opened outside the allowed trading session", e.position.symbol_root),
                    event.timestamp,
                )
                .with_symbol(e.position.symbol_root.clone())
                .with_contract(e.position.contract_id.clone()),
            ),
            EventKind::PositionUpdated(e) => Some(
                Violation::new(
                    self.id(),
                    ctx.account_id.clone(),
                    ActionKind::ClosePosition,
                    Severity::Warning,
                    format!("{} held outside the allowed trading session", e.position.symbol_root),
                    event.timestamp,
                )
                .with_symbol(e.position.symbol_root.clone())
                .with_contract(e.position.contract_id.clone()),
            ),
            EventKind::OrderPlaced(e) => Some(
                Violation::new(
                    self.id(),
                    ctx.account_id.clone(),
                    ActionKind::Cancel,
                    Severity::Warning,
                    "order placed outside the allowed trading session".to_string(),
                    event.timestamp,
                )
                .with_contract(e.order.contract_id.clone()),
            ),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context_test_support::{test_context, StubState};
    use chrono::{TimeZone, Utc};
    use riskguard_sdk::{event::PositionOpened, AccountId, ContractId, Position, Side, SymbolRoot};

    fn rule() -> SessionBlockOutside {
        SessionBlockOutside {
            enabled: true,
            start: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            end: NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
            timezone: chrono_tz::America::New_York,
            allowed_weekdays: None,
        }
    }

    fn opened_event(account: &AccountId, timestamp: chrono::DateTime<Utc>) -> Event {
        Event::new(
            EventKind::PositionOpened(PositionOpened {
                account_id: account.clone(),
                position: Position::new(
                    SymbolRoot::from("ES".to_string()),
                    ContractId::from("ESZ25".to_string()),
                    Side::Long,
                    1,
                    rust_decimal::Decimal::new(500000, 2),
                ),
            }),
            timestamp,
            riskguard_sdk::EventSource::Sdk,
        )
    }

    #[test]
    fn blocks_outside_the_session() {
        let rule = rule();
        let account = AccountId::from("A".to_string());
        let stub = StubState::default();
        let positions = vec![];
        let ctx = test_context(&account, &positions, &stub);
        // 02:00 UTC is 21:00 or 22:00 America/New_York depending on DST - always outside 09:30-16:00.
        let timestamp = Utc.with_ymd_and_hms(2026, 1, 15, 2, 0, 0).unwrap();
        assert!(rule.evaluate(&opened_event(&account, timestamp), &ctx).is_some());
    }

    #[test]
    fn allows_inside_the_session() {
        let rule = rule();
        let account = AccountId::from("A".to_string());
        let stub = StubState::default();
        let positions = vec![];
        let ctx = test_context(&account, &positions, &stub);
        // 15:00 UTC is 10:00 America/New_York in January (EST, UTC-5).
        let timestamp = Utc.with_ymd_and_hms(2026, 1, 15, 15, 0, 0).unwrap();
        assert!(rule.evaluate(&opened_event(&account, timestamp), &ctx).is_none());
    }
}
