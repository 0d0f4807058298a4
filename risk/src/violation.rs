use crate::rule_id::RuleId;
use chrono::{DateTime, Utc};
use riskguard_sdk::{AccountId, ContractId, OrderId, SymbolRoot};
use serde::{Deserialize, Serialize};

/// Coarse enforcement action a violation calls for (§4.11).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    ClosePosition,
    Flatten,
    FlattenAndCancel,
    Cancel,
    Cooldown,
    AlertOnly,
}

impl ActionKind {
    /// Destructive actions outrank alerts; `flatten_and_cancel` outranks
    /// everything (§4.11, "Priority & interaction rules").
    pub fn priority(self) -> u8 {
        match self {
            ActionKind::FlattenAndCancel => 4,
            ActionKind::Flatten => 3,
            ActionKind::ClosePosition => 3,
            ActionKind::Cancel => 2,
            ActionKind::Cooldown => 1,
            ActionKind::AlertOnly => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// A rule's verdict on one event (§4.11). Every rule-specific detail the
/// enforcement step or an audit trail needs rides along as an optional
/// field rather than a per-rule struct, since the set of rules is closed
/// and small.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub rule: RuleId,
    pub account_id: AccountId,
    pub action: ActionKind,
    pub severity: Severity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub symbol: Option<SymbolRoot>,
    pub contract_id: Option<ContractId>,
    pub order_id: Option<OrderId>,
    /// Set when this violation should also place the account under a hard
    /// lockout (daily loss/profit rules, §4.11 #3/#13).
    pub lockout_required: bool,
    pub lockout_until: Option<DateTime<Utc>>,
    /// Set when this violation should place the account under a cooldown
    /// of this many seconds (§4.11 #6/#7).
    pub cooldown_seconds: Option<u64>,
}

impl Violation {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rule: RuleId,
        account_id: AccountId,
        action: ActionKind,
        severity: Severity,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            rule,
            account_id,
            action,
            severity,
            message: message.into(),
            timestamp,
            symbol: None,
            contract_id: None,
            order_id: None,
            lockout_required: false,
            lockout_until: None,
            cooldown_seconds: None,
        }
    }

    pub fn with_symbol(mut self, symbol: SymbolRoot) -> Self {
        self.symbol = Some(symbol);
        self
    }

    pub fn with_contract(mut self, contract_id: ContractId) -> Self {
        self.contract_id = Some(contract_id);
        self
    }

    pub fn with_lockout_until(mut self, until: DateTime<Utc>) -> Self {
        self.lockout_required = true;
        self.lockout_until = Some(until);
        self
    }

    pub fn with_cooldown_seconds(mut self, seconds: u64) -> Self {
        self.cooldown_seconds = Some(seconds);
        self
    }
}

/// A non-violation `Action` the `trade_management` automation rule emits
/// on a distinct channel (§4.11 #12): never a `Violation`, carries no
/// enforcement coalescing semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AutomationAction {
    PlaceBracketOrder {
        account_id: AccountId,
        symbol: SymbolRoot,
        contract_id: ContractId,
        stop_price: rust_decimal::Decimal,
        target_price: rust_decimal::Decimal,
    },
    AdjustTrailingStop {
        account_id: AccountId,
        symbol: SymbolRoot,
        order_id: OrderId,
        new_stop_price: rust_decimal::Decimal,
    },
}
