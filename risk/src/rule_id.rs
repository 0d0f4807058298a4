use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Closed set of the thirteen rules from §4.11. A `Vec<Box<dyn Rule>>`
/// registry holds one of each (at most), in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum RuleId {
    #[display("max_contracts")]
    MaxContracts,
    #[display("max_contracts_per_instrument")]
    MaxContractsPerInstrument,
    #[display("daily_realized_loss")]
    DailyRealizedLoss,
    #[display("daily_unrealized_loss")]
    DailyUnrealizedLoss,
    #[display("max_unrealized_profit")]
    MaxUnrealizedProfit,
    #[display("trade_frequency_limit")]
    TradeFrequencyLimit,
    #[display("cooldown_after_loss")]
    CooldownAfterLoss,
    #[display("no_stop_loss_grace")]
    NoStopLossGrace,
    #[display("session_block_outside")]
    SessionBlockOutside,
    #[display("auth_loss_guard")]
    AuthLossGuard,
    #[display("symbol_blocks")]
    SymbolBlocks,
    #[display("trade_management")]
    TradeManagement,
    #[display("daily_realized_profit")]
    DailyRealizedProfit,
}

impl RuleId {
    pub fn as_str(self) -> &'static str {
        match self {
            RuleId::MaxContracts => "max_contracts",
            RuleId::MaxContractsPerInstrument => "max_contracts_per_instrument",
            RuleId::DailyRealizedLoss => "daily_realized_loss",
            RuleId::DailyUnrealizedLoss => "daily_unrealized_loss",
            RuleId::MaxUnrealizedProfit => "max_unrealized_profit",
            RuleId::TradeFrequencyLimit => "trade_frequency_limit",
            RuleId::CooldownAfterLoss => "cooldown_after_loss",
            RuleId::NoStopLossGrace => "no_stop_loss_grace",
            RuleId::SessionBlockOutside => "session_block_outside",
            RuleId::AuthLossGuard => "auth_loss_guard",
            RuleId::SymbolBlocks => "symbol_blocks",
            RuleId::TradeManagement => "trade_management",
            RuleId::DailyRealizedProfit => "daily_realized_profit",
        }
    }
}
