//! The thirteen concrete rules of §4.11, one module each.

pub mod auth_loss_guard;
pub mod cooldown_after_loss;
pub mod daily_realized_loss;
pub mod daily_realized_profit;
pub mod daily_unrealized_loss;
pub mod max_contracts;
pub mod max_contracts_per_instrument;
pub mod max_unrealized_profit;
pub mod no_stop_loss_grace;
pub mod session_block_outside;
pub mod symbol_blocks;
pub mod trade_frequency_limit;
pub mod trade_management;

pub use auth_loss_guard::AuthLossGuard;
pub use cooldown_after_loss::{CooldownAfterLoss, LossTier};
pub use daily_realized_loss::DailyRealizedLoss;
pub use daily_realized_profit::DailyRealizedProfit;
pub use daily_unrealized_loss::DailyUnrealizedLoss;
pub use max_contracts::MaxContracts;
pub use max_contracts_per_instrument::MaxContractsPerInstrument;
pub use max_unrealized_profit::MaxUnrealizedProfit;
pub use no_stop_loss_grace::NoStopLossGrace;
pub use session_block_outside::SessionBlockOutside;
pub use symbol_blocks::SymbolBlocks;
pub use trade_frequency_limit::{FrequencyTier, TradeFrequencyLimit};
pub use trade_management::TradeManagement;
