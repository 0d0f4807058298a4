#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! Broker SDK boundary (§6) for the riskguard workspace: domain types
//! (`Side`, `Money`, `TickInfo`, `Position`, `Order`), the closed `Event`
//! model the rest of the pipeline runs on (§4.3), the raw pre-translation
//! callback payloads (§4.10), and the `BrokerSdk` async trait plus its
//! `MockSdk` test double.
//!
//! Grounded in `profitdll` (this workspace's former DLL-specific broker
//! crate): we keep its `mock`/trait-behind-`Box<dyn _>` shape but make the
//! trait transport-agnostic instead of Profit-DLL-specific.

pub mod broker;
pub mod domain;
pub mod event;
pub mod ids;
pub mod raw;

pub mod mock;

pub use broker::{BrokerSdk, SdkError, SdkOpResult, WorkingOrderSnapshot};
pub use domain::{classify_order_intent, Money, Order, OrderIntent, OrderStatus, OrderType, Position, Side, TickInfo};
pub use event::{Event, EventKind, EventSource};
pub use ids::{AccountId, ContractId, OrderId, SymbolRoot, TradeId};
pub use mock::MockSdk;
