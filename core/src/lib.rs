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
#![allow(clippy::type_complexity, clippy::too_many_arguments)]

//! Event bus, state managers, SDK bridge, risk engine and enforcement
//! executor for an always-on trading protection service.
//!
//! The pieces in this crate are wired together by [`engine::RiskEngine`]:
//! the [`bridge::SdkEventBridge`] translates raw broker callbacks into a
//! closed [`Event`](riskguard_sdk::Event) model, the [`event_bus::EventBus`]
//! fans those events out, and the engine owns every piece of mutable
//! in-memory state (positions, P&L, lockouts, protective-order cache,
//! connection status) so that rule evaluation always sees a consistent
//! snapshot for the event it is deciding on (§5, §9 of the design).
//!
//! Everything here runs on a single task. Managers expose `async` methods
//! because they go through the persistent [`riskguard_store::Store`], not
//! because they're meant to be called concurrently from multiple places.

/// SDK Event Bridge (C10): raw broker callbacks -> closed [`Event`](riskguard_sdk::Event) model.
pub mod bridge;

/// Clock & timezone service (C2): wall-clock/test clocks, DST-safe local-time conversion.
pub mod clock;

/// YAML configuration (§6): loads the rule registry and engine settings.
pub mod config;

/// Risk Engine (C12): the orchestrator that owns state and runs the rule registry.
pub mod engine;

/// Error taxonomy (§7).
pub mod error;

/// Per-`EventKind` broadcast Event Bus (C3).
pub mod event_bus;

/// Enforcement Executor (C13): resolves actions into SDK calls with bounded retry.
pub mod executor;

/// Lockout Manager (C5): per-account lockout/cooldown state, backed by the store.
pub mod lockout;

/// Structured logging initialisers (§7).
pub mod logging;

/// Market Data subsystem (C6, §4.9): last-price cache and significant-change gate.
pub mod market_data;

/// Daily P&L tracker (C4): realized P&L and trade counts since the last reset.
pub mod pnl;

/// Protective-order cache (C8, §4.8): stop-loss/take-profit lookups, invalidated on position updates.
pub mod protective_orders;

/// Daily Reset Scheduler (C7, §4.7): DST-safe per-account reset scheduling.
pub mod reset;

/// Graceful shutdown sequence (§5).
pub mod shutdown;

/// Timer Manager (C9): grace-period and other named per-contract timers.
pub mod timer;

pub use error::EngineError;
pub use riskguard_sdk::{Event, EventKind};
