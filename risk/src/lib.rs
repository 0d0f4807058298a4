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

//! The rule model and the thirteen concrete rule behaviors (§4.11, C11).
//!
//! Grounded in `toucan-risk`'s `RiskManager` / `RiskCheck` pattern
//! (approve-or-refuse an order), generalized here to "evaluate an event,
//! optionally emit a `Violation`". This crate never depends on
//! `riskguard-core`: rules read and write shared state exclusively through
//! the borrowed trait objects on [`context::EngineContext`] /
//! [`context::EnforcementContext`], which `riskguard-core`'s managers
//! implement. That one-way dependency is what keeps `core -> risk -> sdk`
//! from becoming a cycle (§9).

pub mod context;
#[cfg(test)]
pub mod context_test_support;
pub mod rule;
pub mod rule_id;
pub mod rules;
pub mod violation;

pub use rule::{AutomationRule, Rule};
pub use rule_id::RuleId;
pub use violation::{ActionKind, AutomationAction, Severity, Violation};
