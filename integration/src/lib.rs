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

//! Shared low-level plumbing used by the rest of the riskguard workspace:
//! fast ordered collections, a `Terminal` trait for streams/events that
//! can signal their own shutdown, and a `Snapshot` wrapper for "current
//! value as of a point in time" state.

pub mod collection;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Communicates that a stream or event represents (or requests) termination
/// of whatever is consuming it, e.g. a `Shutdown` event on the engine's
/// event bus.
pub trait Terminal {
    fn is_terminal(&self) -> bool;
}

/// A value alongside the time it was observed or took effect.
///
/// Used for anything that is a "current snapshot" rather than a durable
/// history: the last quote price for a symbol, the last lockout state
/// loaded from the store, etc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Snapshot<T> {
    pub value: T,
    pub time: DateTime<Utc>,
}

impl<T> Snapshot<T> {
    pub fn new(value: T, time: DateTime<Utc>) -> Self {
        Self { value, time }
    }
}
