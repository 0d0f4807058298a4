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

//! Persistent store (C1, §3/§6): daily P&L, lockouts, trade history, and
//! the reset ledger. `rusqlite`-backed [`SqliteStore`] for production, a
//! [`memory::MemoryStore`] test double for unit tests.
//!
//! Grounded in the `rusqlite` (bundled) usage pattern for local trading-bot
//! state seen across the example pack; new relative to the teacher
//! workspace (`toucan`/`tucano` have no persistence crate) because this
//! spec requires crash-recoverable lockouts/P&L (SPEC_FULL.md).

pub mod error;
pub mod memory;
pub mod rows;
pub mod sqlite;
pub mod traits;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use rows::{DailyPnlRow, LockoutCategory, LockoutKind, LockoutRow, ResetKind, ResetLedgerRow, TradeRow};
pub use sqlite::SqliteStore;
pub use traits::Store;
