//! Stable identifier newtypes shared across the workspace.
//!
//! Kept distinct (rather than bare `String`) so a rule can never
//! accidentally compare a `ContractId` to a `SymbolRoot` - the compiler
//! catches it.

use derive_more::{Constructor, Display, From};
use serde::{Deserialize, Serialize};

/// Opaque, stable per-account identifier (§3).
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Constructor, Serialize, Deserialize,
)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Instrument family identifier shared across contract months (e.g. `MNQ`).
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Constructor, Serialize, Deserialize,
)]
pub struct SymbolRoot(pub String);

impl SymbolRoot {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Strips a broker-style exchange prefix, e.g. `F.US.MNQ` -> `MNQ`.
    ///
    /// The broker's own separator is `.`; we keep whatever follows the
    /// final separator as the root and preserve the original string as the
    /// `contract_id` the caller already holds separately.
    pub fn from_broker_symbol(raw: &str) -> Self {
        match raw.rsplit('.').next() {
            Some(root) => Self(root.to_string()),
            None => Self(raw.to_string()),
        }
    }
}

/// Broker-assigned identifier for a specific (month-coded) contract.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Constructor, Serialize, Deserialize,
)]
pub struct ContractId(pub String);

/// Broker-assigned order identifier.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Constructor, Serialize, Deserialize,
)]
pub struct OrderId(pub String);

/// Broker-assigned trade (fill) identifier.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Constructor, Serialize, Deserialize,
)]
pub struct TradeId(pub String);
