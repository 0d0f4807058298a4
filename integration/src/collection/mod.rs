//! Collection aliases shared across the riskguard workspace.
//!
//! `indexmap` preserves insertion order, which several managers rely on
//! (e.g. the rule registry evaluates in registration order); FNV is a
//! cheap hash for the short string/integer keys used throughout (symbol
//! roots, contract ids, account ids).

/// Insertion-ordered map keyed by short identifiers, hashed with FNV.
pub type FnvIndexMap<K, V> = indexmap::IndexMap<K, V, fnv::FnvBuildHasher>;

/// Insertion-ordered set of short identifiers, hashed with FNV.
pub type FnvIndexSet<T> = indexmap::IndexSet<T, fnv::FnvBuildHasher>;
