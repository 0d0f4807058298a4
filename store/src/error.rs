use thiserror::Error;

/// `StoreFailure` from §7's error taxonomy: persistent-store I/O failed.
/// Write-path callers retry once per §7's policy before giving up.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("store task panicked or was cancelled: {0}")]
    TaskJoin(String),
    #[error("invalid decimal stored at {column}: {value}")]
    InvalidDecimal { column: &'static str, value: String },
    #[error("invalid timestamp stored at {column}: {value}")]
    InvalidTimestamp { column: &'static str, value: String },
}
