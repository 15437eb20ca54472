use thiserror::Error;

/// Canonical planner error taxonomy used across crates.
///
/// Classification guidance:
/// - [`SspError::InvalidConfig`]: fast-field/schema contract violations and bad options,
///   always raised before any split is scanned
/// - [`SspError::Planning`]: malformed read requests
/// - [`SspError::Unsupported`]: valid requests for aggregation kinds or column types the
///   index engine cannot evaluate
/// - [`SspError::Execution`]: cache-manager lifecycle and pre-warm dispatch failures
/// - [`SspError::Io`]: raw filesystem failures while loading table-log snapshots
#[derive(Debug, Error)]
pub enum SspError {
    /// Invalid or inconsistent configuration/schema state.
    ///
    /// Examples:
    /// - aggregation column not declared as a fast field
    /// - group-by column missing from the split schema
    /// - unparsable option value (`cache.max_size=lots`)
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Request shape problems discovered while planning.
    #[error("planning error: {0}")]
    Planning(String),

    /// Failures of advisory machinery (cache managers, pre-warm dispatch).
    ///
    /// These never reach the query path; callers log and continue.
    #[error("execution error: {0}")]
    Execution(String),

    /// Transparent std IO failures.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Valid request for an aggregation or type the index engine cannot push down.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// Standard planner result alias.
pub type Result<T> = std::result::Result<T, SspError>;
