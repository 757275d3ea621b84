//! Crate-level error types for action dispatch, persistence and formatting.

/// Error returned when a [`UserAction`](crate::UserAction) is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserError {
    /// The supplied user record is not fully specified.
    ///
    /// Carries a description of the missing or blank field. The store
    /// state is left untouched when this is returned.
    #[error("invalid user state: {0}")]
    InvalidState(String),
}

/// Error type for dashboard actions.
///
/// Uninhabited: every dashboard action is unconditionally valid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DashboardError {}

/// Error raised inside the persistence layer.
///
/// Never returned from a store action. The persistence middleware logs
/// these via `tracing::warn!` and carries on with the in-memory state.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The underlying key-value storage failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted blob could not be encoded or decoded.
    #[error("persisted state is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The persisted blob was written by an incompatible version.
    #[error("persisted state version {found} does not match expected {expected}")]
    VersionMismatch {
        /// Version found in the blob.
        found: u32,
        /// Version this build writes.
        expected: u32,
    },
}

/// Error returned by the date formatting helpers for unparseable input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid date: {0:?}")]
pub struct FormatError(pub String);
