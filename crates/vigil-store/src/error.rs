//! Error types for key-value stores.

/// Errors returned by a [`KeyValueStore`](crate::KeyValueStore).
///
/// Callers in the cache layer treat every variant as a cache miss. None of
/// these are ever shown to end users.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No backing store is configured.
    #[error("key-value store is disabled")]
    Disabled,

    /// The connection could not be opened or was lost.
    #[error("key-value store unavailable: {reason}")]
    Unavailable { reason: String },

    /// A command reached the store but failed.
    #[error("{command} failed: {reason}")]
    Command {
        command: &'static str,
        reason: String,
    },
}

impl StoreError {
    /// Creates an unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Creates a command error.
    pub fn command(command: &'static str, reason: impl Into<String>) -> Self {
        Self::Command {
            command,
            reason: reason.into(),
        }
    }

    /// Returns true for the "disabled" signal.
    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled)
    }

    /// Short label used for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Unavailable { .. } => "unavailable",
            Self::Command { .. } => "command",
        }
    }
}
