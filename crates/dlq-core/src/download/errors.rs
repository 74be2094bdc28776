//! Download error types.
//!
//! These errors are designed to be serializable and not depend on external
//! error types like `std::io::Error`. For I/O errors, we capture the kind
//! and message as strings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for queue configuration and transfer outcomes.
///
/// Configuration errors (`QueueExists`, `UnknownQueue`, `InvalidConcurrency`)
/// are returned synchronously and never mutate state. Transfer errors reach
/// the caller only through the item's completion and the `item_failed` event.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum DownloadError {
    /// A queue with this name already exists.
    #[error("Queue already exists: {name}")]
    QueueExists {
        /// The duplicate queue name.
        name: String,
    },

    /// No queue with this name exists.
    #[error("Unknown queue: {name}")]
    UnknownQueue {
        /// The requested queue name.
        name: String,
    },

    /// Concurrency bound must be at least 1.
    #[error("Invalid concurrency limit: {value}")]
    InvalidConcurrency {
        /// The rejected value.
        value: u32,
    },

    /// Network/HTTP error during the transfer.
    #[error("Network error: {message}")]
    Network {
        /// Detailed error message.
        message: String,
        /// HTTP status code if available.
        #[serde(skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
    },

    /// I/O error while writing the payload.
    #[error("I/O error ({kind}): {message}")]
    Io {
        /// The kind of I/O error (e.g., "`NotFound`", "`PermissionDenied`").
        kind: String,
        /// Detailed error message.
        message: String,
    },

    /// Download was cancelled by the caller.
    #[error("Download cancelled")]
    Cancelled,

    /// The manager was dropped before the download resolved.
    #[error("Download abandoned: manager dropped")]
    Abandoned,

    /// General/uncategorized error.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

impl DownloadError {
    /// Create a queue-exists error.
    pub fn queue_exists(name: impl Into<String>) -> Self {
        Self::QueueExists { name: name.into() }
    }

    /// Create an unknown-queue error.
    pub fn unknown_queue(name: impl Into<String>) -> Self {
        Self::UnknownQueue { name: name.into() }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            status_code: None,
        }
    }

    /// Create a network error with HTTP status code.
    pub fn network_with_status(message: impl Into<String>, status_code: u16) -> Self {
        Self::Network {
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// Create an I/O error from kind and message strings.
    pub fn io(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Io {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error from a `std::io::Error`.
    #[must_use]
    pub fn from_io_error(err: &std::io::Error) -> Self {
        Self::io(format!("{:?}", err.kind()), err.to_string())
    }

    /// Create a generic error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Check if this is a cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Check if this error came from queue configuration rather than a transfer.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::QueueExists { .. } | Self::UnknownQueue { .. } | Self::InvalidConcurrency { .. }
        )
    }
}

/// Convenience result type for download operations.
pub type DownloadResult<T> = Result<T, DownloadError>;
