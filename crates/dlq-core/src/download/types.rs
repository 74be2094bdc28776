//! Core value types for queued downloads.
//!
//! Pure data types with no I/O dependencies.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier for one requested download.
///
/// Stable for the life of the request, including after the item has left
/// its queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    /// Generate a fresh, unique item ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ItemId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Caller-held reference to a download.
///
/// Remembers which queue holds the item so control operations can be routed
/// without a global index. A handle outlives the item's record: once the
/// item reaches a terminal state, operations through the handle report
/// failure instead of acting.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DownloadHandle {
    id: ItemId,
    queue: Arc<str>,
}

impl DownloadHandle {
    /// Create a handle for an item held by `queue`.
    pub fn new(id: ItemId, queue: impl Into<Arc<str>>) -> Self {
        Self {
            id,
            queue: queue.into(),
        }
    }

    /// The item identifier.
    #[must_use]
    pub const fn id(&self) -> ItemId {
        self.id
    }

    /// Name of the queue holding the item.
    #[must_use]
    pub fn queue(&self) -> &str {
        &self.queue
    }
}

impl fmt::Display for DownloadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.queue, self.id)
    }
}

/// Lifecycle state of an item.
///
/// Paused is not a state of its own: a paused item is `InProgress` with its
/// pause flag set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    /// Constructed but not yet admitted to a queue.
    #[default]
    Unknown,
    /// Waiting for a concurrency slot.
    Pending,
    /// Transfer running (or paused).
    InProgress,
    /// Transfer finished successfully.
    Complete,
    /// Cancelled by the caller.
    Cancelled,
    /// Transfer reported an error.
    Failed,
}

impl ItemState {
    /// Whether no further transition is defined out of this state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Cancelled | Self::Failed)
    }

    /// String form used in logs and CLI output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Complete => "complete",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the transport should put the downloaded bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// Stream to a file in the transport's download directory.
    #[default]
    File,
    /// Buffer the whole body in memory.
    Memory,
}

/// Result of a successful transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Payload {
    /// Path of the file the body was written to.
    File(PathBuf),
    /// The body itself.
    Data(Bytes),
}

impl Payload {
    /// The destination mode that produces this payload.
    #[must_use]
    pub const fn destination(&self) -> Destination {
        match self {
            Self::File(_) => Destination::File,
            Self::Data(_) => Destination::Memory,
        }
    }

    /// File path, if this is a file payload.
    #[must_use]
    pub fn as_path(&self) -> Option<&std::path::Path> {
        match self {
            Self::File(path) => Some(path),
            Self::Data(_) => None,
        }
    }

    /// In-memory body, if this is a data payload.
    #[must_use]
    pub const fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Data(data) => Some(data),
            Self::File(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_ids_are_unique() {
        assert_ne!(ItemId::generate(), ItemId::generate());
    }

    #[test]
    fn test_handle_display() {
        let id = ItemId::from(Uuid::nil());
        let handle = DownloadHandle::new(id, "music");
        assert_eq!(handle.queue(), "music");
        assert_eq!(handle.id(), id);
        assert_eq!(
            handle.to_string(),
            "music/00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_terminal_states() {
        assert!(!ItemState::Unknown.is_terminal());
        assert!(!ItemState::Pending.is_terminal());
        assert!(!ItemState::InProgress.is_terminal());
        assert!(ItemState::Complete.is_terminal());
        assert!(ItemState::Cancelled.is_terminal());
        assert!(ItemState::Failed.is_terminal());
    }

    #[test]
    fn test_payload_accessors() {
        let file = Payload::File(PathBuf::from("/tmp/a.bin"));
        assert_eq!(file.destination(), Destination::File);
        assert!(file.as_bytes().is_none());

        let data = Payload::Data(Bytes::from_static(b"abc"));
        assert_eq!(data.destination(), Destination::Memory);
        assert_eq!(data.as_bytes().map(|b| b.len()), Some(3));
        assert!(data.as_path().is_none());
    }
}
