//! Download domain types, events, errors, and configuration.
//!
//! This module contains pure data types for the queue system. No I/O,
//! networking, or runtime dependencies allowed.
//!
//! # Structure
//!
//! - `types` - Identifiers and value types (`ItemId`, `DownloadHandle`, `ItemState`, `Payload`)
//! - `events` - Observer events (`QueueEvent`)
//! - `errors` - Error type for queue and transfer operations
//! - `queue` - Snapshot DTOs (`QueueSnapshot`, `ItemSnapshot`)
//! - `config` - Manager configuration

pub mod config;
pub mod errors;
pub mod events;
pub mod queue;
pub mod types;

// Re-export commonly used types
pub use config::DownloadManagerConfig;
pub use errors::{DownloadError, DownloadResult};
pub use events::{EventKind, QueueEvent};
pub use queue::{ItemSnapshot, QueueSnapshot};
pub use types::{Destination, DownloadHandle, ItemId, ItemState, Payload};
