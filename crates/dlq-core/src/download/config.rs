//! Download manager configuration.

/// Concurrency bound used when a queue is created without an explicit one.
pub const DEFAULT_MAX_CONCURRENT: u32 = 4;

/// Configuration for creating a download manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadManagerConfig {
    /// Concurrency bound for queues created via `create_queue`.
    pub default_max_concurrent: u32,
}

impl Default for DownloadManagerConfig {
    fn default() -> Self {
        Self {
            default_max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

impl DownloadManagerConfig {
    /// Create a config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default concurrency bound. Zero is raised to one.
    #[must_use]
    pub fn with_default_max_concurrent(mut self, max: u32) -> Self {
        self.default_max_concurrent = max.max(1);
        self
    }
}
