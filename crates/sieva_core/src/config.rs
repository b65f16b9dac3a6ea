//! Engine configuration.

use sieva_model::FIELD_CREATE_TIME;
use std::time::Duration;

/// Configuration for an entity service.
#[derive(Debug, Clone)]
pub struct Config {
    /// Page size used when the caller supplies none (or a non-positive one).
    pub default_page_size: u64,

    /// Sort field used when the caller supplies none.
    pub default_sort_field: String,

    /// Whether delete marks rows disabled instead of removing them.
    pub soft_delete: bool,

    /// Whether updates to a disabled entity are rejected with `Forbidden`
    /// until the entity is enabled again.
    pub require_enabled_for_update: bool,

    /// Page size used by the export pipeline's streaming reads.
    pub export_page_size: u64,

    /// TTL for export-job status records.
    pub export_ttl: Duration,

    /// TTL for distributed lock entries (a crash-safety bound, not the
    /// acquisition timeout).
    pub lock_ttl: Duration,

    /// Sleep between lock acquisition attempts.
    pub lock_poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            default_sort_field: FIELD_CREATE_TIME.to_string(),
            soft_delete: false,
            require_enabled_for_update: false,
            export_page_size: 500,
            export_ttl: Duration::from_secs(60 * 60),
            lock_ttl: Duration::from_secs(30),
            lock_poll_interval: Duration::from_millis(50),
        }
    }
}

impl Config {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default page size.
    #[must_use]
    pub fn default_page_size(mut self, size: u64) -> Self {
        self.default_page_size = size;
        self
    }

    /// Sets the default sort field.
    #[must_use]
    pub fn default_sort_field(mut self, field: impl Into<String>) -> Self {
        self.default_sort_field = field.into();
        self
    }

    /// Enables or disables soft-delete mode.
    #[must_use]
    pub fn soft_delete(mut self, value: bool) -> Self {
        self.soft_delete = value;
        self
    }

    /// Requires entities to be enabled before they can be updated.
    #[must_use]
    pub fn require_enabled_for_update(mut self, value: bool) -> Self {
        self.require_enabled_for_update = value;
        self
    }

    /// Sets the export streaming page size.
    #[must_use]
    pub fn export_page_size(mut self, size: u64) -> Self {
        self.export_page_size = size;
        self
    }

    /// Sets the lock poll interval.
    #[must_use]
    pub fn lock_poll_interval(mut self, interval: Duration) -> Self {
        self.lock_poll_interval = interval;
        self
    }

    /// Sets the lock entry TTL.
    #[must_use]
    pub fn lock_ttl(mut self, ttl: Duration) -> Self {
        self.lock_ttl = ttl;
        self
    }
}
