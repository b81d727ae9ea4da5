//! Store configuration.

use pmkit_region::RegionSize;

/// Configuration for opening a [`crate::PmStore`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Size of the backing region, or [`RegionSize::WholeFile`] to map an
    /// existing file as it is.
    pub region_size: RegionSize,

    /// Whether to create the backing file if it doesn't exist.
    pub create_if_missing: bool,

    /// Bytes at region offset 0 reserved for the naming table and its seeds.
    /// Everything after them is the log area. Clamped to the region size.
    pub naming_bytes: usize,

    /// Whether to flush the naming area after every register and deregister.
    pub sync_names: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            region_size: RegionSize::Exact(64 * 1024 * 1024), // 64 MB
            create_if_missing: true,
            naming_bytes: 1024 * 1024, // 1 MB, ~4000 seeds
            sync_names: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the region size.
    #[must_use]
    pub const fn region_size(mut self, size: RegionSize) -> Self {
        self.region_size = size;
        self
    }

    /// Sets whether to create the backing file if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets the size of the naming area.
    #[must_use]
    pub const fn naming_bytes(mut self, bytes: usize) -> Self {
        self.naming_bytes = bytes;
        self
    }

    /// Sets whether naming updates are flushed immediately.
    #[must_use]
    pub const fn sync_names(mut self, value: bool) -> Self {
        self.sync_names = value;
        self
    }
}
