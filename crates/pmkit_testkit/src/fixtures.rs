//! Test fixtures for stores and logs.

use pmkit_core::{Config, PmStore, PrimitiveLog, SyncPersistentLog};
use pmkit_region::{InMemoryRegion, Persist, RegionSize};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Region size used by [`TestStore::new`].
pub const TEST_REGION_SIZE: u64 = 256 * 1024;

/// Naming area size used by [`TestStore::new`].
pub const TEST_NAMING_BYTES: usize = 32 * 1024;

/// A store in a temporary directory, removed on drop.
pub struct TestStore {
    /// The store instance.
    pub store: PmStore,
    path: PathBuf,
    config: Config,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: TempDir,
}

impl TestStore {
    /// Creates a small store in a fresh temporary directory.
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// Creates a store with a custom configuration.
    pub fn with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("region.pm");
        let store = PmStore::open(&path, config.clone()).expect("Failed to open store");
        Self {
            store,
            path,
            config,
            _temp_dir: temp_dir,
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Closes the store and opens it again from its file.
    pub fn reopen(self) -> Self {
        let Self {
            store,
            path,
            config,
            _temp_dir,
        } = self;
        store.close().expect("Failed to close store");
        let store = PmStore::open(&path, config.clone()).expect("Failed to reopen store");
        Self {
            store,
            path,
            config,
            _temp_dir,
        }
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestStore {
    type Target = PmStore;

    fn deref(&self) -> &PmStore {
        &self.store
    }
}

impl std::ops::DerefMut for TestStore {
    fn deref_mut(&mut self) -> &mut PmStore {
        &mut self.store
    }
}

/// Configuration for small test stores.
pub fn test_config() -> Config {
    Config::default()
        .region_size(RegionSize::Exact(TEST_REGION_SIZE))
        .naming_bytes(TEST_NAMING_BYTES)
}

/// Runs a closure with a temporary store.
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&mut PmStore) -> R,
{
    let mut test = TestStore::new();
    f(&mut test.store)
}

/// A primitive log over a zeroed DRAM region of `len` bytes.
pub fn memory_log(len: usize) -> PrimitiveLog<InMemoryRegion> {
    PrimitiveLog::init(InMemoryRegion::new(len)).expect("Failed to init log")
}

/// A synchronous log over a zeroed DRAM staging buffer of `len` bytes.
pub fn staging_log<P: Persist>(len: usize, persist: P) -> SyncPersistentLog<InMemoryRegion, P> {
    SyncPersistentLog::new(InMemoryRegion::new(len), persist).expect("Failed to create log")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmkit_core::PmAddr;

    #[test]
    fn test_store_starts_fresh() {
        let test = TestStore::new();
        assert!(test.is_fresh());
        assert!(test.path().exists());
        assert_eq!(test.names().count(), 0);
    }

    #[test]
    fn reopen_keeps_names() {
        let mut test = TestStore::new();
        test.register("root", PmAddr::new(0x100)).unwrap();
        let test = test.reopen();
        assert!(!test.is_fresh());
        assert_eq!(test.retrieve("root"), Some(PmAddr::new(0x100)));
    }

    #[test]
    fn with_temp_store_runs_closure() {
        let count = with_temp_store(|store| {
            store.register("a", PmAddr::new(1)).unwrap();
            store.names().count()
        });
        assert_eq!(count, 1);
    }

    #[test]
    fn memory_log_is_empty() {
        let log = memory_log(64);
        assert!(log.is_empty());
        assert_eq!(log.capacity(), 64);
    }
}
