//! File-backed store tying the naming table and the log area together.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::log::{PrimitiveLog, SyncPersistentLog};
use crate::naming::{self, NamingTable, Seeds, TABLE_BYTES};
use crate::types::PmAddr;
use pmkit_region::{
    FlushPersist, MappedRegion, Persist, Region, RegionError, RegionSize, SubRegion,
};
use std::io;
use std::path::Path;
use tracing::{debug, info};

/// An open persistent region with its naming table and log area.
///
/// The region is split at [`Config::naming_bytes`]:
///
/// ```text
/// 0                 naming_bytes                          len
/// ┌─────────────────┬────────────────────────────────────┐
/// │ naming table    │ log area                           │
/// └─────────────────┴────────────────────────────────────┘
/// ```
///
/// The split is not recorded in the file, so a store must be reopened with
/// the same `naming_bytes` it was created with.
///
/// # Example
///
/// ```rust,no_run
/// use pmkit_core::{Config, PmAddr, PmStore};
///
/// let mut store = PmStore::open("data.pm", Config::default())?;
/// store.register("root", PmAddr::new(0x2000))?;
/// assert_eq!(store.retrieve("root"), Some(PmAddr::new(0x2000)));
/// store.close()?;
/// # Ok::<(), pmkit_core::CoreError>(())
/// ```
#[derive(Debug)]
pub struct PmStore {
    region: MappedRegion,
    config: Config,
    naming_len: usize,
}

impl PmStore {
    /// Opens (or creates) the store backed by the file at `path`.
    ///
    /// # Errors
    ///
    /// - `Region(Io)` with `NotFound` if the file is absent and
    ///   `create_if_missing` is off
    /// - Any error from [`MappedRegion::open`], such as `Locked` or
    ///   `SizeMismatch`
    /// - `InvalidArgument` if the naming area cannot hold the table header
    /// - `NamingCorruption` if the existing table is inconsistent
    pub fn open(path: impl AsRef<Path>, config: Config) -> CoreResult<Self> {
        let path = path.as_ref();
        if !config.create_if_missing && !path.exists() {
            return Err(RegionError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!(
                    "{} does not exist and create_if_missing is false",
                    path.display()
                ),
            ))
            .into());
        }

        // Reject a bad split before the file is created.
        let planned = match config.region_size {
            RegionSize::Exact(len) => {
                config.naming_bytes.min(usize::try_from(len).unwrap_or(usize::MAX))
            }
            RegionSize::WholeFile => config.naming_bytes,
        };
        check_naming_len(planned)?;

        let mut region = MappedRegion::open(path, config.region_size)?;
        let naming_len = config.naming_bytes.min(region.len());
        check_naming_len(naming_len)?;
        NamingTable::open(SubRegion::new(&mut region, 0, naming_len)?)?;

        info!(
            path = %path.display(),
            size = region.len(),
            naming = naming_len,
            fresh = region.is_fresh(),
            "opened store"
        );
        Ok(Self {
            region,
            config,
            naming_len,
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        self.region.path()
    }

    /// Whether the backing file was created by this open.
    pub fn is_fresh(&self) -> bool {
        self.region.is_fresh()
    }

    /// The configuration the store was opened with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Size of the naming area.
    pub fn naming_len(&self) -> usize {
        self.naming_len
    }

    /// Size of the log area.
    pub fn log_len(&self) -> usize {
        self.region.len() - self.naming_len
    }

    /// Looks up the address registered under `id`.
    pub fn retrieve(&self, id: &str) -> Option<PmAddr> {
        naming::lookup(self.naming_bytes(), id)
    }

    /// Registers `addr` under `id`. See [`NamingTable::register`].
    ///
    /// With `sync_names` on this goes through
    /// [`NamingTable::register_durable`], flushing each step in order.
    ///
    /// # Errors
    ///
    /// Returns the flush error when `sync_names` is on.
    pub fn register(&mut self, id: &str, addr: PmAddr) -> CoreResult<Option<PmAddr>> {
        let sync = self.config.sync_names;
        let mut table = self.naming_table()?;
        if sync {
            table.register_durable(id, addr, &mut FlushPersist)
        } else {
            Ok(table.register(id, addr))
        }
    }

    /// Removes `id`. See [`NamingTable::deregister`].
    ///
    /// # Errors
    ///
    /// Returns the flush error when `sync_names` is on.
    pub fn deregister(&mut self, id: &str) -> CoreResult<Option<PmAddr>> {
        let sync = self.config.sync_names;
        let mut table = self.naming_table()?;
        if sync {
            table.deregister_durable(id, &mut FlushPersist)
        } else {
            Ok(table.deregister(id))
        }
    }

    /// Iterates over all registered `(id, address)` pairs.
    pub fn names(&self) -> Seeds<'_> {
        Seeds::new(self.naming_bytes())
    }

    /// Opens the naming table over the naming area.
    ///
    /// # Errors
    ///
    /// Returns `NamingCorruption` if the table is inconsistent.
    pub fn naming_table(&mut self) -> CoreResult<NamingTable<SubRegion<'_, MappedRegion>>> {
        let area = SubRegion::new(&mut self.region, 0, self.naming_len)?;
        NamingTable::open(area)
    }

    /// Returns the log area as a region window.
    ///
    /// # Errors
    ///
    /// Fails only if the region shrank underneath the store.
    pub fn log_area(&mut self) -> CoreResult<SubRegion<'_, MappedRegion>> {
        let len = self.log_len();
        Ok(SubRegion::new(&mut self.region, self.naming_len, len)?)
    }

    /// Initializes or recovers a primitive log over the log area.
    ///
    /// # Errors
    ///
    /// See [`PrimitiveLog::init`].
    pub fn open_log(&mut self) -> CoreResult<PrimitiveLog<SubRegion<'_, MappedRegion>>> {
        PrimitiveLog::init(self.log_area()?)
    }

    /// Initializes or recovers a synchronous persistent log over the log
    /// area.
    ///
    /// # Errors
    ///
    /// See [`SyncPersistentLog::new`].
    pub fn open_sync_log<P: Persist>(
        &mut self,
        persist: P,
    ) -> CoreResult<SyncPersistentLog<SubRegion<'_, MappedRegion>, P>> {
        SyncPersistentLog::new(self.log_area()?, persist)
    }

    /// Returns the mapped region.
    pub fn region(&self) -> &MappedRegion {
        &self.region
    }

    /// Flushes the whole region to its backing file.
    ///
    /// # Errors
    ///
    /// Returns the region's flush error.
    pub fn flush(&self) -> CoreResult<()> {
        Ok(self.region.flush()?)
    }

    /// Flushes and unmaps the region and releases its file lock.
    ///
    /// # Errors
    ///
    /// If this fails the mapped contents may not have reached the file;
    /// callers should save their state another way.
    pub fn close(self) -> CoreResult<()> {
        debug!(path = %self.region.path().display(), "closing store");
        Ok(self.region.close()?)
    }

    fn naming_bytes(&self) -> &[u8] {
        &self.region.bytes()[..self.naming_len]
    }
}

fn check_naming_len(naming_len: usize) -> CoreResult<()> {
    if naming_len < TABLE_BYTES {
        return Err(CoreError::invalid_argument(format!(
            "naming area of {naming_len} bytes cannot hold the {TABLE_BYTES}-byte table"
        )));
    }
    Ok(())
}
