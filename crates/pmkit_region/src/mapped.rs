//! File-backed region mapped into memory.

use crate::error::{RegionError, RegionResult};
use crate::region::Region;
use fs2::FileExt;
use memmap2::MmapMut;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Size sentinel asking [`MappedRegion::open`] to map a whole existing file.
pub const SENTINEL_WHOLE_FILE: RegionSize = RegionSize::WholeFile;

/// How large a mapped region should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionSize {
    /// Map the whole of an existing file. Fails if the file is absent.
    WholeFile,
    /// Map exactly this many bytes, creating and zero-extending the file if it
    /// is absent or empty.
    Exact(u64),
}

/// A persistent region backed by a memory-mapped file.
///
/// The backing file is locked exclusively for as long as the region is open,
/// so a single process owns the region at a time.
///
/// # Durability
///
/// - Stores through [`Region::bytes_mut`] land in the page cache
/// - [`Region::flush_range`] calls `msync` on the covering pages
/// - [`MappedRegion::close`] flushes the whole mapping before unmapping
///
/// # Example
///
/// ```no_run
/// use pmkit_region::{MappedRegion, Region, RegionSize};
/// use std::path::Path;
///
/// let mut region = MappedRegion::open(Path::new("data.pmd"), RegionSize::Exact(4096)).unwrap();
/// region.bytes_mut()[..4].copy_from_slice(b"pmem");
/// region.flush_range(0, 4).unwrap();
/// region.close().unwrap();
/// ```
#[derive(Debug)]
pub struct MappedRegion {
    path: PathBuf,
    file: File,
    map: MmapMut,
    fresh: bool,
}

impl MappedRegion {
    /// Opens (or creates) a region from a backing file.
    ///
    /// With [`RegionSize::WholeFile`] the file must already exist and its full
    /// length is mapped. With [`RegionSize::Exact`] a missing or empty file is
    /// created and zero-extended to the requested size; a non-empty file must
    /// already have exactly that size.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be opened or created
    /// - Another process holds the region (returns `Locked`)
    /// - An existing file has a different size (returns `SizeMismatch`)
    /// - The resulting region would be empty
    pub fn open(path: &Path, size: RegionSize) -> RegionResult<Self> {
        let file = match size {
            RegionSize::WholeFile => OpenOptions::new().read(true).write(true).open(path)?,
            RegionSize::Exact(_) => OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(path)?,
        };

        if file.try_lock_exclusive().is_err() {
            return Err(RegionError::Locked);
        }

        let actual = file.metadata()?.len();
        let (len, fresh) = match size {
            RegionSize::WholeFile => (actual, false),
            RegionSize::Exact(expected) if actual == 0 => {
                if expected == 0 {
                    return Err(RegionError::Empty);
                }
                // set_len zero-fills, which is the initial state of every layout
                file.set_len(expected)?;
                file.sync_all()?;
                (expected, true)
            }
            RegionSize::Exact(expected) if actual != expected => {
                return Err(RegionError::SizeMismatch { expected, actual });
            }
            RegionSize::Exact(expected) => (expected, false),
        };

        if len == 0 {
            return Err(RegionError::Empty);
        }

        #[allow(unsafe_code)]
        // SAFETY: the exclusive lock is held for the lifetime of the mapping and
        // every cooperating process takes it before touching the file, so the
        // file is not truncated or remapped underneath us.
        let map = unsafe { MmapMut::map_mut(&file)? };

        if fresh {
            info!(path = %path.display(), len, "created persistent region");
        } else {
            debug!(path = %path.display(), len, "mapped persistent region");
        }

        Ok(Self {
            path: path.to_path_buf(),
            file,
            map,
            fresh,
        })
    }

    /// Returns the path to the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` if this open created and zero-initialised the region.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    /// Flushes the whole mapping to the backing file.
    ///
    /// # Errors
    ///
    /// Returns an error if `msync` fails.
    pub fn flush(&self) -> RegionResult<()> {
        self.map.flush()?;
        Ok(())
    }

    /// Flushes, unlocks and unmaps the region.
    ///
    /// # Errors
    ///
    /// Returns an error if outstanding bytes could not be written back. The
    /// caller must then save its state through another path.
    pub fn close(self) -> RegionResult<()> {
        self.map.flush()?;
        self.file.unlock()?;
        debug!(path = %self.path.display(), "closed persistent region");
        Ok(())
    }
}

impl Region for MappedRegion {
    fn bytes(&self) -> &[u8] {
        &self.map
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.map
    }

    fn flush_range(&self, offset: usize, len: usize) -> RegionResult<()> {
        self.check_range(offset, len)?;
        if len == 0 {
            return Ok(());
        }
        self.map.flush_range(offset, len)?;
        Ok(())
    }
}
