//! In-memory region for DRAM staging buffers and tests.

use crate::error::RegionResult;
use crate::region::Region;

/// A zero-initialised region held in ordinary memory.
///
/// This region is suitable for:
/// - The local DRAM cache of a log that ships its bytes to a remote store
/// - Unit and integration tests
/// - Reconstructing a "durable image" captured by a test harness
///
/// Flushing is a no-op: nothing here survives the process.
///
/// # Example
///
/// ```rust
/// use pmkit_region::{InMemoryRegion, Region};
///
/// let region = InMemoryRegion::new(1000);
/// assert_eq!(region.len(), 1000);
/// assert!(region.bytes().iter().all(|&b| b == 0));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InMemoryRegion {
    data: Vec<u8>,
}

impl InMemoryRegion {
    /// Creates a zeroed region of `size` bytes.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size],
        }
    }

    /// Creates a region with pre-existing contents.
    ///
    /// Useful for testing recovery scenarios.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Consumes the region and returns its bytes.
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    /// Overwrites the whole region with zeroes.
    pub fn zero(&mut self) {
        self.data.fill(0);
    }
}

impl Region for InMemoryRegion {
    fn bytes(&self) -> &[u8] {
        &self.data
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    fn flush_range(&self, offset: usize, len: usize) -> RegionResult<()> {
        // Nothing to write back, but callers still get bounds checking
        self.check_range(offset, len)
    }
}
