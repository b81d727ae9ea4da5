//! Region trait definition.

use crate::error::{RegionError, RegionResult};

/// A fixed-size, byte-addressable persistent region.
///
/// Regions are **opaque byte spans**. Higher layers (logs, the naming table)
/// own the interpretation of the bytes; a region only exposes them and knows
/// how to make a sub-range durable.
///
/// # Invariants
///
/// - `len()` never changes for the lifetime of the region
/// - Offsets are relative to the region base, so a value stored in one
///   process resolves to the same bytes in the next
/// - After `flush_range(offset, len)` returns `Ok`, the bytes in that range
///   survive process termination (for volatile regions this is a no-op)
pub trait Region {
    /// Returns the region contents.
    fn bytes(&self) -> &[u8];

    /// Returns the region contents for mutation.
    fn bytes_mut(&mut self) -> &mut [u8];

    /// Makes `len` bytes starting at `offset` durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the range is out of bounds or the backing store
    /// fails to write the range back.
    fn flush_range(&self, offset: usize, len: usize) -> RegionResult<()>;

    /// Returns the size of the region in bytes.
    fn len(&self) -> usize {
        self.bytes().len()
    }

    /// Returns `true` if the region holds no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks that `[offset, offset + len)` lies inside the region.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::OutOfBounds`] if it does not.
    fn check_range(&self, offset: usize, len: usize) -> RegionResult<()> {
        let size = self.len();
        match offset.checked_add(len) {
            Some(end) if end <= size => Ok(()),
            _ => Err(RegionError::OutOfBounds { offset, len, size }),
        }
    }
}

impl<R: Region + ?Sized> Region for &mut R {
    fn bytes(&self) -> &[u8] {
        (**self).bytes()
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        (**self).bytes_mut()
    }

    fn flush_range(&self, offset: usize, len: usize) -> RegionResult<()> {
        (**self).flush_range(offset, len)
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}

impl<R: Region + ?Sized> Region for Box<R> {
    fn bytes(&self) -> &[u8] {
        (**self).bytes()
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        (**self).bytes_mut()
    }

    fn flush_range(&self, offset: usize, len: usize) -> RegionResult<()> {
        (**self).flush_range(offset, len)
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}
