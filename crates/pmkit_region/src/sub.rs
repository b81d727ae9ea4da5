//! Windows over part of a region.

use crate::error::RegionResult;
use crate::region::Region;

/// A window `[offset, offset + len)` over a parent region.
///
/// Offsets passed to a `SubRegion` are relative to the window start; flushes
/// are translated to the parent. This lets several structures (the naming
/// table, one or more logs) share one mapped file without overlapping.
///
/// # Example
///
/// ```rust
/// use pmkit_region::{InMemoryRegion, Region, SubRegion};
///
/// let mut region = InMemoryRegion::new(100);
/// {
///     let mut window = SubRegion::new(&mut region, 40, 20).unwrap();
///     window.bytes_mut()[0] = 0xaa;
///     assert_eq!(window.len(), 20);
/// }
/// assert_eq!(region.bytes()[40], 0xaa);
/// ```
#[derive(Debug)]
pub struct SubRegion<'a, R: Region + ?Sized> {
    parent: &'a mut R,
    offset: usize,
    len: usize,
}

impl<'a, R: Region + ?Sized> SubRegion<'a, R> {
    /// Creates a window over `parent`.
    ///
    /// # Errors
    ///
    /// Returns `OutOfBounds` if the window does not fit inside the parent.
    pub fn new(parent: &'a mut R, offset: usize, len: usize) -> RegionResult<Self> {
        parent.check_range(offset, len)?;
        Ok(Self {
            parent,
            offset,
            len,
        })
    }

    /// Returns the window start, relative to the parent.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl<R: Region + ?Sized> Region for SubRegion<'_, R> {
    fn bytes(&self) -> &[u8] {
        &self.parent.bytes()[self.offset..self.offset + self.len]
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.parent.bytes_mut()[self.offset..self.offset + self.len]
    }

    fn flush_range(&self, offset: usize, len: usize) -> RegionResult<()> {
        self.check_range(offset, len)?;
        self.parent.flush_range(self.offset + offset, len)
    }

    fn len(&self) -> usize {
        self.len
    }
}
