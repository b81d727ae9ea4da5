//! The durable-commit dependency consumed by logs.

use crate::error::RegionResult;
use crate::region::Region;

/// Makes a byte range of a region durable.
///
/// This is the pluggable `persist(addr, size)` primitive. Implementations may
/// flush CPU cache lines, call a storage fence, `msync` a mapping, or ship the
/// bytes to a remote durable store. Callers only rely on one guarantee: once
/// `persist` returns `Ok`, the range is recoverable by a later recovery scan.
///
/// A failed call must leave the caller free to retry the same request.
pub trait Persist {
    /// Persists `len` bytes of `region` starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns the durability path's error verbatim.
    fn persist(&mut self, region: &dyn Region, offset: usize, len: usize) -> RegionResult<()>;
}

impl<P: Persist + ?Sized> Persist for &mut P {
    fn persist(&mut self, region: &dyn Region, offset: usize, len: usize) -> RegionResult<()> {
        (**self).persist(region, offset, len)
    }
}

impl<P: Persist + ?Sized> Persist for Box<P> {
    fn persist(&mut self, region: &dyn Region, offset: usize, len: usize) -> RegionResult<()> {
        (**self).persist(region, offset, len)
    }
}

/// Persists by writing the range back through the region itself.
///
/// For a [`crate::MappedRegion`] this is an `msync` of the covering pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlushPersist;

impl Persist for FlushPersist {
    fn persist(&mut self, region: &dyn Region, offset: usize, len: usize) -> RegionResult<()> {
        region.flush_range(offset, len)
    }
}

/// Accepts every request without doing anything.
///
/// Use this for logs that only serve as volatile staging buffers.
#[derive(Debug, Clone, Copy, Default)]
pub struct VolatilePersist;

impl Persist for VolatilePersist {
    fn persist(&mut self, _region: &dyn Region, _offset: usize, _len: usize) -> RegionResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InMemoryRegion, RegionError};

    #[test]
    fn flush_persist_checks_bounds() {
        let region = InMemoryRegion::new(16);
        let mut persist = FlushPersist;
        assert!(persist.persist(&region, 0, 16).is_ok());
        assert!(matches!(
            persist.persist(&region, 8, 16),
            Err(RegionError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn volatile_persist_always_succeeds() {
        let region = InMemoryRegion::new(4);
        let mut persist = VolatilePersist;
        assert!(persist.persist(&region, 100, 100).is_ok());
    }

    #[test]
    fn persist_through_reference() {
        let region = InMemoryRegion::new(4);
        let mut inner = FlushPersist;
        let by_ref = &mut inner;
        assert!(by_ref.persist(&region, 0, 4).is_ok());
    }
}
