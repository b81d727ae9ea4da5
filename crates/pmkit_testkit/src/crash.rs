//! Crash simulation for pmkit logs and naming tables.
//!
//! A simulated crash throws away everything that was written to a region but
//! not persisted. [`RecordingPersist`] keeps a shadow copy of the region that
//! is updated only by successful `persist` calls; that copy is exactly what
//! a machine would find after power loss. [`crash_image`] recovers a log from
//! it and [`crash_table`] reopens a naming table.
//!
//! [`FailingPersist`] injects `persist` failures to exercise the retry paths.

use parking_lot::Mutex;
use pmkit_core::{CoreResult, NamingTable, PrimitiveLog, SyncPersistentLog};
use pmkit_region::{InMemoryRegion, Persist, Region, RegionError, RegionResult, VolatilePersist};
use std::sync::Arc;

/// A persist implementation that records the durable image of a region.
///
/// Clones share the same image, so a test can hand one clone to a log and
/// keep another to inspect what survived.
#[derive(Debug, Clone)]
pub struct RecordingPersist {
    durable: Arc<Mutex<Vec<u8>>>,
    calls: Arc<Mutex<Vec<(usize, usize)>>>,
}

impl RecordingPersist {
    /// Creates a recorder whose durable image starts as `len` zero bytes,
    /// matching a freshly created region.
    pub fn new(len: usize) -> Self {
        Self::with_image(vec![0; len])
    }

    /// Creates a recorder starting from an existing durable image.
    pub fn with_image(image: Vec<u8>) -> Self {
        Self {
            durable: Arc::new(Mutex::new(image)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns a copy of the durable image.
    pub fn image(&self) -> Vec<u8> {
        self.durable.lock().clone()
    }

    /// Returns the `(offset, len)` of every successful persist call, in order.
    pub fn calls(&self) -> Vec<(usize, usize)> {
        self.calls.lock().clone()
    }
}

impl Persist for RecordingPersist {
    fn persist(&mut self, region: &dyn Region, offset: usize, len: usize) -> RegionResult<()> {
        region.check_range(offset, len)?;
        let mut durable = self.durable.lock();
        if durable.len() < region.len() {
            durable.resize(region.len(), 0);
        }
        durable[offset..offset + len].copy_from_slice(&region.bytes()[offset..offset + len]);
        self.calls.lock().push((offset, len));
        Ok(())
    }
}

/// A persist implementation that fails on a chosen call.
///
/// Calls before the failure point are forwarded to the inner implementation.
/// The failing call returns [`RegionError::PersistFailed`] with the
/// configured status. With [`FailingPersist::sticky`] every later call
/// fails too, modelling a device that went away.
#[derive(Debug, Clone)]
pub struct FailingPersist<P = VolatilePersist> {
    inner: P,
    fail_at: usize,
    status: i32,
    sticky: bool,
    calls: usize,
}

impl<P: Persist> FailingPersist<P> {
    /// Fails the `fail_at`-th call (zero based) with `status`.
    pub fn new(inner: P, fail_at: usize, status: i32) -> Self {
        Self {
            inner,
            fail_at,
            status,
            sticky: false,
            calls: 0,
        }
    }

    /// Makes every call from the failure point on fail.
    #[must_use]
    pub fn sticky(mut self) -> Self {
        self.sticky = true;
        self
    }

    /// Number of calls seen so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Returns the wrapped implementation.
    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: Persist> Persist for FailingPersist<P> {
    fn persist(&mut self, region: &dyn Region, offset: usize, len: usize) -> RegionResult<()> {
        let call = self.calls;
        self.calls += 1;
        if call == self.fail_at || (self.sticky && call > self.fail_at) {
            return Err(RegionError::persist_failed(offset, len, self.status));
        }
        self.inner.persist(region, offset, len)
    }
}

/// Recovers a primitive log from a durable image.
pub fn crash_image(image: Vec<u8>) -> CoreResult<PrimitiveLog<InMemoryRegion>> {
    PrimitiveLog::init(InMemoryRegion::with_data(image))
}

/// Recovers a synchronous log from a durable image, recording further
/// persists against that same image.
pub fn crash_sync_log(
    image: Vec<u8>,
) -> CoreResult<SyncPersistentLog<InMemoryRegion, RecordingPersist>> {
    let persist = RecordingPersist::with_image(image.clone());
    SyncPersistentLog::new(InMemoryRegion::with_data(image), persist)
}

/// Reopens a naming table from a durable image.
pub fn crash_table(image: Vec<u8>) -> CoreResult<NamingTable<InMemoryRegion>> {
    NamingTable::open(InMemoryRegion::with_data(image))
}
