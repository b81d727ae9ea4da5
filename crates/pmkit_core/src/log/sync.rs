//! The synchronous persistent log.

use crate::error::{CoreError, CoreResult};
use crate::log::entry::{EntryHeader, LogEntry, HEADER_SIZE};
use crate::log::primitive::PrimitiveLog;
use pmkit_region::{Persist, Region};
use std::marker::PhantomData;
use tracing::{debug, warn};

/// Fixed-size metadata stored in front of every record payload.
///
/// Typically this carries the home address of the logged data so the batch
/// can be replayed after a crash.
pub trait Metadata: Sized {
    /// Encoded size in bytes. Every record spends exactly this much on its
    /// metadata.
    const SIZE: usize;

    /// Encodes into `out`, which is exactly [`Metadata::SIZE`] bytes long.
    fn encode_into(&self, out: &mut [u8]);

    /// Decodes from `bytes`, which is exactly [`Metadata::SIZE`] bytes long.
    fn decode(bytes: &[u8]) -> Self;

    /// Length of the payload stored after this metadata.
    ///
    /// Used by [`SyncPersistentLog::records`] to find the next record.
    /// Metadata-only records keep the default of zero.
    fn payload_len(&self) -> usize {
        0
    }
}

impl Metadata for u64 {
    const SIZE: usize = 8;

    fn encode_into(&self, out: &mut [u8]) {
        out.copy_from_slice(&self.to_le_bytes());
    }

    fn decode(bytes: &[u8]) -> Self {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        u64::from_le_bytes(raw)
    }
}

/// Metadata describing one logged extent: where the data lives at home and
/// how many payload bytes follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordMeta {
    /// Home address of the logged data.
    pub home: u64,
    /// Payload length in bytes.
    pub len: u64,
}

impl Metadata for RecordMeta {
    const SIZE: usize = 16;

    fn encode_into(&self, out: &mut [u8]) {
        out[..8].copy_from_slice(&self.home.to_le_bytes());
        out[8..].copy_from_slice(&self.len.to_le_bytes());
    }

    fn decode(bytes: &[u8]) -> Self {
        Self {
            home: u64::decode(&bytes[..8]),
            len: u64::decode(&bytes[8..]),
        }
    }

    fn payload_len(&self) -> usize {
        usize::try_from(self.len).unwrap_or(usize::MAX)
    }
}

/// State of the pending batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    /// Nothing appended since the last commit.
    Empty,
    /// One growing entry holds every record appended since the last commit.
    Open {
        /// The batch entry.
        entry: LogEntry,
        /// Payload bytes in the batch.
        size: usize,
    },
}

/// A log that groups records into one entry and commits it durably.
///
/// Records appended between two commits are written into a single growing
/// log entry. [`SyncPersistentLog::commit`] persists that entry with the
/// two-phase order (payload and trailing sentinel, then header), retires it
/// and rewinds the log. After a crash either the whole batch is visible to
/// recovery or none of it is.
///
/// The region can be a slice of the mapped file or a DRAM staging buffer
/// whose [`Persist`] implementation ships bytes elsewhere.
///
/// # Concurrency
///
/// Single writer only. There is no internal locking; callers sharing an
/// instance across threads must synchronize externally.
///
/// # Example
///
/// ```rust
/// use pmkit_core::{RecordMeta, SyncPersistentLog};
/// use pmkit_region::{InMemoryRegion, VolatilePersist};
///
/// let mut log = SyncPersistentLog::new(InMemoryRegion::new(1000), VolatilePersist).unwrap();
/// log.append(&RecordMeta { home: 0x1000, len: 3 }, Some(&b"abc"[..])).unwrap();
/// log.append(&RecordMeta { home: 0x2000, len: 0 }, None).unwrap();
/// assert_eq!(log.records::<RecordMeta>().count(), 2);
///
/// log.commit().unwrap();
/// assert!(log.is_empty());
/// ```
#[derive(Debug)]
pub struct SyncPersistentLog<R: Region, P: Persist> {
    log: PrimitiveLog<R>,
    persist: P,
}

impl<R: Region, P: Persist> SyncPersistentLog<R, P> {
    /// Creates the log over a zeroed region or recovers it from a used one.
    ///
    /// A recovered region may hold one batch that was persisted but not yet
    /// retired; it becomes the open batch and can be committed again.
    ///
    /// # Errors
    ///
    /// Returns `LogCorruption` if the region is not a log (for example, not
    /// zeroed), or `InvalidState` if it holds more than one live entry.
    pub fn new(region: R, persist: P) -> CoreResult<Self> {
        let log = PrimitiveLog::init(region)?;
        if log.entries().nth(1).is_some() {
            return Err(CoreError::invalid_state(
                "region holds more than one uncommitted batch",
            ));
        }
        if !log.is_empty() {
            debug!(
                entry = log.head().offset(),
                size = log.header(log.head()).skip(),
                "recovered uncommitted batch"
            );
        }
        Ok(Self { log, persist })
    }

    /// Appends one record: `meta` followed by the optional `data` payload.
    ///
    /// The first record after a commit starts a new entry; the entry's
    /// sentinel position is persisted before any data goes in. Later records
    /// extend that entry. Nothing else is persisted until [`commit`].
    ///
    /// The whole record is reserved at once, so a failed append leaves no
    /// partial record behind.
    ///
    /// # Errors
    ///
    /// - `NoSpace` if the record does not fit; commit and retry
    /// - `InvalidArgument` if the record would be empty
    /// - Any error from the sentinel persist, unchanged
    ///
    /// [`commit`]: SyncPersistentLog::commit
    pub fn append<M: Metadata>(&mut self, meta: &M, data: Option<&[u8]>) -> CoreResult<()> {
        let data = data.unwrap_or_default();
        let needed = M::SIZE + data.len();
        if needed == 0 {
            return Err(CoreError::invalid_argument("record has neither metadata nor data"));
        }

        let head = self.log.head();
        if self.log.is_empty() {
            self.persist
                .persist(self.log.region(), head.offset(), HEADER_SIZE)?;
            self.log.append(needed)?;
        } else {
            self.log.extend(head, needed)?;
        }

        let payload = self.log.payload_mut(head);
        let start = payload.len() - needed;
        let (meta_bytes, data_bytes) = payload[start..].split_at_mut(M::SIZE);
        meta.encode_into(meta_bytes);
        data_bytes.copy_from_slice(data);
        Ok(())
    }

    /// Bytes of the log region occupied so far, headers and sentinel
    /// included.
    pub fn occupation(&self) -> usize {
        self.log.end().offset() + HEADER_SIZE
    }

    /// Persists the open batch and resets the log for the next one.
    ///
    /// The payload and its trailing sentinel are persisted first, then the
    /// entry header. If either persist fails the error is returned unchanged
    /// and the log is not modified, so the same commit can be retried.
    ///
    /// # Errors
    ///
    /// - `InvalidState` if there is no open batch
    /// - Any error from the persist dependency, unchanged
    pub fn commit(&mut self) -> CoreResult<()> {
        let BatchState::Open { entry, size } = self.state() else {
            return Err(CoreError::invalid_state("no open batch to commit"));
        };

        let region: &dyn Region = self.log.region();
        if let Err(err) = self
            .persist
            .persist(region, entry.payload_offset(), size + HEADER_SIZE)
            .and_then(|()| self.persist.persist(region, entry.offset(), HEADER_SIZE))
        {
            warn!(entry = entry.offset(), size, error = %err, "batch commit failed");
            return Err(err.into());
        }

        self.log.truncate();
        let reset = self.log.rewind(None);
        debug_assert!(reset.is_ok(), "rewind after retiring the only batch");
        reset?;

        debug!(entry = entry.offset(), size, "committed batch");
        Ok(())
    }

    /// Returns the batch state.
    pub fn state(&self) -> BatchState {
        let entry = self.log.head();
        match self.log.header(entry) {
            EntryHeader::Valid(size) if !self.log.is_empty() => BatchState::Open { entry, size },
            _ => BatchState::Empty,
        }
    }

    /// Whether there is no open batch.
    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Raw payload bytes of the open batch, empty if there is none.
    pub fn batch(&self) -> &[u8] {
        match self.state() {
            BatchState::Open { entry, .. } => self.log.payload(entry),
            BatchState::Empty => &[],
        }
    }

    /// Decodes the records of the open batch in insertion order.
    ///
    /// Record boundaries come from [`Metadata::payload_len`], so `M` must be
    /// the type the records were appended with.
    pub fn records<M: Metadata>(&self) -> Records<'_, M> {
        Records {
            bytes: self.batch(),
            cursor: 0,
            _meta: PhantomData,
        }
    }

    /// The batch entry, or the end sentinel when empty.
    pub fn head(&self) -> LogEntry {
        self.log.head()
    }

    /// The end sentinel.
    pub fn end(&self) -> LogEntry {
        self.log.end()
    }

    /// Returns the underlying primitive log.
    pub fn log(&self) -> &PrimitiveLog<R> {
        &self.log
    }

    /// Returns the persist dependency.
    pub fn persist(&self) -> &P {
        &self.persist
    }

    /// Consumes the log and returns its region and persist dependency.
    pub fn into_parts(self) -> (R, P) {
        (self.log.into_region(), self.persist)
    }
}

/// Iterator over the `(metadata, payload)` records of an open batch.
///
/// Created by [`SyncPersistentLog::records`].
#[derive(Debug)]
pub struct Records<'a, M> {
    bytes: &'a [u8],
    cursor: usize,
    _meta: PhantomData<M>,
}

impl<'a, M: Metadata> Iterator for Records<'a, M> {
    type Item = (M, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let rest = &self.bytes[self.cursor..];
        if rest.len() < M::SIZE {
            return None;
        }
        let meta = M::decode(&rest[..M::SIZE]);
        let len = meta.payload_len();
        // A record that spans no bytes would never move the cursor.
        if M::SIZE + len == 0 {
            return None;
        }
        let payload = rest.get(M::SIZE..M::SIZE.checked_add(len)?)?;
        self.cursor += M::SIZE + len;
        Some((meta, payload))
    }
}
