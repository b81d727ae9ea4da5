//! The allocation-free primitive log.

use crate::error::{CoreError, CoreResult};
use crate::log::entry::{EntryHeader, LogEntry, HEADER_SIZE, MAX_ENTRY_SIZE};
use crate::log::iterator::{Entries, Scan};
use pmkit_region::Region;
use tracing::debug;

/// An append-only log laid directly over a region.
///
/// The log never allocates: every byte it manages belongs to the region it
/// was given. Records are appended at `end`, retired at `head`, and the log
/// can be rewound to the region start once it is empty (or holds a single
/// entry that should be kept).
///
/// The log does not persist anything itself. Callers that need durability
/// follow the atomic persistence rule described in the module docs, or use
/// [`crate::SyncPersistentLog`] which does it for them.
///
/// # Invariants
///
/// - `head <= end`; `head == end` means the log is empty
/// - A forward scan from the region start reaches `head` by skipping only
///   retired entries and then `end` by skipping live entries
/// - The end sentinel always fits: `end + HEADER_SIZE <= region.len()`
#[derive(Debug)]
pub struct PrimitiveLog<R: Region> {
    region: R,
    head: usize,
    end: usize,
}

impl<R: Region> PrimitiveLog<R> {
    /// Initializes a log on a zeroed region or restores one from a previously
    /// used region.
    ///
    /// A zeroed region reads as a single end sentinel, i.e. an empty log.
    ///
    /// # Errors
    ///
    /// Returns `LogCorruption` if the region is smaller than a header or the
    /// recovery scan runs past the region without finding the end sentinel.
    pub fn init(region: R) -> CoreResult<Self> {
        let bytes = region.bytes();
        if bytes.len() < HEADER_SIZE {
            return Err(CoreError::log_corruption(
                0,
                format!("region of {} bytes cannot hold a header", bytes.len()),
            ));
        }

        let mut head = 0;
        let mut retired = 0usize;
        while let EntryHeader::Invalidated(skip) = read_header(bytes, head)? {
            head = next_header(bytes, head, skip)?;
            retired += 1;
        }

        let mut end = head;
        let mut live = 0usize;
        loop {
            match read_header(bytes, end)? {
                EntryHeader::End => break,
                header => {
                    end = next_header(bytes, end, header.skip())?;
                    live += 1;
                }
            }
        }

        debug!(head, end, retired, live, "recovered primitive log");
        Ok(Self { region, head, end })
    }

    /// Returns the underlying region.
    pub fn region(&self) -> &R {
        &self.region
    }

    /// Consumes the log and returns its region.
    pub fn into_region(self) -> R {
        self.region
    }

    /// Size of the log region in bytes.
    pub fn capacity(&self) -> usize {
        self.region.len()
    }

    /// The oldest live entry, or the end sentinel if the log is empty.
    pub fn head(&self) -> LogEntry {
        LogEntry::at(self.head)
    }

    /// The end sentinel. It never carries a payload.
    pub fn end(&self) -> LogEntry {
        LogEntry::at(self.end)
    }

    /// Whether the log holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.head == self.end
    }

    /// Bytes left after the end sentinel.
    ///
    /// An append of `n` bytes succeeds iff `n + HEADER_SIZE <= available()`.
    pub fn available(&self) -> usize {
        self.region.len() - self.end - HEADER_SIZE
    }

    /// Decodes the header of `entry`.
    ///
    /// A handle that does not point inside the region reads as the end
    /// sentinel.
    pub fn header(&self, entry: LogEntry) -> EntryHeader {
        EntryHeader::read(self.region.bytes(), entry.offset()).unwrap_or(EntryHeader::End)
    }

    /// Returns the payload of `entry`.
    ///
    /// Retired entries still expose their stale bytes. The end sentinel and
    /// out-of-range handles have an empty payload.
    pub fn payload(&self, entry: LogEntry) -> &[u8] {
        let len = self.header(entry).skip();
        let start = entry.payload_offset();
        self.region
            .bytes()
            .get(start..start.saturating_add(len))
            .unwrap_or_default()
    }

    /// Returns the payload of `entry` for writing.
    pub fn payload_mut(&mut self, entry: LogEntry) -> &mut [u8] {
        let len = self.header(entry).skip();
        let start = entry.payload_offset();
        self.region
            .bytes_mut()
            .get_mut(start..start.saturating_add(len))
            .unwrap_or_default()
    }

    /// Reserves space for a `size`-byte record at the end of the log.
    ///
    /// Only the headers are written: the returned entry's header now reads
    /// `size` and a fresh end sentinel follows the payload. The payload bytes
    /// are left as they were; the caller fills them through
    /// [`PrimitiveLog::payload_mut`]. To persist the record, flush
    /// `size + HEADER_SIZE` bytes from the payload start and then the header.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if `size` is zero or exceeds [`MAX_ENTRY_SIZE`]
    /// - `NoSpace` if the record and a new sentinel do not fit; the log is
    ///   left unchanged
    pub fn append(&mut self, size: usize) -> CoreResult<LogEntry> {
        if size == 0 || size > MAX_ENTRY_SIZE {
            return Err(CoreError::invalid_argument(format!(
                "append size {size} must be in 1..={MAX_ENTRY_SIZE}"
            )));
        }
        let available = self.available();
        if size + HEADER_SIZE > available {
            return Err(CoreError::no_space(size + HEADER_SIZE, available));
        }

        let entry = self.end;
        let new_end = entry + HEADER_SIZE + size;
        let bytes = self.region.bytes_mut();
        EntryHeader::End.write(bytes, new_end);
        EntryHeader::Valid(size).write(bytes, entry);
        self.end = new_end;
        Ok(LogEntry::at(entry))
    }

    /// Grows the last entry of the log by `addition` bytes.
    ///
    /// Returns the entry's new payload size. The added bytes are the last
    /// `addition` bytes of the payload.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if `last` is not the live entry right before the
    ///   end sentinel, or the grown size exceeds [`MAX_ENTRY_SIZE`]
    /// - `NoSpace` if the region would overflow; the log is left unchanged
    pub fn extend(&mut self, last: LogEntry, addition: usize) -> CoreResult<usize> {
        let size = match self.header(last) {
            EntryHeader::Valid(size)
                if last.offset() >= self.head && last.payload_offset() + size == self.end =>
            {
                size
            }
            _ => {
                return Err(CoreError::invalid_argument(format!(
                    "entry at {} is not the tail of the log (end at {})",
                    last.offset(),
                    self.end
                )))
            }
        };
        if addition == 0 {
            return Ok(size);
        }
        let new_size = size
            .checked_add(addition)
            .filter(|&n| n <= MAX_ENTRY_SIZE)
            .ok_or_else(|| {
                CoreError::invalid_argument(format!(
                    "extending {size} bytes by {addition} exceeds {MAX_ENTRY_SIZE}"
                ))
            })?;
        let available = self.available();
        if addition > available {
            return Err(CoreError::no_space(addition, available));
        }

        let new_end = self.end + addition;
        let bytes = self.region.bytes_mut();
        EntryHeader::End.write(bytes, new_end);
        EntryHeader::Valid(new_size).write(bytes, last.offset());
        self.end = new_end;
        Ok(new_size)
    }

    /// Retires the head entry.
    ///
    /// The header is negated in place, which keeps the skip distance for
    /// recovery, and `head` moves to the next entry. Returns the retired
    /// entry, or `None` if the log is empty.
    pub fn truncate(&mut self) -> Option<LogEntry> {
        if self.is_empty() {
            return None;
        }
        let entry = self.head;
        let size = self.header(LogEntry::at(entry)).skip();
        EntryHeader::Invalidated(size).write(self.region.bytes_mut(), entry);
        self.head = entry + HEADER_SIZE + size;
        Some(LogEntry::at(entry))
    }

    /// Resets the log so it starts again at the region start.
    ///
    /// With `last == None` the log must already be empty; both pointers move
    /// to the region start, where a new end sentinel is written.
    ///
    /// With `last == Some(entry)` the entry must be the only live entry. Its
    /// header and payload are relocated to the region start, reclaiming the
    /// space of the retired entries before it. An entry that already starts
    /// the region is returned unchanged.
    ///
    /// Returns the new head entry. When persisting, treat a relocated entry
    /// like a fresh append.
    ///
    /// # Errors
    ///
    /// - `InvalidState` if the preconditions above do not hold
    /// - `NoSpace` if the relocated entry would overlap its old header, in
    ///   which case the caller has to split the operation; the log is left
    ///   unchanged
    pub fn rewind(&mut self, last: Option<LogEntry>) -> CoreResult<LogEntry> {
        let Some(last) = last else {
            if !self.is_empty() {
                return Err(CoreError::invalid_state(format!(
                    "cannot rewind a log with live entries (head {}, end {})",
                    self.head, self.end
                )));
            }
            self.head = 0;
            self.end = 0;
            EntryHeader::End.write(self.region.bytes_mut(), 0);
            return Ok(LogEntry::at(0));
        };

        let size = match self.header(last) {
            EntryHeader::Valid(size)
                if last.offset() == self.head && last.payload_offset() + size == self.end =>
            {
                size
            }
            _ => {
                return Err(CoreError::invalid_state(format!(
                    "entry at {} is not the only live entry (head {}, end {})",
                    last.offset(),
                    self.head,
                    self.end
                )))
            }
        };
        if last.offset() == 0 {
            return Ok(last);
        }
        if HEADER_SIZE + size > last.offset() {
            return Err(CoreError::no_space(HEADER_SIZE + size, last.offset()));
        }

        let bytes = self.region.bytes_mut();
        let from = last.payload_offset();
        bytes.copy_within(from..from + size, HEADER_SIZE);
        EntryHeader::End.write(bytes, HEADER_SIZE + size);
        EntryHeader::Valid(size).write(bytes, 0);
        self.head = 0;
        self.end = HEADER_SIZE + size;
        Ok(LogEntry::at(0))
    }

    /// Iterates over the live entries from head to end.
    pub fn entries(&self) -> Entries<'_> {
        Entries::new(self.region.bytes(), self.head, self.end)
    }

    /// Iterates over every header from the region start, retired entries
    /// included, ending with the end sentinel.
    pub fn scan(&self) -> Scan<'_> {
        Scan::new(self.region.bytes())
    }
}

fn read_header(bytes: &[u8], offset: usize) -> CoreResult<EntryHeader> {
    EntryHeader::read(bytes, offset).ok_or_else(|| {
        CoreError::log_corruption(
            offset,
            format!("header overruns region of {} bytes", bytes.len()),
        )
    })
}

fn next_header(bytes: &[u8], offset: usize, skip: usize) -> CoreResult<usize> {
    offset
        .checked_add(HEADER_SIZE + skip)
        .filter(|&next| next < bytes.len())
        .ok_or_else(|| {
            CoreError::log_corruption(
                offset,
                format!("entry of {skip} bytes runs past region of {} bytes", bytes.len()),
            )
        })
}
