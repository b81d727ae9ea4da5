//! Log entry headers.

/// Size of a log entry header in bytes.
pub const HEADER_SIZE: usize = 4;

/// Largest payload a single entry can describe.
pub const MAX_ENTRY_SIZE: usize = i32::MAX as usize;

/// Decoded state of a log entry header.
///
/// On the region the three states share one signed integer; this type keeps
/// them apart in code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryHeader {
    /// A live record with this many payload bytes.
    Valid(usize),
    /// A retired record; the payload length is kept so scans can skip it.
    Invalidated(usize),
    /// The end sentinel.
    End,
}

impl EntryHeader {
    /// Decodes a raw header value.
    #[must_use]
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => Self::End,
            n if n > 0 => Self::Valid(n as usize),
            n => Self::Invalidated(n.unsigned_abs() as usize),
        }
    }

    /// Encodes the header as its raw signed value.
    ///
    /// Sizes are bounded by [`MAX_ENTRY_SIZE`] when entries are created.
    #[must_use]
    pub fn to_raw(self) -> i32 {
        match self {
            Self::Valid(n) => n as i32,
            Self::Invalidated(n) => (n as i32).wrapping_neg(),
            Self::End => 0,
        }
    }

    /// Number of payload bytes to skip to reach the next header.
    #[must_use]
    pub fn skip(self) -> usize {
        match self {
            Self::Valid(n) | Self::Invalidated(n) => n,
            Self::End => 0,
        }
    }

    /// Reads the header at `offset`, or `None` if it does not fit in `bytes`.
    #[must_use]
    pub fn read(bytes: &[u8], offset: usize) -> Option<Self> {
        let raw = bytes.get(offset..offset.checked_add(HEADER_SIZE)?)?;
        let raw = i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
        Some(Self::from_raw(raw))
    }

    /// Writes the header at `offset`. The caller guarantees it fits.
    pub(crate) fn write(self, bytes: &mut [u8], offset: usize) {
        bytes[offset..offset + HEADER_SIZE].copy_from_slice(&self.to_raw().to_le_bytes());
    }
}

/// Handle to an entry header inside a log region.
///
/// A handle is only an offset; the log resolves it on every access. Handles
/// returned by one log instance stay meaningful after recovery because
/// entries never move except through [`crate::PrimitiveLog::rewind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogEntry {
    offset: usize,
}

impl LogEntry {
    pub(crate) const fn at(offset: usize) -> Self {
        Self { offset }
    }

    /// Offset of the header from the log region start.
    #[must_use]
    pub const fn offset(self) -> usize {
        self.offset
    }

    /// Offset of the first payload byte from the log region start.
    #[must_use]
    pub const fn payload_offset(self) -> usize {
        self.offset + HEADER_SIZE
    }
}
