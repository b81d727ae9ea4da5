//! Iterators over log headers.

use crate::log::entry::{EntryHeader, LogEntry, HEADER_SIZE};

/// Iterator over the live entries of a log, from head to end.
///
/// Created by [`crate::PrimitiveLog::entries`].
#[derive(Debug, Clone)]
pub struct Entries<'a> {
    bytes: &'a [u8],
    cursor: usize,
    end: usize,
}

impl<'a> Entries<'a> {
    pub(crate) fn new(bytes: &'a [u8], head: usize, end: usize) -> Self {
        Self {
            bytes,
            cursor: head,
            end,
        }
    }
}

impl Iterator for Entries<'_> {
    type Item = LogEntry;

    fn next(&mut self) -> Option<Self::Item> {
        while self.cursor < self.end {
            let entry = LogEntry::at(self.cursor);
            let header = EntryHeader::read(self.bytes, self.cursor)?;
            self.cursor += HEADER_SIZE + header.skip();
            if let EntryHeader::Valid(_) = header {
                return Some(entry);
            }
        }
        None
    }
}

/// Iterator over every header from the region start.
///
/// Yields retired entries as well as live ones and stops after the end
/// sentinel. This is the recovery walk, exposed for tooling: a scan that
/// stops early (without yielding [`EntryHeader::End`]) means the region is
/// not a well-formed log.
///
/// Created by [`crate::PrimitiveLog::scan`].
#[derive(Debug, Clone)]
pub struct Scan<'a> {
    bytes: &'a [u8],
    cursor: Option<usize>,
}

impl<'a> Scan<'a> {
    /// Starts a scan over raw log bytes.
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            cursor: Some(0),
        }
    }
}

impl Iterator for Scan<'_> {
    type Item = (LogEntry, EntryHeader);

    fn next(&mut self) -> Option<Self::Item> {
        let offset = self.cursor?;
        let Some(header) = EntryHeader::read(self.bytes, offset) else {
            self.cursor = None;
            return None;
        };
        self.cursor = match header {
            EntryHeader::End => None,
            _ => offset.checked_add(HEADER_SIZE + header.skip()),
        };
        Some((LogEntry::at(offset), header))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_log(headers: &[(usize, i32)], len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        for &(offset, raw) in headers {
            bytes[offset..offset + HEADER_SIZE].copy_from_slice(&raw.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn scan_empty_log() {
        let bytes = vec![0u8; 16];
        let items: Vec<_> = Scan::new(&bytes).collect();
        assert_eq!(items, vec![(LogEntry::at(0), EntryHeader::End)]);
    }

    #[test]
    fn scan_skips_by_absolute_size() {
        let bytes = raw_log(&[(0, -4), (8, 2)], 32);
        let items: Vec<_> = Scan::new(&bytes).map(|(e, h)| (e.offset(), h)).collect();
        assert_eq!(
            items,
            vec![
                (0, EntryHeader::Invalidated(4)),
                (8, EntryHeader::Valid(2)),
                (14, EntryHeader::End),
            ]
        );
    }

    #[test]
    fn scan_stops_when_header_overruns() {
        let bytes = raw_log(&[(0, 10)], 16);
        let items: Vec<_> = Scan::new(&bytes).collect();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].1, EntryHeader::Valid(10));
    }

    #[test]
    fn entries_skip_retired_records() {
        let bytes = raw_log(&[(0, -4), (8, 2), (14, 3)], 32);
        let offsets: Vec<_> = Entries::new(&bytes, 0, 21).map(LogEntry::offset).collect();
        assert_eq!(offsets, vec![8, 14]);
    }
}
