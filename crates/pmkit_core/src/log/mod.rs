//! Append-only logs over a persistent region.
//!
//! ## Region Format
//!
//! A log region is a flat sequence of `(header, payload)` pairs:
//!
//! ```text
//! ┌──────────┬─────────────┬──────────┬─────────┬──────────┬──────
//! │ size: -8 │ 8 bytes     │ size: 12 │ 12 bytes│ size: 0  │ free
//! │ (retired)│ (stale)     │ (live)   │         │ (end)    │
//! └──────────┴─────────────┴──────────┴─────────┴──────────┴──────
//!   ▲                        ▲                    ▲
//!   region start             head                 end
//! ```
//!
//! Each header is a 4-byte signed little-endian integer:
//! - `size > 0`: a live record with `size` payload bytes
//! - `size == 0`: the end sentinel
//! - `size < 0`: a retired record; `|size|` still gives the skip distance
//!
//! The bytes are the whole durable state. Recovery scans from the region
//! start, skips retired records to find `head`, then skips live records to
//! find `end`.
//!
//! ## Atomic Persistence Rule
//!
//! To make an entry durable, persist `payload + trailing sentinel` first and
//! the entry's own header second. A crash in between leaves the old header in
//! place, so recovery never follows a header into bytes that are not durable.

mod entry;
mod iterator;
mod primitive;
mod sync;

pub use entry::{EntryHeader, LogEntry, HEADER_SIZE, MAX_ENTRY_SIZE};
pub use iterator::{Entries, Scan};
pub use primitive::PrimitiveLog;
pub use sync::{BatchState, Metadata, RecordMeta, Records, SyncPersistentLog};
