//! # pmkit Core
//!
//! Crash-consistent primitives over a persistent region.
//!
//! This crate provides:
//! - [`PrimitiveLog`] - an allocation-free append/truncate/rewind log whose
//!   record headers are self-describing, so recovery is a forward scan
//! - [`SyncPersistentLog`] - batches `(metadata, payload)` records into one
//!   growing entry and commits it with the two-phase flush order
//! - [`NamingTable`] - a chained hash table mapping string ids to region
//!   offsets, with its seed records allocated inside the region
//! - [`PmStore`] - an explicit handle tying a mapped file, its naming table
//!   and its log area together
//!
//! ## Example
//!
//! ```rust
//! use pmkit_core::{PrimitiveLog, EntryHeader};
//! use pmkit_region::InMemoryRegion;
//!
//! let mut log = PrimitiveLog::init(InMemoryRegion::new(1000)).unwrap();
//! let entry = log.append(100).unwrap();
//! log.payload_mut(entry).fill(7);
//!
//! let retired = log.truncate().unwrap();
//! assert_eq!(log.header(retired), EntryHeader::Invalidated(100));
//! assert!(log.is_empty());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod log;
mod naming;
mod store;
mod types;

pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use log::{
    BatchState, Entries, EntryHeader, LogEntry, Metadata, PrimitiveLog, RecordMeta, Records,
    Scan, SyncPersistentLog, HEADER_SIZE, MAX_ENTRY_SIZE,
};
pub use naming::{
    seed_hash, NamingTable, Seeds, HASH_SEED, SEED_MAX_LEN, SEED_SIZE, TABLE_BYTES, TABLE_SIZE,
};
pub use store::PmStore;
pub use types::PmAddr;

/// Current version of pmkit.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
