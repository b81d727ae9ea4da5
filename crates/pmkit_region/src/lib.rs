//! # pmkit Region
//!
//! Persistent region backends for pmkit.
//!
//! A region is a fixed-size, byte-addressable span whose contents survive a
//! process restart once they have been made durable. This crate provides the
//! lowest layer of pmkit: it maps backing files, hands out byte views, and
//! implements the `persist` dependency the log layer consumes. Regions do not
//! interpret the bytes they hold.
//!
//! ## Design Principles
//!
//! - A region has a fixed length for its whole lifetime
//! - Stored addresses are offsets from the region base, never raw pointers
//! - Durability is explicit: bytes are only guaranteed recoverable after a
//!   successful [`Region::flush_range`] or [`Persist::persist`]
//! - Lifetimes are explicit handles; there is no process-wide mapped state
//!
//! ## Available Regions
//!
//! - [`InMemoryRegion`] - Zeroed DRAM buffer, for staging logs and tests
//! - [`MappedRegion`] - A file mapped with `mmap`, locked for a single owner
//! - [`SubRegion`] - A window over part of another region
//!
//! ## Example
//!
//! ```rust
//! use pmkit_region::{InMemoryRegion, Region};
//!
//! let mut region = InMemoryRegion::new(64);
//! region.bytes_mut()[..5].copy_from_slice(b"hello");
//! assert_eq!(&region.bytes()[..5], b"hello");
//! assert!(region.flush_range(0, 5).is_ok());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod mapped;
mod memory;
mod persist;
mod region;
mod sub;

pub use error::{RegionError, RegionResult};
pub use mapped::{MappedRegion, RegionSize, SENTINEL_WHOLE_FILE};
pub use memory::InMemoryRegion;
pub use persist::{FlushPersist, Persist, VolatilePersist};
pub use region::Region;
pub use sub::SubRegion;
