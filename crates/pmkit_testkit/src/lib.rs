//! # pmkit Testkit
//!
//! Test utilities for pmkit.
//!
//! This crate provides:
//! - Store and log fixtures backed by temporary files or DRAM
//! - Crash simulation through `persist` implementations that track what
//!   actually became durable
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use pmkit_core::RecordMeta;
//! use pmkit_testkit::prelude::*;
//!
//! let persist = RecordingPersist::new(1000);
//! let mut log = staging_log(1000, persist.clone());
//! log.append(&RecordMeta { home: 8, len: 0 }, None).unwrap();
//!
//! // Nothing but the sentinel was persisted, so a crash loses the record.
//! let recovered = crash_image(persist.image()).unwrap();
//! assert!(recovered.is_empty());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod crash;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::crash::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use crash::*;
pub use fixtures::*;
pub use generators::*;
