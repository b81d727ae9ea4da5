//! Property-based test generators using proptest.
//!
//! Provides strategies for log operation sequences, batch records and
//! naming operations.

use pmkit_core::{PmAddr, RecordMeta, SEED_MAX_LEN};
use proptest::prelude::*;

/// One operation against a [`pmkit_core::PrimitiveLog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOp {
    /// Append an entry with this payload size.
    Append(usize),
    /// Extend the tail entry by this many bytes.
    Extend(usize),
    /// Try to extend a live entry that is not the tail.
    ExtendNonTail(usize),
    /// Retire the head entry.
    Truncate,
    /// Rewind the log; only legal once it is empty.
    Rewind,
}

/// Strategy for generating log operations, weighted towards appends.
pub fn log_op_strategy(max_payload: usize) -> impl Strategy<Value = LogOp> {
    prop_oneof![
        4 => (1..=max_payload).prop_map(LogOp::Append),
        2 => (0..=max_payload).prop_map(LogOp::Extend),
        1 => (1..=max_payload).prop_map(LogOp::ExtendNonTail),
        3 => Just(LogOp::Truncate),
        1 => Just(LogOp::Rewind),
    ]
}

/// Strategy for generating sequences of log operations.
pub fn log_ops_strategy(max_payload: usize, max_len: usize) -> impl Strategy<Value = Vec<LogOp>> {
    prop::collection::vec(log_op_strategy(max_payload), 1..max_len)
}

/// Strategy for generating payload sizes that fit a fresh log of
/// `region_len` bytes.
pub fn entry_sizes_strategy(region_len: usize) -> impl Strategy<Value = Vec<usize>> {
    let max = (region_len / 8).max(1);
    prop::collection::vec(1..=max, 1..16)
}

/// Strategy for generating one batch record and its payload.
pub fn record_strategy(max_payload: usize) -> impl Strategy<Value = (RecordMeta, Vec<u8>)> {
    (any::<u64>(), prop::collection::vec(any::<u8>(), 0..=max_payload)).prop_map(
        |(home, data)| {
            let meta = RecordMeta {
                home,
                len: data.len() as u64,
            };
            (meta, data)
        },
    )
}

/// Strategy for generating valid seed ids.
pub fn seed_id_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9_./-]{1,64}").expect("Invalid regex")
}

/// Strategy for generating ids too long to be registered.
pub fn long_seed_id_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex(&format!("[a-z]{{{SEED_MAX_LEN},{}}}", SEED_MAX_LEN + 32))
        .expect("Invalid regex")
}

/// Strategy for generating stored addresses.
pub fn addr_strategy() -> impl Strategy<Value = PmAddr> {
    any::<u64>().prop_map(PmAddr::new)
}

/// One operation against a naming table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameOp {
    /// Register an id at an address.
    Register(String, PmAddr),
    /// Deregister an id.
    Deregister(String),
}

/// Strategy for generating naming operations over a small id pool, so
/// updates and removals hit existing ids.
pub fn name_ops_strategy(max_len: usize) -> impl Strategy<Value = Vec<NameOp>> {
    let id = (0..24u32).prop_map(|i| format!("seed-{i}"));
    let op = prop_oneof![
        3 => (id.clone(), addr_strategy()).prop_map(|(id, addr)| NameOp::Register(id, addr)),
        1 => id.prop_map(NameOp::Deregister),
    ];
    prop::collection::vec(op, 1..max_len)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
