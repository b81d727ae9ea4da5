//! Naming service: string ids mapped to region offsets.
//!
//! The table lives at the start of its region and everything it needs,
//! seed records included, is allocated inside that region:
//!
//! ```text
//! 0                      128        136    144            144+256
//! ┌──────────────────────┬──────────┬──────┬──────────────┬──────────────┬─
//! │ 16 bucket heads (u64)│ free head│ bump │ seed slot 0  │ seed slot 1  │ …
//! └──────────────────────┴──────────┴──────┴──────────────┴──────────────┴─
//!
//! seed slot (256 bytes):
//! ┌──────────────────────────────┬──────────────┬───────────┐
//! │ id, NUL padded (240 bytes)   │ address (u64)│ next (u64)│
//! └──────────────────────────────┴──────────────┴───────────┘
//! ```
//!
//! Links are byte offsets from the table start; `0` is the null link. A
//! bump value of `0` means no slot was ever handed out, so a zeroed region
//! is an empty table. Deregistered slots go onto the free list, threaded
//! through their `next` field.
//!
//! A new seed is fully written before its bucket head is updated, so the
//! bucket chains only ever link complete seeds.

mod hash;
mod layout;
mod table;

pub use hash::{seed_hash, HASH_SEED};
pub use layout::{SEED_MAX_LEN, SEED_SIZE, TABLE_BYTES, TABLE_SIZE};
pub use table::{NamingTable, Seeds};

pub(crate) use table::lookup;
