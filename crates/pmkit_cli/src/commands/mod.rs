//! CLI command implementations.

pub mod create;
pub mod dump_log;
pub mod inspect;
pub mod naming;
