//! Adapters for the domain ports.

pub mod file_handoff;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
