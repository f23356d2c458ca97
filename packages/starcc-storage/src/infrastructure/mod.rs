//! Infrastructure layer - Storage adapters
//!
//! - `fs`: local filesystem (tokio::fs)
//! - `memory`: in-process map, for tests and small runs

#[cfg(feature = "fs")]
pub mod fs;
pub mod memory;

#[cfg(feature = "fs")]
pub use fs::FsRecordStore;
pub use memory::MemoryRecordStore;
