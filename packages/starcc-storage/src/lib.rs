//! RecordStore - storage collaborator for the star-contraction pipeline
//!
//! > "write once, read by the next round, delete when consumed."
//!
//! ## Core Principles
//!
//! 1. **Record sets**: a directory of `part-NNNNN` files, one per reduce partition
//! 2. **Write-once**: part files are created, never rewritten in place
//! 3. **Path addressing**: every record set lives at a `/`-separated `RecordPath`
//!
//! ## Wire formats
//!
//! - Edge: `i32 node | i32 neighbor` (big-endian, 8 bytes)
//! - Cluster: `i32 count | count x i32 node` (ascending)
//! - Text line: UTF-8, newline terminated (raw input only)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use starcc_storage::{EdgeRecord, MemoryRecordStore, RecordPath, RecordStore};
//!
//! let store = MemoryRecordStore::new();
//! let dir = RecordPath::new("graph_0");
//! write_record_set(&store, &dir, vec![vec![EdgeRecord::new(2, 1)]]).await?;
//! let parts: Vec<Vec<EdgeRecord>> = read_record_set(&store, &dir).await?;
//! ```

pub mod codec;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use codec::{ClusterRecord, EdgeRecord, NodeId, RecordCodec, TextLine, NO_NEIGHBOR};
pub use domain::{
    data_files, is_data_file, part_name, read_record_set, write_record_set, RecordPath,
    RecordStore,
};
pub use error::{ErrorKind, Result, StorageError};

#[cfg(feature = "fs")]
pub use infrastructure::FsRecordStore;
pub use infrastructure::MemoryRecordStore;
