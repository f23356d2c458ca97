//! Domain layer for RecordStore
//!
//! # Domain Models
//!
//! - `RecordPath`: `/`-separated address of a file or record-set directory
//!
//! # Port Trait
//!
//! - `RecordStore`: primary storage abstraction (create, read, list,
//!   delete-subtree, rename)
//!
//! # Record sets
//!
//! A record set is a directory whose data files are named `part-NNNNN`.
//! Children starting with `_` or `.` (temporary job output, markers) are
//! not data and are skipped by readers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::codec::RecordCodec;
use crate::{Result, StorageError};

// ═══════════════════════════════════════════════════════════════════════════
// Domain Models
// ═══════════════════════════════════════════════════════════════════════════

/// Address of a file or directory in a `RecordStore`.
///
/// # Examples
///
/// ```rust
/// use starcc_storage::RecordPath;
///
/// let base = RecordPath::new("/data/graph");
/// assert_eq!(base.suffix("_3").as_str(), "/data/graph_3");
/// assert_eq!(base.join("part-00000").name(), "part-00000");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordPath(String);

impl RecordPath {
    pub fn new(path: impl Into<String>) -> Self {
        let mut path = path.into();
        while path.len() > 1 && path.ends_with('/') {
            path.pop();
        }
        Self(path)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Child path `self/name`.
    pub fn join(&self, name: &str) -> Self {
        if self.0.is_empty() {
            Self::new(name)
        } else if self.0.ends_with('/') {
            Self::new(format!("{}{}", self.0, name))
        } else {
            Self::new(format!("{}/{}", self.0, name))
        }
    }

    /// Appends `suffix` to the last path segment (`graph` -> `graph_1`).
    pub fn suffix(&self, suffix: &str) -> Self {
        Self::new(format!("{}{}", self.0, suffix))
    }

    /// Last path segment.
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    pub fn parent(&self) -> Option<RecordPath> {
        let idx = self.0.rfind('/')?;
        if idx == 0 {
            return Some(RecordPath::new("/"));
        }
        Some(RecordPath::new(&self.0[..idx]))
    }

    /// True if `other` is `self` or lies below it.
    pub fn contains(&self, other: &RecordPath) -> bool {
        other.0 == self.0
            || other
                .0
                .strip_prefix(self.0.as_str())
                .map_or(false, |rest| rest.starts_with('/') || self.0.ends_with('/'))
    }

    pub fn to_path_buf(&self) -> PathBuf {
        PathBuf::from(&self.0)
    }
}

impl fmt::Display for RecordPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordPath {
    fn from(path: &str) -> Self {
        RecordPath::new(path)
    }
}

impl From<PathBuf> for RecordPath {
    fn from(path: PathBuf) -> Self {
        RecordPath::new(path.to_string_lossy().into_owned())
    }
}

/// File name of reduce partition `index`.
pub fn part_name(index: usize) -> String {
    format!("part-{:05}", index)
}

/// True for children that hold records (not `_tmp-*`, `.crc`, ...).
pub fn is_data_file(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('_') && !name.starts_with('.')
}

// ═══════════════════════════════════════════════════════════════════════════
// Port Trait
// ═══════════════════════════════════════════════════════════════════════════

/// Storage abstraction consumed by the pipeline.
///
/// Implementations must make `rename` of a directory visible atomically to
/// readers that list its parent; the pipeline relies on that to publish job
/// output only on success.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// True if `path` is a file or a non-empty directory.
    async fn exists(&self, path: &RecordPath) -> Result<bool>;

    /// True if `path` is a directory.
    async fn is_dir(&self, path: &RecordPath) -> Result<bool>;

    /// Read a whole file.
    ///
    /// # Errors
    ///
    /// `NotFound` if `path` is not a file.
    async fn read(&self, path: &RecordPath) -> Result<Vec<u8>>;

    /// Create a file with `data`, creating parent directories.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if the file is present (files are write-once).
    async fn create(&self, path: &RecordPath, data: &[u8]) -> Result<()>;

    /// Direct children of `dir`, sorted by path.
    ///
    /// # Errors
    ///
    /// `NotFound` if `dir` is absent.
    async fn list_children(&self, dir: &RecordPath) -> Result<Vec<RecordPath>>;

    /// Delete `path` and everything below it. Returns false if nothing existed.
    async fn delete_subtree(&self, path: &RecordPath) -> Result<bool>;

    /// Move `from` (file or directory) to `to`.
    ///
    /// # Errors
    ///
    /// `NotFound` if `from` is absent, `AlreadyExists` if `to` is present.
    async fn rename(&self, from: &RecordPath, to: &RecordPath) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════════
// Record set helpers
// ═══════════════════════════════════════════════════════════════════════════

/// Data files of a record set; a plain file is its own single split.
pub async fn data_files(store: &dyn RecordStore, path: &RecordPath) -> Result<Vec<RecordPath>> {
    if !store.is_dir(path).await? {
        if store.exists(path).await? {
            return Ok(vec![path.clone()]);
        }
        return Err(StorageError::not_found(path));
    }
    Ok(store
        .list_children(path)
        .await?
        .into_iter()
        .filter(|child| is_data_file(child.name()))
        .collect())
}

/// Read a record set, one `Vec` per data file.
pub async fn read_record_set<R: RecordCodec>(
    store: &dyn RecordStore,
    path: &RecordPath,
) -> Result<Vec<Vec<R>>> {
    let mut parts = Vec::new();
    for file in data_files(store, path).await? {
        let bytes = store.read(&file).await?;
        let records = R::decode_all(&bytes).map_err(|e| {
            StorageError::codec(format!("{} in {}: {}", R::NAME, file, e.message))
        })?;
        parts.push(records);
    }
    Ok(parts)
}

/// Write `parts` as `part-00000 .. part-N` under `dir`.
pub async fn write_record_set<R: RecordCodec>(
    store: &dyn RecordStore,
    dir: &RecordPath,
    parts: Vec<Vec<R>>,
) -> Result<()> {
    for (index, records) in parts.iter().enumerate() {
        store
            .create(&dir.join(&part_name(index)), &R::encode_all(records))
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_path_normalizes_trailing_slash() {
        assert_eq!(RecordPath::new("out/").as_str(), "out");
        assert_eq!(RecordPath::new("/").as_str(), "/");
    }

    #[test]
    fn test_record_path_join_and_name() {
        let dir = RecordPath::new("work/graph_0");
        let part = dir.join("part-00001");
        assert_eq!(part.as_str(), "work/graph_0/part-00001");
        assert_eq!(part.name(), "part-00001");
        assert_eq!(part.parent(), Some(dir.clone()));
        assert_eq!(RecordPath::new("/a").parent(), Some(RecordPath::new("/")));
        assert_eq!(RecordPath::new("a").parent(), None);
    }

    #[test]
    fn test_record_path_suffix() {
        let base = RecordPath::new("out_work/round");
        assert_eq!(base.suffix("_12").as_str(), "out_work/round_12");
    }

    #[test]
    fn test_record_path_contains() {
        let dir = RecordPath::new("work/graph");
        assert!(dir.contains(&RecordPath::new("work/graph")));
        assert!(dir.contains(&RecordPath::new("work/graph/part-00000")));
        assert!(!dir.contains(&RecordPath::new("work/graph_1")));
        assert!(RecordPath::new("/").contains(&RecordPath::new("/tmp")));
    }

    #[test]
    fn test_part_names() {
        assert_eq!(part_name(0), "part-00000");
        assert_eq!(part_name(42), "part-00042");
        assert!(is_data_file("part-00000"));
        assert!(is_data_file("cluster_00003"));
        assert!(!is_data_file("_tmp-1234"));
        assert!(!is_data_file(".part-00000.crc"));
    }
}
