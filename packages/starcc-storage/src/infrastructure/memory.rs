//! In-memory adapter for RecordStore.
//!
//! Only files are stored; a directory exists while at least one file lies
//! below it.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::{RecordPath, RecordStore};
use crate::{Result, StorageError};

#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    files: Arc<Mutex<BTreeMap<RecordPath, Vec<u8>>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of files currently held.
    pub fn file_count(&self) -> usize {
        self.files.lock().len()
    }

    /// Every file path, sorted.
    pub fn paths(&self) -> Vec<RecordPath> {
        self.files.lock().keys().cloned().collect()
    }

    fn has_dir(files: &BTreeMap<RecordPath, Vec<u8>>, path: &RecordPath) -> bool {
        files.keys().any(|key| key != path && path.contains(key))
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn exists(&self, path: &RecordPath) -> Result<bool> {
        let files = self.files.lock();
        Ok(files.contains_key(path) || Self::has_dir(&files, path))
    }

    async fn is_dir(&self, path: &RecordPath) -> Result<bool> {
        let files = self.files.lock();
        Ok(Self::has_dir(&files, path))
    }

    async fn read(&self, path: &RecordPath) -> Result<Vec<u8>> {
        self.files
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::not_found(path))
    }

    async fn create(&self, path: &RecordPath, data: &[u8]) -> Result<()> {
        let mut files = self.files.lock();
        if files.contains_key(path) || Self::has_dir(&files, path) {
            return Err(StorageError::already_exists(path));
        }
        files.insert(path.clone(), data.to_vec());
        Ok(())
    }

    async fn list_children(&self, dir: &RecordPath) -> Result<Vec<RecordPath>> {
        let files = self.files.lock();
        if !Self::has_dir(&files, dir) {
            return Err(StorageError::not_found(dir));
        }

        let prefix = if dir.as_str().ends_with('/') {
            dir.as_str().to_string()
        } else {
            format!("{}/", dir)
        };
        let mut children: Vec<RecordPath> = files
            .keys()
            .filter_map(|key| {
                let rest = key.as_str().strip_prefix(prefix.as_str())?;
                let child = rest.split('/').next()?;
                Some(dir.join(child))
            })
            .collect();
        children.sort();
        children.dedup();
        Ok(children)
    }

    async fn delete_subtree(&self, path: &RecordPath) -> Result<bool> {
        let mut files = self.files.lock();
        let before = files.len();
        files.retain(|key, _| !path.contains(key));
        Ok(files.len() != before)
    }

    async fn rename(&self, from: &RecordPath, to: &RecordPath) -> Result<()> {
        let mut files = self.files.lock();
        if files.contains_key(to) || Self::has_dir(&files, to) {
            return Err(StorageError::already_exists(to));
        }

        let moved: Vec<RecordPath> = files
            .keys()
            .filter(|key| from.contains(key))
            .cloned()
            .collect();
        if moved.is_empty() {
            return Err(StorageError::not_found(from));
        }

        for key in moved {
            if let Some(data) = files.remove(&key) {
                let rest = &key.as_str()[from.as_str().len()..];
                files.insert(RecordPath::new(format!("{}{}", to.as_str(), rest)), data);
            }
        }
        Ok(())
    }
}
