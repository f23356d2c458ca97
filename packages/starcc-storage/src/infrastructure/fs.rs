//! Local filesystem adapter for RecordStore.
//!
//! Paths are used verbatim (absolute or relative to the process cwd).

use async_trait::async_trait;
use tokio::fs;

use crate::domain::{RecordPath, RecordStore};
use crate::{Result, StorageError};

#[derive(Debug, Clone, Default)]
pub struct FsRecordStore;

impl FsRecordStore {
    pub fn new() -> Self {
        Self
    }
}

async fn metadata(path: &RecordPath) -> Result<Option<std::fs::Metadata>> {
    match fs::metadata(path.to_path_buf()).await {
        Ok(meta) => Ok(Some(meta)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl RecordStore for FsRecordStore {
    async fn exists(&self, path: &RecordPath) -> Result<bool> {
        Ok(metadata(path).await?.is_some())
    }

    async fn is_dir(&self, path: &RecordPath) -> Result<bool> {
        Ok(metadata(path).await?.map_or(false, |m| m.is_dir()))
    }

    async fn read(&self, path: &RecordPath) -> Result<Vec<u8>> {
        match metadata(path).await? {
            Some(meta) if meta.is_file() => Ok(fs::read(path.to_path_buf()).await?),
            _ => Err(StorageError::not_found(path)),
        }
    }

    async fn create(&self, path: &RecordPath, data: &[u8]) -> Result<()> {
        if metadata(path).await?.is_some() {
            return Err(StorageError::already_exists(path));
        }
        if let Some(parent) = path.to_path_buf().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        fs::write(path.to_path_buf(), data).await?;
        Ok(())
    }

    async fn list_children(&self, dir: &RecordPath) -> Result<Vec<RecordPath>> {
        if !self.is_dir(dir).await? {
            return Err(StorageError::not_found(dir));
        }
        let mut children = Vec::new();
        let mut entries = fs::read_dir(dir.to_path_buf()).await?;
        while let Some(entry) = entries.next_entry().await? {
            children.push(dir.join(&entry.file_name().to_string_lossy()));
        }
        children.sort();
        Ok(children)
    }

    async fn delete_subtree(&self, path: &RecordPath) -> Result<bool> {
        match metadata(path).await? {
            None => Ok(false),
            Some(meta) if meta.is_dir() => {
                fs::remove_dir_all(path.to_path_buf()).await?;
                Ok(true)
            }
            Some(_) => {
                fs::remove_file(path.to_path_buf()).await?;
                Ok(true)
            }
        }
    }

    async fn rename(&self, from: &RecordPath, to: &RecordPath) -> Result<()> {
        if metadata(from).await?.is_none() {
            return Err(StorageError::not_found(from));
        }
        if metadata(to).await?.is_some() {
            return Err(StorageError::already_exists(to));
        }
        if let Some(parent) = to.to_path_buf().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        fs::rename(from.to_path_buf(), to.to_path_buf()).await?;
        Ok(())
    }
}
