//! In-memory storage provider for testing.

use async_trait::async_trait;
use chrono::Utc;
use futures::stream;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::provider::{ByteStream, Metadata, StorageProvider};
use cloudferry_common::{Error, RemotePath, Result};

/// In-memory storage entry.
#[derive(Debug, Clone)]
enum Entry {
    File { data: Vec<u8>, metadata: Metadata },
    Directory { metadata: Metadata },
}

impl Entry {
    fn metadata(&self) -> &Metadata {
        match self {
            Entry::File { metadata, .. } => metadata,
            Entry::Directory { metadata } => metadata,
        }
    }
}

/// In-memory storage provider.
///
/// Useful for testing and development. Clones share the same tree, so a clone
/// handed to a registry factory sees everything written through the original.
/// Data is lost when the last clone is dropped.
#[derive(Clone)]
pub struct MemoryProvider {
    storage: Arc<RwLock<BTreeMap<String, Entry>>>,
}

impl MemoryProvider {
    /// Create a new empty memory provider.
    pub fn new() -> Self {
        let mut storage = BTreeMap::new();
        storage.insert(
            "/".to_string(),
            Entry::Directory {
                metadata: Self::new_metadata(&RemotePath::root(), None, true),
            },
        );

        Self {
            storage: Arc::new(RwLock::new(storage)),
        }
    }

    fn path_to_key(path: &RemotePath) -> String {
        path.to_string_path()
    }

    fn new_metadata(path: &RemotePath, size: Option<u64>, is_directory: bool) -> Metadata {
        Metadata {
            id: Uuid::new_v4().to_string(),
            name: path.name().unwrap_or("/").to_string(),
            size,
            is_directory,
            modified: Some(Utc::now()),
            etag: Some(Uuid::new_v4().to_string()),
            provider_data: None,
        }
    }

    fn check_parent(storage: &BTreeMap<String, Entry>, path: &RemotePath) -> Result<()> {
        if let Some(parent) = path.parent() {
            match storage.get(&Self::path_to_key(&parent)) {
                Some(Entry::Directory { .. }) => {}
                Some(Entry::File { .. }) => {
                    return Err(Error::InvalidInput("Parent is a file".to_string()));
                }
                None => {
                    return Err(Error::NotFound("Parent directory not found".to_string()));
                }
            }
        }
        Ok(())
    }
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl StorageProvider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    async fn upload(&self, path: &RemotePath, data: Vec<u8>) -> Result<Metadata> {
        let key = Self::path_to_key(path);
        let mut storage = self.storage.write().unwrap();

        Self::check_parent(&storage, path)?;
        if let Some(Entry::Directory { .. }) = storage.get(&key) {
            return Err(Error::AlreadyExists(format!(
                "Directory exists at path: {}",
                path
            )));
        }

        let metadata = Self::new_metadata(path, Some(data.len() as u64), false);
        storage.insert(
            key,
            Entry::File {
                data,
                metadata: metadata.clone(),
            },
        );

        Ok(metadata)
    }

    async fn upload_stream(&self, path: &RemotePath, mut stream: ByteStream) -> Result<Metadata> {
        use futures::StreamExt;
        let mut data = Vec::new();

        while let Some(chunk) = stream.next().await {
            data.extend_from_slice(&chunk?);
        }

        self.upload(path, data).await
    }

    async fn download(&self, path: &RemotePath) -> Result<Vec<u8>> {
        let key = Self::path_to_key(path);
        let storage = self.storage.read().unwrap();

        match storage.get(&key) {
            Some(Entry::File { data, .. }) => Ok(data.clone()),
            Some(Entry::Directory { .. }) => {
                Err(Error::InvalidInput("Cannot download directory".to_string()))
            }
            None => Err(Error::NotFound(format!("File not found: {}", path))),
        }
    }

    async fn download_stream(&self, path: &RemotePath) -> Result<ByteStream> {
        let data = self.download(path).await?;
        let stream = stream::once(async move { Ok(data) });
        Ok(Box::pin(stream))
    }

    async fn exists(&self, path: &RemotePath) -> Result<bool> {
        let key = Self::path_to_key(path);
        Ok(self.storage.read().unwrap().contains_key(&key))
    }

    async fn delete(&self, path: &RemotePath) -> Result<()> {
        let key = Self::path_to_key(path);
        let mut storage = self.storage.write().unwrap();

        match storage.get(&key) {
            Some(Entry::File { .. }) => {
                storage.remove(&key);
                Ok(())
            }
            Some(Entry::Directory { .. }) => {
                Err(Error::InvalidInput("Cannot delete a directory".to_string()))
            }
            None => Err(Error::NotFound(format!("File not found: {}", path))),
        }
    }

    async fn list(&self, path: &RemotePath) -> Result<Vec<Metadata>> {
        let key = Self::path_to_key(path);
        let storage = self.storage.read().unwrap();

        match storage.get(&key) {
            Some(Entry::Directory { .. }) => {}
            Some(Entry::File { .. }) => {
                return Err(Error::InvalidInput("Not a directory".to_string()));
            }
            None => {
                return Err(Error::NotFound(format!("Directory not found: {}", path)));
            }
        }

        let prefix = if path.is_root() {
            "/".to_string()
        } else {
            format!("{}/", key)
        };

        let results = storage
            .range(prefix.clone()..)
            .take_while(|(entry_key, _)| entry_key.starts_with(&prefix))
            .filter(|(entry_key, _)| {
                let relative = &entry_key[prefix.len()..];
                !relative.is_empty() && !relative.contains('/')
            })
            .map(|(_, entry)| entry.metadata().clone())
            .collect();

        Ok(results)
    }

    async fn metadata(&self, path: &RemotePath) -> Result<Metadata> {
        let key = Self::path_to_key(path);
        let storage = self.storage.read().unwrap();

        storage
            .get(&key)
            .map(|entry| entry.metadata().clone())
            .ok_or_else(|| Error::NotFound(format!("Path not found: {}", path)))
    }

    async fn create_dir(&self, path: &RemotePath) -> Result<Metadata> {
        let key = Self::path_to_key(path);
        let mut storage = self.storage.write().unwrap();

        Self::check_parent(&storage, path)?;
        if storage.contains_key(&key) {
            return Err(Error::AlreadyExists(format!(
                "Path already exists: {}",
                path
            )));
        }

        let metadata = Self::new_metadata(path, None, true);
        storage.insert(
            key,
            Entry::Directory {
                metadata: metadata.clone(),
            },
        );

        Ok(metadata)
    }

    async fn copy(&self, from: &RemotePath, to: &RemotePath) -> Result<Metadata> {
        let from_key = Self::path_to_key(from);
        let to_key = Self::path_to_key(to);
        let mut storage = self.storage.write().unwrap();

        if storage.contains_key(&to_key) {
            return Err(Error::AlreadyExists(format!(
                "Destination already exists: {}",
                to
            )));
        }
        Self::check_parent(&storage, to)?;

        let data = match storage.get(&from_key) {
            Some(Entry::File { data, .. }) => data.clone(),
            Some(Entry::Directory { .. }) => {
                return Err(Error::InvalidInput(format!(
                    "Cannot copy a directory: {}",
                    from
                )));
            }
            None => return Err(Error::NotFound(format!("Source not found: {}", from))),
        };

        let metadata = Self::new_metadata(to, Some(data.len() as u64), false);
        storage.insert(
            to_key,
            Entry::File {
                data,
                metadata: metadata.clone(),
            },
        );

        Ok(metadata)
    }
}
