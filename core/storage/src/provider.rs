//! Storage provider trait definition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use cloudferry_common::{RemotePath, Result};

/// Metadata for a stored object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// Unique identifier for the object (provider-specific).
    pub id: String,
    /// Name of the object.
    pub name: String,
    /// Size in bytes (None for directories).
    pub size: Option<u64>,
    /// Whether this is a directory.
    pub is_directory: bool,
    /// Last modification time, when the backend reports one.
    pub modified: Option<DateTime<Utc>>,
    /// Content hash or revision, when available.
    pub etag: Option<String>,
    /// Provider-specific metadata.
    pub provider_data: Option<serde_json::Value>,
}

/// Byte stream type for upload/download operations.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>>>>;

/// Storage provider trait for different backends.
///
/// All operations are async. Futures are not required to be `Send` so that
/// providers can run on a single-threaded browser host.
#[async_trait(?Send)]
pub trait StorageProvider {
    /// Get the provider name (e.g., "drive", "memory").
    fn name(&self) -> &str;

    /// Upload data to the storage, replacing any existing file.
    ///
    /// # Preconditions
    /// - Parent directory must exist
    ///
    /// # Errors
    /// - Parent directory not found
    /// - Network/I/O errors
    /// - Authentication errors
    async fn upload(&self, path: &RemotePath, data: Vec<u8>) -> Result<Metadata>;

    /// Upload data as a stream.
    async fn upload_stream(&self, path: &RemotePath, stream: ByteStream) -> Result<Metadata>;

    /// Download data from storage.
    ///
    /// # Errors
    /// - File not found
    /// - Path is a directory
    async fn download(&self, path: &RemotePath) -> Result<Vec<u8>>;

    /// Download data as a stream.
    async fn download_stream(&self, path: &RemotePath) -> Result<ByteStream>;

    /// Check if a path exists.
    async fn exists(&self, path: &RemotePath) -> Result<bool>;

    /// Delete a file.
    ///
    /// # Errors
    /// - File not found
    /// - Not permitted (e.g., directory)
    async fn delete(&self, path: &RemotePath) -> Result<()>;

    /// List the direct children of a directory.
    ///
    /// # Preconditions
    /// - Path must be a directory
    async fn list(&self, path: &RemotePath) -> Result<Vec<Metadata>>;

    /// Get metadata for a path.
    ///
    /// # Errors
    /// - Path not found
    async fn metadata(&self, path: &RemotePath) -> Result<Metadata>;

    /// Create a directory.
    ///
    /// # Errors
    /// - Already exists
    /// - Parent not found
    async fn create_dir(&self, path: &RemotePath) -> Result<Metadata>;

    /// Server-side copy of a file within this provider.
    ///
    /// # Errors
    /// - Source not found
    /// - Destination already exists
    async fn copy(&self, from: &RemotePath, to: &RemotePath) -> Result<Metadata>;
}
