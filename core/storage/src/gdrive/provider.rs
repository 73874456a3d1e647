//! Google Drive storage provider implementation.

use async_trait::async_trait;
use futures::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, warn};

use cloudferry_common::{Error, RemotePath, Result};

use super::client::{DriveClient, DriveFile};
use super::token::DriveToken;
use crate::provider::{ByteStream, Metadata, StorageProvider};
use crate::transport::HttpTransport;

/// Uploads above this size go through a resumable session.
const RESUMABLE_THRESHOLD: usize = 5 * 1024 * 1024;

fn default_root_folder_id() -> String {
    "root".to_string()
}

/// Options of a `drive` remote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveOptions {
    /// JSON text of the bearer token.
    pub token: String,
    /// Folder ID the remote is rooted at ("root" is My Drive).
    #[serde(default = "default_root_folder_id")]
    pub root_folder_id: String,
}

/// Google Drive storage provider.
pub struct DriveProvider {
    client: DriveClient,
    root_folder_id: String,
    /// Cache of path to file ID mapping.
    path_cache: RefCell<HashMap<String, String>>,
}

impl DriveProvider {
    /// Create a new Google Drive provider.
    ///
    /// # Errors
    /// - Token option is not valid token JSON
    pub fn new(transport: Rc<dyn HttpTransport>, options: DriveOptions) -> Result<Self> {
        let token = DriveToken::parse(&options.token)?;
        if token.is_expired() {
            warn!("drive token has expired and will not be refreshed");
        }

        let mut path_cache = HashMap::new();
        path_cache.insert("/".to_string(), options.root_folder_id.clone());

        Ok(Self {
            client: DriveClient::new(transport, token),
            root_folder_id: options.root_folder_id,
            path_cache: RefCell::new(path_cache),
        })
    }

    /// Resolve a RemotePath to a Google Drive file ID.
    async fn resolve_path(&self, path: &RemotePath) -> Result<String> {
        if let Some(id) = self.path_cache.borrow().get(&path.to_string_path()) {
            return Ok(id.clone());
        }

        let mut current_id = self.root_folder_id.clone();
        let mut current_path = RemotePath::root();

        for component in path.components() {
            current_path = current_path.join(component)?;
            let key = current_path.to_string_path();

            let cached = self.path_cache.borrow().get(&key).cloned();
            if let Some(id) = cached {
                current_id = id;
                continue;
            }

            let file = self
                .client
                .find_file(component, &current_id)
                .await?
                .ok_or_else(|| {
                    Error::NotFound(format!("Path component not found: {}", component))
                })?;

            debug!(path = %key, id = %file.id, "resolved drive path");
            current_id = file.id;
            self.path_cache.borrow_mut().insert(key, current_id.clone());
        }

        Ok(current_id)
    }

    /// Resolve parent path and return (parent_id, name).
    async fn resolve_parent(&self, path: &RemotePath) -> Result<(String, String)> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::InvalidInput("Cannot get parent of root path".to_string()))?;

        let name = path
            .name()
            .ok_or_else(|| Error::InvalidInput("Path has no name component".to_string()))?
            .to_string();

        let parent_id = self.resolve_path(&parent).await?;

        Ok((parent_id, name))
    }

    /// Convert DriveFile to Metadata.
    fn to_metadata(&self, file: DriveFile, path: &RemotePath) -> Metadata {
        let size = file.size_bytes();
        let is_directory = file.is_folder();
        Metadata {
            name: path.name().unwrap_or("/").to_string(),
            size,
            is_directory,
            modified: file.modified_time,
            etag: file.md5_checksum.or_else(|| Some(file.id.clone())),
            provider_data: Some(serde_json::json!({
                "drive_id": file.id,
                "mime_type": file.mime_type,
                "parents": file.parents,
            })),
            id: file.id,
        }
    }

    fn invalidate_cache(&self, path: &RemotePath) {
        self.path_cache.borrow_mut().remove(&path.to_string_path());
    }

    fn cache_path(&self, path: &RemotePath, file_id: &str) {
        self.path_cache
            .borrow_mut()
            .insert(path.to_string_path(), file_id.to_string());
    }
}

#[async_trait(?Send)]
impl StorageProvider for DriveProvider {
    fn name(&self) -> &str {
        super::BACKEND_NAME
    }

    async fn upload(&self, path: &RemotePath, data: Vec<u8>) -> Result<Metadata> {
        let (parent_id, name) = self.resolve_parent(path).await?;

        let file = match self.client.find_file(&name, &parent_id).await? {
            Some(existing) if existing.is_folder() => {
                return Err(Error::AlreadyExists(format!(
                    "Directory exists at path: {}",
                    path
                )));
            }
            Some(existing) => self.client.update_file(&existing.id, data).await?,
            None if data.len() > RESUMABLE_THRESHOLD => {
                self.client.upload_resumable(&name, &parent_id, &data).await?
            }
            None => self.client.upload_simple(&name, &parent_id, data).await?,
        };

        self.cache_path(path, &file.id);
        Ok(self.to_metadata(file, path))
    }

    async fn upload_stream(&self, path: &RemotePath, mut stream: ByteStream) -> Result<Metadata> {
        // The size must be known up front to pick the upload flavour.
        let mut data = Vec::new();
        while let Some(chunk) = stream.next().await {
            data.extend_from_slice(&chunk?);
        }

        self.upload(path, data).await
    }

    async fn download(&self, path: &RemotePath) -> Result<Vec<u8>> {
        let file_id = self.resolve_path(path).await?;
        self.client.download(&file_id).await
    }

    async fn download_stream(&self, path: &RemotePath) -> Result<ByteStream> {
        let data = self.download(path).await?;
        Ok(Box::pin(stream::once(async move { Ok(data) })))
    }

    async fn exists(&self, path: &RemotePath) -> Result<bool> {
        match self.resolve_path(path).await {
            Ok(_) => Ok(true),
            Err(Error::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, path: &RemotePath) -> Result<()> {
        let file_id = self.resolve_path(path).await?;
        // Drive deletes folders together with everything in them.
        if self.client.get_file(&file_id).await?.is_folder() {
            return Err(Error::InvalidInput(format!(
                "Cannot delete a directory: {}",
                path
            )));
        }
        self.client.delete(&file_id).await?;
        self.invalidate_cache(path);
        Ok(())
    }

    async fn list(&self, path: &RemotePath) -> Result<Vec<Metadata>> {
        let folder_id = self.resolve_path(path).await?;
        let files = self.client.list_folder(&folder_id).await?;

        let mut results = Vec::with_capacity(files.len());
        for file in files {
            // Drive allows '/' in names; such entries cannot be addressed by path.
            let child_path = match path.join(&file.name) {
                Ok(child_path) => child_path,
                Err(_) => {
                    warn!(name = %file.name, "skipping drive entry with unaddressable name");
                    continue;
                }
            };

            self.cache_path(&child_path, &file.id);
            results.push(self.to_metadata(file, &child_path));
        }

        Ok(results)
    }

    async fn metadata(&self, path: &RemotePath) -> Result<Metadata> {
        let file_id = self.resolve_path(path).await?;
        let file = self.client.get_file(&file_id).await?;
        Ok(self.to_metadata(file, path))
    }

    async fn create_dir(&self, path: &RemotePath) -> Result<Metadata> {
        let (parent_id, name) = self.resolve_parent(path).await?;

        if let Some(existing) = self.client.find_file(&name, &parent_id).await? {
            let kind = if existing.is_folder() { "Directory" } else { "File" };
            return Err(Error::AlreadyExists(format!(
                "{} already exists at path: {}",
                kind, path
            )));
        }

        let folder = self.client.create_folder(&name, &parent_id).await?;
        self.cache_path(path, &folder.id);

        Ok(self.to_metadata(folder, path))
    }

    async fn copy(&self, from: &RemotePath, to: &RemotePath) -> Result<Metadata> {
        let from_id = self.resolve_path(from).await?;
        let (to_parent_id, to_name) = self.resolve_parent(to).await?;

        if self
            .client
            .find_file(&to_name, &to_parent_id)
            .await?
            .is_some()
        {
            return Err(Error::AlreadyExists(format!(
                "Destination already exists: {}",
                to
            )));
        }

        let file = self
            .client
            .copy_file(&from_id, &to_name, &to_parent_id)
            .await?;
        self.cache_path(to, &file.id);

        Ok(self.to_metadata(file, to))
    }
}

/// Create a Google Drive provider from remote options.
pub fn create_drive_provider(
    transport: Rc<dyn HttpTransport>,
    options: serde_json::Value,
) -> Result<Rc<dyn StorageProvider>> {
    let options: DriveOptions = serde_json::from_value(options)
        .map_err(|e| Error::Config(format!("Invalid drive options: {}", e)))?;

    Ok(Rc::new(DriveProvider::new(transport, options)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gdrive::client::tests::{drive_file, ScriptedTransport};
    use crate::gdrive::client::FOLDER_MIME_TYPE;
    use crate::transport::Method;

    fn provider(transport: &Rc<ScriptedTransport>) -> DriveProvider {
        DriveProvider::new(
            transport.clone(),
            DriveOptions {
                token: DriveToken::from_access_token("tok").to_json().unwrap(),
                root_folder_id: default_root_folder_id(),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_create_drive_provider_factory() {
        let transport: Rc<dyn HttpTransport> = Rc::new(ScriptedTransport::default());
        let options = serde_json::json!({"token": r#"{"access_token":"x"}"#});

        let provider = create_drive_provider(transport, options).unwrap();
        assert_eq!(provider.name(), "drive");
    }

    #[test]
    fn test_create_drive_provider_invalid_options() {
        let transport: Rc<dyn HttpTransport> = Rc::new(ScriptedTransport::default());

        let missing = create_drive_provider(transport.clone(), serde_json::json!({}));
        assert!(matches!(missing, Err(Error::Config(_))));

        let garbage = create_drive_provider(transport, serde_json::json!({"token": "nope"}));
        assert!(matches!(garbage, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_list_root_caches_children() {
        let transport = Rc::new(ScriptedTransport::default());
        transport.push_json(
            200,
            serde_json::json!({"files": [
                drive_file("d1", "docs", FOLDER_MIME_TYPE),
                drive_file("f1", "a.txt", "text/plain"),
                drive_file("bad", "x/y", "text/plain"),
            ]}),
        );
        transport.push(crate::transport::HttpResponse::new(200, "hello"));

        let provider = provider(&transport);
        let entries = provider.list(&RemotePath::root()).await.unwrap();
        let names: Vec<&str> = entries.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["docs", "a.txt"]);
        assert!(entries[0].is_directory);

        // a.txt resolves from the cache: the next request is the download itself.
        let data = provider.download(&RemotePath::parse("a.txt")).await.unwrap();
        assert_eq!(data, b"hello".to_vec());
        let requests = transport.requests.borrow();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].url.contains("/files/f1"));
    }

    #[tokio::test]
    async fn test_resolve_walks_components() {
        let transport = Rc::new(ScriptedTransport::default());
        transport.push_json(200, serde_json::json!({"files": [drive_file("d1", "docs", FOLDER_MIME_TYPE)]}));
        transport.push_json(200, serde_json::json!({"files": [drive_file("f9", "r.pdf", "application/pdf")]}));
        transport.push_json(200, drive_file("f9", "r.pdf", "application/pdf"));

        let provider = provider(&transport);
        let meta = provider.metadata(&RemotePath::parse("docs/r.pdf")).await.unwrap();
        assert_eq!(meta.id, "f9");
        assert_eq!(meta.name, "r.pdf");
        assert!(!meta.is_directory);
    }

    #[tokio::test]
    async fn test_exists_false_on_missing_component() {
        let transport = Rc::new(ScriptedTransport::default());
        transport.push_json(200, serde_json::json!({"files": []}));

        let provider = provider(&transport);
        assert!(!provider.exists(&RemotePath::parse("nope")).await.unwrap());
    }

    #[tokio::test]
    async fn test_upload_updates_existing_file() {
        let transport = Rc::new(ScriptedTransport::default());
        // find_file in root
        transport.push_json(200, serde_json::json!({"files": [drive_file("f1", "a.txt", "text/plain")]}));
        // update_file
        transport.push_json(200, drive_file("f1", "a.txt", "text/plain"));

        let provider = provider(&transport);
        let meta = provider
            .upload(&RemotePath::parse("a.txt"), b"new".to_vec())
            .await
            .unwrap();
        assert_eq!(meta.id, "f1");

        let requests = transport.requests.borrow();
        assert_eq!(requests[1].method, Method::Patch);
        assert!(requests[1].url.contains("uploadType=media"));
        assert_eq!(requests[1].body.as_deref(), Some(&b"new"[..]));
    }

    #[tokio::test]
    async fn test_delete_refuses_folder() {
        let transport = Rc::new(ScriptedTransport::default());
        transport.push_json(200, serde_json::json!({"files": [drive_file("d1", "docs", FOLDER_MIME_TYPE)]}));
        transport.push_json(200, drive_file("d1", "docs", FOLDER_MIME_TYPE));

        let provider = provider(&transport);
        let result = provider.delete(&RemotePath::parse("docs")).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));

        let requests = transport.requests.borrow();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.method != Method::Delete));
    }

    #[tokio::test]
    async fn test_delete_file() {
        let transport = Rc::new(ScriptedTransport::default());
        transport.push_json(200, serde_json::json!({"files": [drive_file("f1", "a.txt", "text/plain")]}));
        transport.push_json(200, drive_file("f1", "a.txt", "text/plain"));
        transport.push(crate::transport::HttpResponse::new(204, ""));

        let provider = provider(&transport);
        provider.delete(&RemotePath::parse("a.txt")).await.unwrap();

        let requests = transport.requests.borrow();
        assert_eq!(requests[2].method, Method::Delete);
        assert!(requests[2].url.contains("/files/f1"));
    }

    #[tokio::test]
    async fn test_copy_refuses_existing_destination() {
        let transport = Rc::new(ScriptedTransport::default());
        // resolve source
        transport.push_json(200, serde_json::json!({"files": [drive_file("f1", "a.txt", "text/plain")]}));
        // destination lookup finds a file
        transport.push_json(200, serde_json::json!({"files": [drive_file("f2", "b.txt", "text/plain")]}));

        let provider = provider(&transport);
        let result = provider
            .copy(&RemotePath::parse("a.txt"), &RemotePath::parse("b.txt"))
            .await;
        assert!(matches!(result, Err(Error::AlreadyExists(_))));
    }
}
