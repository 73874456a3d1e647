//! Google Drive API client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use url::Url;

use cloudferry_common::{Error, Result};

use super::token::DriveToken;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Method};

/// Google Drive API base URL.
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
/// Google Drive upload API base URL.
const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Chunk size for resumable uploads (must be a multiple of 256KB).
pub const CHUNK_SIZE: usize = 8 * 256 * 1024;

/// MIME type of Drive folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

const FILE_FIELDS: &str = "id,name,mimeType,size,modifiedTime,parents,md5Checksum,trashed";
const LIST_FIELDS: &str =
    "files(id,name,mimeType,size,modifiedTime,parents,md5Checksum,trashed),nextPageToken";

/// Google Drive file metadata from API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    /// File ID.
    pub id: String,
    /// File name.
    pub name: String,
    /// MIME type.
    pub mime_type: String,
    /// File size in bytes (only for binary files).
    #[serde(default)]
    pub size: Option<String>,
    /// Modified time.
    #[serde(default)]
    pub modified_time: Option<DateTime<Utc>>,
    /// Parent folder IDs.
    #[serde(default)]
    pub parents: Vec<String>,
    /// MD5 checksum (only for binary files).
    #[serde(default)]
    pub md5_checksum: Option<String>,
    /// Trashed status.
    #[serde(default)]
    pub trashed: bool,
}

impl DriveFile {
    /// Check if this is a folder.
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }

    /// Get size as u64.
    pub fn size_bytes(&self) -> Option<u64> {
        self.size.as_ref().and_then(|s| s.parse().ok())
    }
}

/// Response from listing files.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileListResponse {
    files: Vec<DriveFile>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Google Drive API client over an [`HttpTransport`].
pub struct DriveClient {
    transport: Rc<dyn HttpTransport>,
    token: DriveToken,
}

impl DriveClient {
    /// Create a new Drive client.
    pub fn new(transport: Rc<dyn HttpTransport>, token: DriveToken) -> Self {
        Self { transport, token }
    }

    /// Build an API URL from path segments and query pairs.
    fn url(base: &str, segments: &[&str], query: &[(&str, &str)]) -> Result<String> {
        let mut url = Url::parse(base)
            .map_err(|e| Error::InvalidInput(format!("Invalid API URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::InvalidInput("API URL cannot be a base".to_string()))?
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url.into())
    }

    fn request(&self, method: Method, url: String) -> HttpRequest {
        HttpRequest::new(method, url).header("Authorization", self.token.authorization())
    }

    /// Escape a value for use inside a quoted Drive query string.
    fn escape_query(value: &str) -> String {
        value.replace('\\', "\\\\").replace('\'', "\\'")
    }

    /// Get file metadata by ID.
    pub async fn get_file(&self, file_id: &str) -> Result<DriveFile> {
        let url = Self::url(
            DRIVE_API_BASE,
            &["files", file_id],
            &[("fields", FILE_FIELDS), ("supportsAllDrives", "true")],
        )?;

        let response = self.transport.send(self.request(Method::Get, url)).await?;
        Self::handle_response(response)
    }

    /// Create a folder.
    pub async fn create_folder(&self, name: &str, parent_id: &str) -> Result<DriveFile> {
        let url = Self::url(
            DRIVE_API_BASE,
            &["files"],
            &[("fields", FILE_FIELDS), ("supportsAllDrives", "true")],
        )?;

        let metadata = serde_json::json!({
            "name": name,
            "mimeType": FOLDER_MIME_TYPE,
            "parents": [parent_id],
        });

        let request = self.request(Method::Post, url).json(&metadata)?;
        let response = self.transport.send(request).await?;
        Self::handle_response(response)
    }

    /// List all files in a folder, following pagination.
    pub async fn list_folder(&self, folder_id: &str) -> Result<Vec<DriveFile>> {
        let query = format!(
            "'{}' in parents and trashed = false",
            Self::escape_query(folder_id)
        );
        let mut all_files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("q", query.as_str()),
                ("fields", LIST_FIELDS),
                ("pageSize", "1000"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ];
            if let Some(token) = &page_token {
                params.push(("pageToken", token.as_str()));
            }

            let url = Self::url(DRIVE_API_BASE, &["files"], &params)?;
            let response = self.transport.send(self.request(Method::Get, url)).await?;
            let list_response: FileListResponse = Self::handle_response(response)?;
            all_files.extend(list_response.files);

            match list_response.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(all_files)
    }

    /// Find a file by name in a folder.
    pub async fn find_file(&self, name: &str, parent_id: &str) -> Result<Option<DriveFile>> {
        let query = format!(
            "name = '{}' and '{}' in parents and trashed = false",
            Self::escape_query(name),
            Self::escape_query(parent_id)
        );
        let url = Self::url(
            DRIVE_API_BASE,
            &["files"],
            &[
                ("q", query.as_str()),
                ("fields", LIST_FIELDS),
                ("pageSize", "1"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ],
        )?;

        let response = self.transport.send(self.request(Method::Get, url)).await?;
        let list_response: FileListResponse = Self::handle_response(response)?;
        Ok(list_response.files.into_iter().next())
    }

    /// Upload a small file with a single multipart request.
    pub async fn upload_simple(
        &self,
        name: &str,
        parent_id: &str,
        data: Vec<u8>,
    ) -> Result<DriveFile> {
        let url = Self::url(
            DRIVE_UPLOAD_BASE,
            &["files"],
            &[
                ("uploadType", "multipart"),
                ("fields", FILE_FIELDS),
                ("supportsAllDrives", "true"),
            ],
        )?;

        let metadata = serde_json::json!({
            "name": name,
            "parents": [parent_id]
        });
        let metadata_json = serde_json::to_string(&metadata)?;

        let boundary = "CloudferryBoundary";
        let mut body = Vec::with_capacity(data.len() + metadata_json.len() + 256);

        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
        body.extend_from_slice(metadata_json.as_bytes());
        body.extend_from_slice(b"\r\n");

        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(&data);
        body.extend_from_slice(b"\r\n");

        body.extend_from_slice(format!("--{}--", boundary).as_bytes());

        let request = self
            .request(Method::Post, url)
            .header(
                "Content-Type",
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body);
        let response = self.transport.send(request).await?;
        Self::handle_response(response)
    }

    /// Replace the content of an existing file.
    pub async fn update_file(&self, file_id: &str, data: Vec<u8>) -> Result<DriveFile> {
        let url = Self::url(
            DRIVE_UPLOAD_BASE,
            &["files", file_id],
            &[
                ("uploadType", "media"),
                ("fields", FILE_FIELDS),
                ("supportsAllDrives", "true"),
            ],
        )?;

        let request = self
            .request(Method::Patch, url)
            .header("Content-Type", "application/octet-stream")
            .body(data);
        let response = self.transport.send(request).await?;
        Self::handle_response(response)
    }

    /// Start a resumable upload session and return its upload URI.
    pub async fn start_resumable_upload(
        &self,
        name: &str,
        parent_id: &str,
        total_size: u64,
    ) -> Result<String> {
        let url = Self::url(
            DRIVE_UPLOAD_BASE,
            &["files"],
            &[("uploadType", "resumable"), ("supportsAllDrives", "true")],
        )?;

        let metadata = serde_json::json!({
            "name": name,
            "parents": [parent_id]
        });

        let request = self
            .request(Method::Post, url)
            .header("X-Upload-Content-Length", total_size.to_string())
            .json(&metadata)?;
        let response = self.transport.send(request).await?;

        if !response.is_success() {
            return Err(Self::status_error(&response, "Failed to start resumable upload"));
        }

        response
            .header("location")
            .map(String::from)
            .ok_or_else(|| Error::Network("No upload URI in response".to_string()))
    }

    /// Upload one chunk of a resumable session.
    ///
    /// Returns the file once the final chunk has been accepted.
    pub async fn upload_chunk(
        &self,
        upload_uri: &str,
        data: &[u8],
        start_byte: u64,
        total_size: u64,
    ) -> Result<Option<DriveFile>> {
        let end_byte = start_byte + data.len() as u64 - 1;
        let content_range = format!("bytes {}-{}/{}", start_byte, end_byte, total_size);

        let request = HttpRequest::new(Method::Put, upload_uri)
            .header("Content-Range", content_range)
            .body(data.to_vec());
        let response = self.transport.send(request).await?;

        match response.status {
            200 | 201 => Ok(Some(response.json()?)),
            // 308 Resume Incomplete
            308 => Ok(None),
            _ => Err(Self::status_error(&response, "Chunk upload failed")),
        }
    }

    /// Upload a large file in chunks through a resumable session.
    pub async fn upload_resumable(
        &self,
        name: &str,
        parent_id: &str,
        data: &[u8],
    ) -> Result<DriveFile> {
        let total_size = data.len() as u64;
        let upload_uri = self
            .start_resumable_upload(name, parent_id, total_size)
            .await?;

        let mut bytes_uploaded = 0u64;
        for chunk in data.chunks(CHUNK_SIZE) {
            let result = self
                .upload_chunk(&upload_uri, chunk, bytes_uploaded, total_size)
                .await?;
            bytes_uploaded += chunk.len() as u64;

            if let Some(file) = result {
                return Ok(file);
            }
        }

        Err(Error::Network("Upload did not complete".to_string()))
    }

    /// Download file content.
    pub async fn download(&self, file_id: &str) -> Result<Vec<u8>> {
        let url = Self::url(
            DRIVE_API_BASE,
            &["files", file_id],
            &[("alt", "media"), ("supportsAllDrives", "true")],
        )?;

        let response = self.transport.send(self.request(Method::Get, url)).await?;
        if !response.is_success() {
            return Err(Self::classify(&response, "Download failed"));
        }

        Ok(response.body.to_vec())
    }

    /// Delete a file.
    pub async fn delete(&self, file_id: &str) -> Result<()> {
        let url = Self::url(
            DRIVE_API_BASE,
            &["files", file_id],
            &[("supportsAllDrives", "true")],
        )?;

        let response = self
            .transport
            .send(self.request(Method::Delete, url))
            .await?;
        if response.is_success() {
            Ok(())
        } else {
            Err(Self::classify(&response, "Delete failed"))
        }
    }

    /// Server-side copy of a file.
    pub async fn copy_file(
        &self,
        file_id: &str,
        new_name: &str,
        parent_id: &str,
    ) -> Result<DriveFile> {
        let url = Self::url(
            DRIVE_API_BASE,
            &["files", file_id, "copy"],
            &[("fields", FILE_FIELDS), ("supportsAllDrives", "true")],
        )?;

        let metadata = serde_json::json!({
            "name": new_name,
            "parents": [parent_id]
        });

        let request = self.request(Method::Post, url).json(&metadata)?;
        let response = self.transport.send(request).await?;
        Self::handle_response(response)
    }

    fn status_error(response: &HttpResponse, context: &str) -> Error {
        Error::Network(format!(
            "{}: {} - {}",
            context,
            response.status,
            response.text()
        ))
    }

    /// Map a non-success status to an error.
    fn classify(response: &HttpResponse, context: &str) -> Error {
        match response.status {
            404 => Error::NotFound("Resource not found".to_string()),
            401 => Error::Authentication("Invalid or expired token".to_string()),
            403 => Error::PermissionDenied(format!("Access denied - {}", response.text())),
            _ => Self::status_error(response, context),
        }
    }

    /// Handle API response with error checking.
    fn handle_response<T: serde::de::DeserializeOwned>(response: HttpResponse) -> Result<T> {
        if response.is_success() {
            response.json()
        } else {
            Err(Self::classify(&response, "API error"))
        }
    }
}
