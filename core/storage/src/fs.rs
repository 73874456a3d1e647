//! Filesystem handles over configured remotes.
//!
//! An [`Fs`] is opened from a `"name:path"` address. The remote section is
//! looked up in a [`ConfigStore`], its backend resolved through a
//! [`ProviderRegistry`], and the root path is checked once at open time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tracing::debug;

use cloudferry_common::{Error, RemotePath, Result};

use crate::config::{ConfigStore, RemoteConfig};
use crate::provider::{Metadata, StorageProvider};
use crate::registry::ProviderRegistry;

/// What the root path of a handle pointed at when it was opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootKind {
    /// The root is an existing directory.
    Directory,
    /// The address named a file. The handle is rooted at its parent and
    /// this is the file's name.
    File(String),
    /// Nothing exists at the root yet.
    Missing,
}

/// An entry returned by listing a handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirEntry {
    /// Path relative to the handle root.
    pub remote: String,
    pub is_dir: bool,
    pub size: Option<u64>,
    pub modified: Option<DateTime<Utc>>,
}

impl DirEntry {
    fn from_metadata(remote: impl Into<String>, metadata: &Metadata) -> Self {
        Self {
            remote: remote.into(),
            is_dir: metadata.is_directory,
            size: metadata.size,
            modified: metadata.modified,
        }
    }
}

/// Split `"name:path"` into its remote name and path.
///
/// # Errors
/// - No ':' separator, or an empty remote name
pub fn parse_address(address: &str) -> Result<(&str, &str)> {
    match address.split_once(':') {
        Some((name, path)) if !name.is_empty() => Ok((name, path)),
        _ => Err(Error::Config(format!(
            "invalid remote address \"{}\": expected name:path",
            address
        ))),
    }
}

/// Handle on a path within a configured remote.
pub struct Fs {
    name: String,
    root: RemotePath,
    config: RemoteConfig,
    provider: Rc<dyn StorageProvider>,
    kind: RootKind,
}

impl Fs {
    /// Open a handle on `"name:path"`.
    ///
    /// # Errors
    /// - Malformed address
    /// - Remote not configured in `store`, or configured without a type
    /// - Unknown backend type, or options the backend rejects
    /// - Backend failure while checking the root (other than not found)
    pub async fn open(
        registry: &ProviderRegistry,
        store: &ConfigStore,
        address: &str,
    ) -> Result<Self> {
        let (name, path) = parse_address(address)?;
        let config = store.require(name)?.clone();
        let backend = config.backend().ok_or_else(|| {
            Error::Config(format!("remote \"{}\" has no type set", name))
        })?;
        let provider = registry.resolve(backend, config.options_value())?;

        let path = RemotePath::parse(path);
        let (root, kind) = if path.is_root() {
            (path, RootKind::Directory)
        } else {
            match provider.metadata(&path).await {
                Ok(metadata) if metadata.is_directory => (path, RootKind::Directory),
                Ok(_) => {
                    let leaf = path.name().unwrap_or_default().to_string();
                    let parent = path.parent().unwrap_or_else(RemotePath::root);
                    (parent, RootKind::File(leaf))
                }
                Err(Error::NotFound(_)) => (path, RootKind::Missing),
                Err(e) => return Err(e),
            }
        };

        debug!(remote = name, backend, root = %root, kind = ?kind, "opened filesystem");

        Ok(Self {
            name: name.to_string(),
            root,
            config,
            provider,
            kind,
        })
    }

    /// Remote name this handle was opened on.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &RemotePath {
        &self.root
    }

    pub fn kind(&self) -> &RootKind {
        &self.kind
    }

    pub fn provider(&self) -> &Rc<dyn StorageProvider> {
        &self.provider
    }

    /// Absolute path of `remote`, a path relative to the root.
    pub fn path_of(&self, remote: &str) -> RemotePath {
        self.root.join_relative(remote)
    }

    /// Whether `other` talks to the same remote with the same settings, so
    /// that a server-side copy between the two is possible.
    pub fn same_remote(&self, other: &Fs) -> bool {
        self.config == other.config && self.provider.name() == other.provider.name()
    }

    /// List the root, non-recursively.
    ///
    /// A handle opened on a file lists just that file.
    ///
    /// # Errors
    /// - Root does not exist
    /// - Backend failures
    pub async fn list(&self) -> Result<Vec<DirEntry>> {
        match &self.kind {
            RootKind::File(leaf) => {
                let metadata = self.provider.metadata(&self.path_of(leaf)).await?;
                Ok(vec![DirEntry::from_metadata(leaf.as_str(), &metadata)])
            }
            RootKind::Directory => {
                let entries = self.provider.list(&self.root).await?;
                Ok(entries
                    .iter()
                    .map(|metadata| DirEntry::from_metadata(metadata.name.as_str(), metadata))
                    .collect())
            }
            RootKind::Missing => Err(Error::NotFound(format!(
                "directory not found: {}",
                self.root
            ))),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::memory::MemoryProvider;

    /// Registry whose `memory` backend always hands out `shared`.
    pub(crate) fn shared_memory_registry(shared: &MemoryProvider) -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        let shared = shared.clone();
        registry
            .register(
                "memory",
                Box::new(move |_| Ok(Rc::new(shared.clone()) as Rc<dyn StorageProvider>)),
            )
            .unwrap();
        registry
    }

    pub(crate) fn memory_store(remote: &str) -> ConfigStore {
        let mut store = ConfigStore::new();
        store.set(remote, "type", "memory");
        store
    }

    async fn seeded() -> MemoryProvider {
        let provider = MemoryProvider::new();
        provider.create_dir(&RemotePath::parse("docs")).await.unwrap();
        provider
            .upload(&RemotePath::parse("docs/a.txt"), b"aaa".to_vec())
            .await
            .unwrap();
        provider
            .upload(&RemotePath::parse("docs/b.txt"), b"b".to_vec())
            .await
            .unwrap();
        provider
    }

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("work:docs/a.txt").unwrap(), ("work", "docs/a.txt"));
        assert_eq!(parse_address("work:").unwrap(), ("work", ""));
        assert_eq!(parse_address("w:a:b").unwrap(), ("w", "a:b"));
        assert!(matches!(parse_address("nocolon"), Err(Error::Config(_))));
        assert!(matches!(parse_address(":path"), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_open_unconfigured_remote() {
        let registry = shared_memory_registry(&MemoryProvider::new());
        let result = Fs::open(&registry, &ConfigStore::new(), "ghost:").await;

        let err = result.err().unwrap();
        assert!(err
            .to_string()
            .contains("didn't find section in config file (\"ghost\")"));
    }

    #[tokio::test]
    async fn test_open_without_type() {
        let registry = shared_memory_registry(&MemoryProvider::new());
        let mut store = ConfigStore::new();
        store.set("r", "token", "x");

        let result = Fs::open(&registry, &store, "r:").await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_open_unknown_backend() {
        let registry = shared_memory_registry(&MemoryProvider::new());
        let mut store = ConfigStore::new();
        store.set("r", "type", "ftp");

        let err = Fs::open(&registry, &store, "r:").await.err().unwrap();
        assert!(err.to_string().contains("didn't find backend called \"ftp\""));
    }

    #[tokio::test]
    async fn test_root_kinds() {
        let provider = seeded().await;
        let registry = shared_memory_registry(&provider);
        let store = memory_store("m");

        let dir = Fs::open(&registry, &store, "m:docs").await.unwrap();
        assert_eq!(dir.kind(), &RootKind::Directory);
        assert_eq!(dir.root(), &RemotePath::parse("docs"));

        let file = Fs::open(&registry, &store, "m:docs/a.txt").await.unwrap();
        assert_eq!(file.kind(), &RootKind::File("a.txt".to_string()));
        assert_eq!(file.root(), &RemotePath::parse("docs"));

        let missing = Fs::open(&registry, &store, "m:nothing/here").await.unwrap();
        assert_eq!(missing.kind(), &RootKind::Missing);
    }

    #[tokio::test]
    async fn test_list_directory_and_file() {
        let provider = seeded().await;
        let registry = shared_memory_registry(&provider);
        let store = memory_store("m");

        let dir = Fs::open(&registry, &store, "m:/docs/").await.unwrap();
        let names: Vec<String> = dir.list().await.unwrap().into_iter().map(|e| e.remote).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);

        let root = Fs::open(&registry, &store, "m:").await.unwrap();
        let entries = root.list().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_dir);

        let file = Fs::open(&registry, &store, "m:docs/a.txt").await.unwrap();
        let entries = file.list().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].remote, "a.txt");
        assert_eq!(entries[0].size, Some(3));
    }

    #[tokio::test]
    async fn test_list_missing_root() {
        let registry = shared_memory_registry(&MemoryProvider::new());
        let fs = Fs::open(&registry, &memory_store("m"), "m:nope").await.unwrap();

        assert!(matches!(fs.list().await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_same_remote() {
        let registry = shared_memory_registry(&MemoryProvider::new());
        let mut store = memory_store("a");
        store.set("b", "type", "memory");
        store.set("b", "label", "other");

        let a1 = Fs::open(&registry, &store, "a:").await.unwrap();
        let a2 = Fs::open(&registry, &store, "a:x").await.unwrap();
        let b = Fs::open(&registry, &store, "b:").await.unwrap();

        assert!(a1.same_remote(&a2));
        assert!(!a1.same_remote(&b));
    }
}
