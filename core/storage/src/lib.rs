//! Storage layer for cloudferry.
//!
//! Remotes are configured in an in-memory [`ConfigStore`], opened as [`Fs`]
//! handles through a [`ProviderRegistry`], and acted on by the functions in
//! [`operations`]. Backends talk HTTP only through an [`HttpTransport`], so
//! the host decides how requests leave the process.

pub mod config;
pub mod fs;
pub mod gdrive;
pub mod memory;
pub mod operations;
pub mod provider;
pub mod registry;
pub mod transport;

pub use config::{ConfigStore, RemoteConfig};
pub use fs::{DirEntry, Fs, RootKind};
pub use memory::MemoryProvider;
pub use provider::{ByteStream, Metadata, StorageProvider};
pub use registry::{create_default_registry, ProviderFactory, ProviderRegistry};
pub use transport::{FetchTransport, HostFetch, HttpRequest, HttpResponse, HttpTransport, Method};

#[cfg(not(target_arch = "wasm32"))]
pub use transport::ReqwestTransport;
