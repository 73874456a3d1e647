//! Google Drive backend.
//!
//! Requests go through an [`HttpTransport`](crate::transport::HttpTransport),
//! so the same provider runs natively over reqwest and in the browser over
//! the host's `fetch`. Paths are resolved to file IDs one component at a
//! time and cached per provider instance.

pub mod client;
pub mod provider;
pub mod token;

/// Backend type name used in remote configuration.
pub const BACKEND_NAME: &str = "drive";

pub use client::{DriveClient, DriveFile};
pub use provider::{create_drive_provider, DriveOptions, DriveProvider};
pub use token::DriveToken;
