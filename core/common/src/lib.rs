//! Common utilities and types shared across cloudferry crates.
//!
//! This module provides foundational types that are used throughout the codebase:
//! the unified error type, logical remote paths and secret-bearing strings.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{RemotePath, SecretString};
