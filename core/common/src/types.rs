//! Common types used throughout cloudferry.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

/// A path within a remote, independent of the underlying backend.
///
/// Paths are logical: '/' separated, without empty or `.` components. The
/// root of a remote is the empty component list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemotePath {
    components: Vec<String>,
}

impl RemotePath {
    /// Create a root path.
    pub fn root() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    /// Parse a path string into a RemotePath.
    ///
    /// Uses '/' as separator. Leading, trailing and repeated separators are
    /// ignored, as are `.` segments, so `""`, `"/"` and `"./"` all name the root.
    pub fn parse(path: &str) -> Self {
        let components = path
            .split('/')
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .map(String::from)
            .collect();
        Self { components }
    }

    /// Check if this is the root path.
    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    /// Get the parent path, if any.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            None
        } else {
            let mut components = self.components.clone();
            components.pop();
            Some(Self { components })
        }
    }

    /// Get the file/directory name (last component).
    pub fn name(&self) -> Option<&str> {
        self.components.last().map(|s| s.as_str())
    }

    /// Join this path with a child component.
    pub fn join(&self, child: &str) -> crate::Result<Self> {
        if child.is_empty() {
            return Err(crate::Error::InvalidInput(
                "Child component cannot be empty".to_string(),
            ));
        }
        if child.contains('/') || child.contains('\\') {
            return Err(crate::Error::InvalidInput(
                "Child component cannot contain separators".to_string(),
            ));
        }
        let mut components = self.components.clone();
        components.push(child.to_string());
        Ok(Self { components })
    }

    /// Append a relative path (possibly several segments) to this path.
    pub fn join_relative(&self, relative: &str) -> Self {
        let mut components = self.components.clone();
        components.extend(Self::parse(relative).components);
        Self { components }
    }

    /// Get the path components.
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Convert to a string representation.
    pub fn to_string_path(&self) -> String {
        if self.is_root() {
            "/".to_string()
        } else {
            format!("/{}", self.components.join("/"))
        }
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_path())
    }
}

/// Secret string (bearer tokens) that zeroizes on drop.
#[derive(Clone, PartialEq, Eq, Zeroize)]
#[zeroize(drop)]
pub struct SecretString(String);

impl SecretString {
    /// Wrap a secret value.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Expose the secret for use in a request header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString([REDACTED; {} bytes])", self.0.len())
    }
}
