//! In-memory remote configuration.
//!
//! A [`ConfigStore`] maps remote names to string key/value sections, the
//! same shape as an rclone-style config file, but it is never persisted.
//! Stores are owned values: callers create one per operation instead of
//! sharing a process-wide store.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

use cloudferry_common::{Error, Result};

/// Key holding the backend type of a remote.
pub const TYPE_KEY: &str = "type";

/// Configuration section for one remote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteConfig {
    options: BTreeMap<String, String>,
}

impl RemoteConfig {
    /// Backend type (`drive`, `memory`), if set.
    pub fn backend(&self) -> Option<&str> {
        self.get(TYPE_KEY)
    }

    /// Get a single option.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Backend options (everything except `type`) as a JSON object of strings.
    ///
    /// This is the value handed to registry factories.
    pub fn options_value(&self) -> Value {
        let map: Map<String, Value> = self
            .options
            .iter()
            .filter(|(key, _)| key.as_str() != TYPE_KEY)
            .map(|(key, value)| (key.clone(), Value::String(value.clone())))
            .collect();
        Value::Object(map)
    }
}

/// Volatile store of remote configuration sections keyed by remote name.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    sections: BTreeMap<String, RemoteConfig>,
}

impl ConfigStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value` in the section for `remote`, creating it if needed.
    ///
    /// Repeated writes to the same key overwrite: the last write wins.
    pub fn set(&mut self, remote: &str, key: &str, value: impl Into<String>) {
        debug!(remote, key, "config set");
        self.sections
            .entry(remote.to_string())
            .or_default()
            .options
            .insert(key.to_string(), value.into());
    }

    /// Get the section for a remote.
    pub fn get(&self, remote: &str) -> Option<&RemoteConfig> {
        self.sections.get(remote)
    }

    /// Get the section for a remote or fail the way a missing config section does.
    pub fn require(&self, remote: &str) -> Result<&RemoteConfig> {
        self.get(remote).ok_or_else(|| {
            Error::Config(format!(
                "didn't find section in config file (\"{}\")",
                remote
            ))
        })
    }
}
