//! Provider registry for dynamic backend resolution.

use serde_json::Value;
use std::collections::HashMap;
use std::rc::Rc;

use crate::provider::StorageProvider;
use crate::transport::HttpTransport;
use cloudferry_common::{Error, Result};

/// Factory function type for creating providers from backend options.
pub type ProviderFactory = Box<dyn Fn(Value) -> Result<Rc<dyn StorageProvider>>>;

/// Registry for storage provider factories.
///
/// Resolves the `type` of a configured remote to a provider instance built
/// from that remote's options.
pub struct ProviderRegistry {
    factories: HashMap<String, ProviderFactory>,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a provider factory.
    ///
    /// # Errors
    /// - Returns error if name is already registered
    pub fn register(&mut self, name: impl Into<String>, factory: ProviderFactory) -> Result<()> {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(Error::AlreadyExists(format!(
                "Provider '{}' is already registered",
                name
            )));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Resolve a provider by backend type and options.
    ///
    /// # Errors
    /// - Backend type not registered
    /// - Options invalid for the backend
    pub fn resolve(&self, name: &str, options: Value) -> Result<Rc<dyn StorageProvider>> {
        let factory = self.factories.get(name).ok_or_else(|| {
            Error::Config(format!("didn't find backend called \"{}\"", name))
        })?;
        factory(options)
    }

}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a registry with the built-in cloud backends.
///
/// `drive` requests go through `transport`.
pub fn create_default_registry(transport: Rc<dyn HttpTransport>) -> Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();

    registry.register(
        crate::gdrive::BACKEND_NAME,
        Box::new(move |options: Value| crate::gdrive::create_drive_provider(transport.clone(), options)),
    )?;

    Ok(registry)
}
