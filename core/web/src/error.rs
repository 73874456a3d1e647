//! Host interop errors.
//!
//! Storage and configuration failures never reach the host as errors: the
//! commands fold them into their outcome values. What remains are failures
//! of the binding itself.

use thiserror::Error;

/// Errors raised to the host as promise rejections.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// No usable fetch primitive on the host.
    #[error("Fetch unavailable: {0}")]
    FetchUnavailable(String),

    /// An outcome could not be converted to a host value.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The storage layer could not be set up.
    #[error("Setup error: {0}")]
    Setup(#[from] cloudferry_common::Error),
}

/// Result type for binding operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

#[cfg(target_arch = "wasm32")]
impl From<BridgeError> for wasm_bindgen::JsValue {
    fn from(error: BridgeError) -> Self {
        tracing::error!("Bridge error: {}", error);
        js_sys::Error::new(&error.to_string()).into()
    }
}
