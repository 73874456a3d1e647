//! Browser bindings for cloudferry.
//!
//! [`commands`] holds the host-independent command surface and is what the
//! native tests and the CLI drive. On `wasm32` the same commands are exported
//! to JavaScript as `listFiles`, `startTransfer` and `setFetch`, with all
//! HTTP going through the page's `fetch`.

pub mod commands;
pub mod error;
pub mod types;

#[cfg(target_arch = "wasm32")]
mod exports;
#[cfg(target_arch = "wasm32")]
pub mod fetch;
#[cfg(target_arch = "wasm32")]
mod logging;

pub use commands::BridgeContext;
pub use error::{BridgeError, BridgeResult};
pub use types::{ListOutcome, TransferOutcome, TransferStage};
