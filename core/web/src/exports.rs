//! Functions exported to JavaScript.
//!
//! Each export returns a Promise. Command failures resolve to an outcome
//! object; only binding failures reject.

use serde::Serialize;
use serde_wasm_bindgen::Serializer;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::info;
use wasm_bindgen::prelude::*;

use cloudferry_storage::{FetchTransport, HttpTransport};

use crate::commands::BridgeContext;
use crate::error::{BridgeError, BridgeResult};
use crate::fetch::BrowserFetch;

thread_local! {
    static CONTEXT: RefCell<Option<Rc<BridgeContext>>> = const { RefCell::new(None) };
}

fn build_context(fetch: BrowserFetch) -> BridgeResult<BridgeContext> {
    let transport: Rc<dyn HttpTransport> = Rc::new(FetchTransport::new(fetch));
    BridgeContext::with_transport(transport)
}

/// Current context, built over the global `fetch` on first use.
fn context() -> BridgeResult<Rc<BridgeContext>> {
    CONTEXT.with(|slot| {
        let existing = slot.borrow().clone();
        if let Some(context) = existing {
            return Ok(context);
        }

        let context = Rc::new(build_context(BrowserFetch::global()?)?);
        *slot.borrow_mut() = Some(context.clone());
        Ok(context)
    })
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&Serializer::json_compatible())
        .map_err(|e| BridgeError::Serialization(e.to_string()).into())
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    crate::logging::init();
    info!("cloudferry {} loaded", env!("CARGO_PKG_VERSION"));
}

/// Replace the fetch primitive used for all later calls.
///
/// Calls already in flight keep the transport they started with.
#[wasm_bindgen(js_name = setFetch)]
pub fn set_fetch(fetch: js_sys::Function) -> Result<(), JsValue> {
    let context = Rc::new(build_context(BrowserFetch::new(fetch))?);
    CONTEXT.with(|slot| *slot.borrow_mut() = Some(context));
    Ok(())
}

/// `listFiles(remote, token, path)` resolves to `{files}` or `{error}`.
#[wasm_bindgen(js_name = listFiles)]
pub async fn list_files(remote: String, token: String, path: String) -> Result<JsValue, JsValue> {
    let context = context()?;
    let outcome = context.list_files(&remote, &token, &path).await;
    to_js(&outcome)
}

/// `startTransfer(sourceToken, destinationToken, sourcePath, destinationPath)`
/// resolves to the tagged transfer outcome.
#[wasm_bindgen(js_name = startTransfer)]
pub async fn start_transfer(
    source_token: String,
    destination_token: String,
    source_path: String,
    destination_path: String,
) -> Result<JsValue, JsValue> {
    let context = context()?;
    let outcome = context
        .start_transfer(&source_token, &destination_token, &source_path, &destination_path)
        .await;
    to_js(&outcome)
}
