//! Browser `fetch` as the host primitive behind the Drive transport.

use async_trait::async_trait;
use js_sys::{Array, Function, Promise, Reflect, Uint8Array};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Headers, RequestInit, Response};

use cloudferry_storage::{HostFetch, HttpRequest, HttpResponse};

use crate::error::{BridgeError, BridgeResult};

/// Calls a JS function with the signature of `fetch(url, init)`.
pub struct BrowserFetch {
    fetch: Function,
}

impl BrowserFetch {
    pub fn new(fetch: Function) -> Self {
        Self { fetch }
    }

    /// Use the global `fetch` of the window or worker.
    pub fn global() -> BridgeResult<Self> {
        let fetch = Reflect::get(&js_sys::global(), &JsValue::from_str("fetch"))
            .map_err(|e| BridgeError::FetchUnavailable(js_error_to_string(e)))?;
        fetch
            .dyn_into::<Function>()
            .map(Self::new)
            .map_err(|_| BridgeError::FetchUnavailable("global fetch is not a function".into()))
    }

    async fn call(&self, request: &HttpRequest) -> Result<HttpResponse, JsValue> {
        let headers = Headers::new()?;
        for (name, value) in &request.headers {
            headers.append(name, value)?;
        }

        let init = RequestInit::new();
        init.set_method(request.method.as_str());
        init.set_headers(&headers);
        if let Some(body) = &request.body {
            init.set_body(&Uint8Array::from(body.as_slice()));
        }

        let promise: Promise = self
            .fetch
            .call2(&js_sys::global(), &JsValue::from_str(&request.url), &init)?
            .dyn_into()?;
        let response: Response = JsFuture::from(promise).await?.dyn_into()?;

        let buffer = JsFuture::from(response.array_buffer()?).await?;
        let mut result = HttpResponse::new(response.status(), Uint8Array::new(&buffer).to_vec());

        if let Some(entries) = js_sys::try_iter(&response.headers())? {
            for entry in entries {
                let pair: Array = entry?.dyn_into()?;
                if let (Some(name), Some(value)) = (pair.get(0).as_string(), pair.get(1).as_string()) {
                    result = result.with_header(&name, value);
                }
            }
        }

        Ok(result)
    }
}

#[async_trait(?Send)]
impl HostFetch for BrowserFetch {
    async fn fetch(&self, request: &HttpRequest) -> Result<HttpResponse, String> {
        self.call(request).await.map_err(js_error_to_string)
    }
}

/// Message of a rejected promise or thrown value.
pub(crate) fn js_error_to_string(err: JsValue) -> String {
    if let Some(text) = err.as_string() {
        return text;
    }
    if let Ok(message) = Reflect::get(&err, &JsValue::from_str("message")) {
        if let Some(text) = message.as_string() {
            return text;
        }
    }
    format!("{err:?}")
}
