//! HTTP transport abstraction.
//!
//! Backends issue requests through [`HttpTransport`] and never talk to the
//! network directly. Two transports exist:
//! - [`FetchTransport`] adapts a host-provided asynchronous fetch primitive
//!   (the browser's `fetch`, or a simulated host in tests)
//! - `ReqwestTransport` uses a native HTTP client (non-wasm targets only)
//!
//! Futures are not `Send`: the browser host is single-threaded and its
//! promises cannot cross threads.

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::fmt;
use tracing::debug;

use cloudferry_common::{Error, Result};

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Canonical upper-case method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outbound HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Create a request without headers or body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the request body.
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Set a JSON body and the matching content type.
    pub fn json<T: serde::Serialize>(self, value: &T) -> Result<Self> {
        let body = serde_json::to_vec(value)?;
        Ok(self
            .header("Content-Type", "application/json; charset=UTF-8")
            .body(body))
    }
}

/// Response delivered by a transport.
///
/// HTTP error statuses are ordinary responses; transports never classify them.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Header names are stored lower-case.
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl HttpResponse {
    /// Create a response from a status code and body.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Add a header (name is lower-cased).
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.into()));
        self
    }

    /// Check for a 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Look up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body parsed as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| Error::Network(format!("Failed to parse response: {}", e)))
    }
}

/// Transport used by backends to reach remote APIs.
#[async_trait(?Send)]
pub trait HttpTransport {
    /// Send a request and wait for the complete response.
    ///
    /// # Errors
    /// - `Error::Network` when the request could not be performed at all
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Asynchronous fetch primitive supplied by the host environment.
///
/// Resolves with the settled response or rejects with the host's
/// stringified rejection message.
#[async_trait(?Send)]
pub trait HostFetch {
    async fn fetch(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, String>;
}

/// Transport adapter over a host fetch primitive.
///
/// The caller is suspended until the host settles the fetch. No timeout is
/// applied and nothing is retried: a host promise that never settles keeps
/// the request pending forever.
pub struct FetchTransport<H> {
    host: H,
}

impl<H: HostFetch> FetchTransport<H> {
    /// Wrap a host fetch primitive.
    pub fn new(host: H) -> Self {
        Self { host }
    }
}

#[async_trait(?Send)]
impl<H: HostFetch> HttpTransport for FetchTransport<H> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!(method = %request.method, url = %request.url, "host fetch");
        match self.host.fetch(&request).await {
            Ok(response) => {
                debug!(status = response.status, bytes = response.body.len(), "host fetch settled");
                Ok(response)
            }
            Err(message) => {
                debug!(error = %message, "host fetch rejected");
                Err(Error::Network(message))
            }
        }
    }
}

/// Transport over a native `reqwest` client.
#[cfg(not(target_arch = "wasm32"))]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

#[cfg(not(target_arch = "wasm32"))]
impl ReqwestTransport {
    /// Create a transport with the given user agent.
    pub fn new(user_agent: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { http })
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[async_trait(?Send)]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        debug!(method = %request.method, url = %request.url, "http request");
        let mut builder = self.http.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Network(format!("Request failed: {}", e)))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("Failed to read response body: {}", e)))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
