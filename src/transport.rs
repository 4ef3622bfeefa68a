use std::collections::BTreeMap;
use std::fmt::Debug;

use async_trait::async_trait;
use http::header::HeaderMap;
use http::{Method, StatusCode};
use thiserror::Error;

/// Code reported for failures below HTTP: DNS, refused connections, TLS.
pub const TRANSPORT_ERROR_CODE: i32 = -1;

/// A signed request, ready to be put on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    /// Request method
    pub method: Method,
    /// The signed URL. Ports 80 and 443 are left out of it, so it does not
    /// say where to connect; use `connect_url` for that.
    pub url: String,
    /// Gateway host
    pub host: String,
    /// Gateway port
    pub port: u16,
    /// Request path, starting with `/`
    pub path: String,
    /// Sent as the query string for GET requests and as a form-url-encoded
    /// body otherwise.
    pub params: BTreeMap<String, String>,
    /// Request headers, `Authorization` included
    pub headers: HeaderMap,
}

impl TransportRequest {
    /// `https://host:port/path` with the port always spelled out.
    pub fn connect_url(&self) -> String {
        format!("https://{}:{}{}", self.host, self.port, self.path)
    }
}

/// A response whose body has not been interpreted.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// Response status
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body, decoded as text
    pub body: String,
}

/// A network level failure.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    /// Creates an error with the given description.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
    /// Description of the failure.
    pub fn message(&self) -> &str {
        &self.message
    }
    /// Always `TRANSPORT_ERROR_CODE`.
    pub fn code(&self) -> i32 {
        TRANSPORT_ERROR_CODE
    }
}

/// The HTTP client underneath `Client`.
///
/// Implementations only move bytes: signing has already happened and the
/// response body is handed back as text. Connection reuse, TLS and timeouts
/// are whatever the implementation provides.
#[async_trait]
pub trait Transport: Debug + Send + Sync {
    /// Sends the request and collects the full response.
    async fn send(&self, request: TransportRequest) -> Result<RawResponse, TransportError>;
}
