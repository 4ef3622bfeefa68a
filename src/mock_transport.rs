use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use http::header::HeaderMap;
use http::StatusCode;

use crate::transport::{RawResponse, Transport, TransportError, TransportRequest};

/// A transport which records every request and replays queued responses.
///
/// Clones share their queue and their record, so a test can keep one handle
/// while the client owns another.
#[derive(Debug, Default, Clone)]
pub struct MockTransport {
    responses: Arc<Mutex<VecDeque<Result<RawResponse, TransportError>>>>,
    requests: Arc<Mutex<Vec<TransportRequest>>>,
}

impl MockTransport {
    /// Constructs a mock transport with no queued responses
    pub fn new() -> Self {
        Self::default()
    }
    /// Queues a response with the given status and body
    pub fn with_response(self, status: StatusCode, body: &str) -> Self {
        self.push(Ok(RawResponse {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }));
        self
    }
    /// Queues a transport failure
    pub fn with_error(self, message: &str) -> Self {
        self.push(Err(TransportError::new(message)));
        self
    }
    /// Queues an arbitrary outcome
    pub fn push(&self, response: Result<RawResponse, TransportError>) {
        self.responses
            .lock()
            .expect("mock transport lock poisoned")
            .push_back(response);
    }
    /// Returns every request sent so far, oldest first
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests
            .lock()
            .expect("mock transport lock poisoned")
            .clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: TransportRequest) -> Result<RawResponse, TransportError> {
        self.requests
            .lock()
            .expect("mock transport lock poisoned")
            .push(request);
        self.responses
            .lock()
            .expect("mock transport lock poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::new("no response queued")))
    }
}
