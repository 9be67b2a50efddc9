//! In-memory transport for tests.
//!
//! ```ignore
//! let transport = MockTransport::new(|req| match req.path.as_str() {
//!     "/auth/me" => MockTransport::ok(&user),
//!     _ => MockTransport::status(404, "Not found"),
//! });
//! ```

use super::{ApiRequest, ApiResponse, Method, Transport};
use async_trait::async_trait;
use gymdesk_core::error::{GymError, GymResult};
use serde::Serialize;
use std::sync::Mutex;
use std::time::Duration;

type Handler = dyn Fn(&ApiRequest) -> GymResult<ApiResponse> + Send + Sync;

/// Closure-driven transport that records every request it receives.
pub struct MockTransport {
    handler: Box<Handler>,
    requests: Mutex<Vec<ApiRequest>>,
    latency: Option<Duration>,
}

impl MockTransport {
    pub fn new(
        handler: impl Fn(&ApiRequest) -> GymResult<ApiResponse> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
            latency: None,
        }
    }

    /// Delays every response, so concurrent callers overlap.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    /// `200` with the value wrapped in a `{ "data": ... }` envelope.
    pub fn ok<T: Serialize>(data: &T) -> GymResult<ApiResponse> {
        let body = serde_json::json!({ "data": data });
        Ok(ApiResponse::new(200, body.to_string()))
    }

    /// Error status with a `{ "detail": ... }` body.
    pub fn status(status: u16, detail: &str) -> GymResult<ApiResponse> {
        let body = serde_json::json!({ "detail": detail });
        Ok(ApiResponse::new(status, body.to_string()))
    }

    /// A transport-level failure, as if the backend were unreachable.
    pub fn unreachable() -> GymResult<ApiResponse> {
        Err(GymError::Network("connection refused".into()))
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &ApiRequest) -> GymResult<ApiResponse> {
        if let Ok(mut log) = self.requests.lock() {
            log.push(request.clone());
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        (self.handler)(request)
    }
}
