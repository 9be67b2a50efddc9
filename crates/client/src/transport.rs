//! Request/response types and the transport seam.

use crate::config::ClientConfig;
use async_trait::async_trait;
use gymdesk_core::error::{GymError, GymResult};
use gymdesk_core::ErrorBody;
use serde::de::DeserializeOwned;
use serde::Serialize;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

/// One API call, relative to the API prefix (e.g. `/access/scan`).
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub bearer: Option<String>,
    pub body: Option<serde_json::Value>,
    pub query: Vec<(String, String)>,
    /// Kiosk calls set this so a kiosk-credential rejection does not log
    /// the operator out.
    pub skip_auth_redirect: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            bearer: None,
            body: None,
            query: Vec::new(),
            skip_auth_redirect: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> GymResult<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn skip_auth_redirect(mut self) -> Self {
        self.skip_auth_redirect = true;
        self
    }

    pub fn is_auth_endpoint(&self) -> bool {
        self.path.starts_with("/auth/")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> GymResult<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            GymError::Decode(format!("unexpected response body (HTTP {}): {e}", self.status))
        })
    }

    /// `detail` from the error body, if the body has one.
    pub fn error_detail(&self) -> Option<String> {
        serde_json::from_str::<ErrorBody>(&self.body)
            .ok()
            .and_then(|b| b.message())
    }

    pub fn into_error(self) -> GymError {
        let detail = self
            .error_detail()
            .unwrap_or_else(|| default_reason(self.status).to_string());
        GymError::Api {
            status: self.status,
            detail,
        }
    }
}

fn default_reason(status: u16) -> &'static str {
    match status {
        400 => "Bad request",
        401 => "Not authenticated",
        403 => "Forbidden",
        404 => "Not found",
        409 => "Conflict",
        422 => "Unprocessable entity",
        s if s >= 500 => "Server error",
        _ => "Request failed",
    }
}

/// Abstraction over how requests reach the backend.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> GymResult<ApiResponse>;
}

// ---------------------------------------------------------------------------
// reqwest
// ---------------------------------------------------------------------------

/// HTTP transport backed by reqwest.
///
/// ```ignore
/// let transport = HttpTransport::new(ClientConfig::new("https://gym.example.com"))?;
/// ```
pub struct HttpTransport {
    client: reqwest::Client,
    base: url::Url,
}

impl HttpTransport {
    pub fn new(config: ClientConfig) -> GymResult<Self> {
        if config.base_url.is_empty() {
            return Err(GymError::InvalidInput("API base URL must not be empty".into()));
        }

        let joined = format!(
            "{}/{}/",
            config.base_url.trim_end_matches('/'),
            config.api_prefix.trim_matches('/')
        );
        let base = url::Url::parse(&joined)
            .map_err(|e| GymError::InvalidInput(format!("Invalid API URL {joined}: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GymError::Internal(format!("Failed to build HTTP client: {e}")))?;

        tracing::debug!(base = %base, "http transport ready");
        Ok(Self { client, base })
    }

    pub fn url_for(&self, path: &str) -> GymResult<url::Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| GymError::InvalidInput(format!("Invalid path {path}: {e}")))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> GymResult<ApiResponse> {
        let url = self.url_for(&request.path)?;
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, url.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!(method = request.method.as_str(), url = %url, "sending request");

        let resp = builder
            .send()
            .await
            .map_err(|e| GymError::Network(format!("{} {url}: {e}", request.method.as_str())))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| GymError::Network(format!("Failed to read response from {url}: {e}")))?;

        Ok(ApiResponse { status, body })
    }
}
