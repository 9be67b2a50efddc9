//! Session-aware API client.
//!
//! Every request carries the current bearer token. A 401 triggers at most
//! one refresh exchange at a time: concurrent requests that failed with
//! the same stale token wait on the refresh gate and reuse whatever token
//! the winner stored. The original request is retried once.

use crate::storage::KeyValueStore;
use crate::tokens::TokenStore;
use crate::transport::{ApiRequest, ApiResponse, Transport};
use gymdesk_core::error::{GymError, GymResult};
use gymdesk_core::{Envelope, User};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

/// Where the UI should go once the session cannot be recovered.
pub const LOGIN_ROUTE: &str = "/login";

const REFRESH_PATH: &str = "/auth/refresh";
const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn { user: Option<User> },
    Refreshed,
    LoggedOut,
    Expired { redirect_to: String },
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Cheap to clone; clones share tokens, events and the refresh gate.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn Transport>,
    tokens: TokenStore,
    events: broadcast::Sender<SessionEvent>,
    refresh_gate: Mutex<()>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, tokens: TokenStore) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                transport,
                tokens,
                events,
                refresh_gate: Mutex::new(()),
            }),
        }
    }

    /// Convenience constructor over two storage scopes.
    pub fn with_stores(
        transport: Arc<dyn Transport>,
        session: Arc<dyn KeyValueStore>,
        persistent: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self::new(transport, TokenStore::new(session, persistent))
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub(crate) fn publish(&self, event: SessionEvent) {
        // Nobody listening is fine.
        let _ = self.inner.events.send(event);
    }

    /// Sends without touching the session: no bearer, no refresh.
    pub(crate) async fn send_anonymous(&self, request: &ApiRequest) -> GymResult<ApiResponse> {
        let resp = self.inner.transport.send(request).await?;
        ensure_success(resp)
    }

    /// Sends `request` with the session's bearer token, recovering from a
    /// 401 by refreshing once.
    pub async fn send(&self, mut request: ApiRequest) -> GymResult<ApiResponse> {
        let sent_with = self.inner.tokens.access_token()?;
        request.bearer = sent_with.clone();

        let resp = self.inner.transport.send(&request).await?;
        if resp.status != 401 {
            return ensure_success(resp);
        }

        let detail = resp
            .error_detail()
            .unwrap_or_else(|| "Not authenticated".to_string());

        if request.skip_auth_redirect && is_kiosk_failure(&detail) {
            tracing::warn!(path = %request.path, detail = %detail, "kiosk authorization rejected");
            return Err(GymError::Unauthorized(detail));
        }
        if request.is_auth_endpoint() {
            return Err(GymError::Unauthorized(detail));
        }

        let fresh = self.refresh_once(sent_with.as_deref()).await?;
        request.bearer = Some(fresh);

        tracing::debug!(path = %request.path, "retrying after refresh");
        let retry = self.inner.transport.send(&request).await?;
        if retry.status == 401 {
            let detail = retry
                .error_detail()
                .unwrap_or_else(|| "Not authenticated".to_string());
            return Err(GymError::Unauthorized(detail));
        }
        ensure_success(retry)
    }

    /// Sends and unwraps the `{ "data": ... }` envelope.
    pub async fn send_data<T: DeserializeOwned>(&self, request: ApiRequest) -> GymResult<T> {
        let resp = self.send(request).await?;
        Ok(resp.json::<Envelope<T>>()?.data)
    }

    pub async fn get_data<T: DeserializeOwned>(&self, path: &str) -> GymResult<T> {
        self.send_data(ApiRequest::get(path)).await
    }

    pub async fn post_data<B, T>(&self, path: &str, body: &B) -> GymResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_data(ApiRequest::post(path).json(body)?).await
    }

    /// Returns a usable access token, refreshing unless another caller
    /// already replaced `stale`.
    async fn refresh_once(&self, stale: Option<&str>) -> GymResult<String> {
        let _gate = self.inner.refresh_gate.lock().await;

        let current = self.inner.tokens.access_token()?;
        if current.as_deref() != stale {
            // Someone else finished a refresh (or a logout) while we waited.
            return current.ok_or(GymError::SessionExpired);
        }

        match self.exchange_refresh_token().await {
            Ok(access) => {
                tracing::info!("access token refreshed");
                self.publish(SessionEvent::Refreshed);
                Ok(access)
            }
            Err(e) => {
                tracing::warn!(error = %e, "token refresh failed, ending session");
                self.expire()?;
                Err(GymError::SessionExpired)
            }
        }
    }

    async fn exchange_refresh_token(&self) -> GymResult<String> {
        let refresh = self
            .inner
            .tokens
            .refresh_token()?
            .ok_or_else(|| GymError::Unauthorized("no refresh token".into()))?;

        let request = ApiRequest::post(REFRESH_PATH).json(&RefreshRequest {
            refresh_token: &refresh,
        })?;
        let resp = self.send_anonymous(&request).await?;
        let body = resp.json::<Envelope<RefreshResponse>>()?.data;

        let rotated = body.refresh_token.as_deref().unwrap_or(&refresh);
        self.inner.tokens.set_tokens(&body.access_token, rotated)?;
        Ok(body.access_token)
    }

    /// Drops the session and tells listeners to go to the login screen.
    fn expire(&self) -> GymResult<()> {
        self.inner.tokens.clear_tokens()?;
        self.publish(SessionEvent::Expired {
            redirect_to: LOGIN_ROUTE.to_string(),
        });
        Ok(())
    }
}

fn ensure_success(resp: ApiResponse) -> GymResult<ApiResponse> {
    if resp.is_success() {
        Ok(resp)
    } else {
        Err(resp.into_error())
    }
}

fn is_kiosk_failure(detail: &str) -> bool {
    detail.to_ascii_lowercase().contains("kiosk")
}
