//! Bearer-token authorization with one refresh-and-replay per request.
//!
//! `AuthInterceptor` wraps a lower-level `Transport` and is itself a
//! `Transport`. For every request it:
//!
//! 1. attaches `Authorization: Bearer <accessToken>` when a token is stored;
//! 2. sends the request through the wrapped transport;
//! 3. on a 401 for a request that has not been replayed yet, exchanges the
//!    refresh token for a new access token, stores it, and replays the
//!    request once with the new token;
//! 4. when the refresh is impossible or fails, deletes the whole session and
//!    fails with a session-expired error.
//!
//! The refresh call and the replay go straight to the wrapped transport, so
//! neither can re-enter the 401 handling.
//!
//! Refreshes are serialized by a lock. A request that waited for the lock
//! and finds a different access token in the store than the one it was sent
//! with replays using that token instead of refreshing again, so a burst of
//! concurrent 401s costs a single refresh call.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use async_trait::async_trait;

use crate::auth::{session, SessionStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use crate::models::RefreshResponse;

use super::transport::{ApiRequest, ApiResponse, Transport};
use super::ApiError;

/// Token refresh endpoint, relative to the API base URL
pub const REFRESH_PATH: &str = "/users/api/token/refresh/";

/// Where a send outcome leads.
///
/// `Deliver` and `Fail` are terminal. `Refresh` moves the request into the
/// refreshing state, which ends either replayed or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Success: hand the response back unchanged.
    Deliver,
    /// First 401 for this request: refresh and replay.
    Refresh,
    /// Anything else: propagate the error unchanged.
    Fail,
}

/// Decide what to do with the outcome of sending `request`.
pub fn classify(outcome: &Result<ApiResponse, ApiError>, request: &ApiRequest) -> Transition {
    match outcome {
        Ok(_) => Transition::Deliver,
        Err(err) if err.is_unauthorized() && !request.retried => Transition::Refresh,
        Err(_) => Transition::Fail,
    }
}

pub struct AuthInterceptor<T> {
    inner: T,
    store: Arc<dyn SessionStore>,
    refresh_lock: Mutex<()>,
}

impl<T: Transport> AuthInterceptor<T> {
    pub fn new(inner: T, store: Arc<dyn SessionStore>) -> Self {
        Self {
            inner,
            store,
            refresh_lock: Mutex::new(()),
        }
    }

    /// The wrapped transport. Requests sent here are not authorized and
    /// never trigger a refresh.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Outbound hook: attach the stored access token, if there is one.
    async fn authorize(&self, request: &mut ApiRequest) -> Result<(), ApiError> {
        if let Some(token) = self.store.get(ACCESS_TOKEN_KEY).await? {
            request.set_bearer(&token)?;
        }
        Ok(())
    }

    /// Exchange a refresh token for a new access token. Goes straight to the
    /// wrapped transport; stores nothing.
    pub async fn exchange(&self, refresh_token: &str) -> Result<RefreshResponse, ApiError> {
        let request = ApiRequest::post(REFRESH_PATH).with_json(&json!({ "refresh": refresh_token }))?;
        let response = self.inner.send(request).await?;
        response.json::<RefreshResponse>()
    }

    /// Refresh on demand. Failures are returned as-is and leave the stored
    /// session untouched.
    pub async fn refresh_now(&self) -> Result<String, ApiError> {
        let _guard = self.refresh_lock.lock().await;
        let refresh_token = self
            .store
            .get(REFRESH_TOKEN_KEY)
            .await?
            .ok_or_else(ApiError::no_refresh_token)?;
        let refreshed = self.exchange(&refresh_token).await?;
        session::store_refreshed(self.store.as_ref(), &refreshed.access, refreshed.user.as_ref())
            .await?;
        info!("Access token refreshed");
        Ok(refreshed.access)
    }

    /// Obtain a token to replay with after a 401 on a request that was sent
    /// with `sent_with`. Tears the session down when renewal fails.
    async fn renew(&self, sent_with: Option<&str>) -> Result<String, ApiError> {
        let _guard = self.refresh_lock.lock().await;

        if let Some(current) = self.store.get(ACCESS_TOKEN_KEY).await? {
            if sent_with != Some(current.as_str()) {
                debug!("Access token already refreshed by a concurrent request");
                return Ok(current);
            }
        }

        let Some(refresh_token) = self.store.get(REFRESH_TOKEN_KEY).await? else {
            warn!("Unauthorized and no refresh token stored, clearing session");
            self.teardown().await;
            return Err(ApiError::no_refresh_token());
        };

        match self.exchange(&refresh_token).await {
            Ok(refreshed) => {
                session::store_refreshed(
                    self.store.as_ref(),
                    &refreshed.access,
                    refreshed.user.as_ref(),
                )
                .await?;
                info!("Access token refreshed");
                Ok(refreshed.access)
            }
            Err(cause) => {
                warn!(status = ?cause.status, error = %cause, "Token refresh failed, clearing session");
                self.teardown().await;
                Err(ApiError::session_expired(&cause))
            }
        }
    }

    async fn teardown(&self) {
        if let Err(e) = session::clear(self.store.as_ref()).await {
            warn!(error = %e, "Failed to clear session after refresh failure");
        }
    }
}

#[async_trait]
impl<T: Transport> Transport for AuthInterceptor<T> {
    async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.authorize(&mut request).await?;
        let sent_with = request.bearer_token().map(str::to_owned);

        let outcome = self.inner.send(request.clone()).await;
        match classify(&outcome, &request) {
            Transition::Deliver | Transition::Fail => outcome,
            Transition::Refresh => {
                debug!(method = %request.method, path = %request.path, "Unauthorized, refreshing session");
                request.retried = true;
                let token = self.renew(sent_with.as_deref()).await?;
                request.set_bearer(&token)?;
                self.inner.send(request).await
            }
        }
    }
}
