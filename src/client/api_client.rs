use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::navigator::Navigator;
use super::request::ApiRequest;
use crate::config::{ApiConfig, AuthConfig, RefreshMode};
use crate::error::{ClientError, Result};
use crate::models::SessionTokens;
use crate::store::TokenStore;

pub const REFRESH_TOKEN_PATH: &str = "/api/refresh-token";

struct Inner {
    http: reqwest::Client,
    base_url: String,
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    refresh_mode: RefreshMode,
    refresh_lock: Mutex<()>,
}

/// HTTP client that attaches the session's bearer token and transparently
/// renews it once when a request is rejected with 401.
///
/// Cloning is cheap; clones share the connection pool, token store and
/// refresh lock.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

impl ApiClient {
    pub fn new(
        api: &ApiConfig,
        auth: &AuthConfig,
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let http = reqwest::Client::builder()
            .timeout(api.timeout())
            .default_headers(headers)
            .build()?;

        info!(
            "Creating API client for '{}' (refresh mode: {:?})",
            api.base_url, auth.refresh_mode
        );
        Ok(ApiClient {
            inner: Arc::new(Inner {
                http,
                base_url: api.base_url.trim_end_matches('/').to_string(),
                store,
                navigator,
                refresh_mode: auth.refresh_mode,
                refresh_lock: Mutex::new(()),
            }),
        })
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.inner.store
    }

    /// Send a request and decode its JSON response.
    pub async fn fetch_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let response = self.execute(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// Send a request whose response body is of no interest.
    pub async fn fetch_empty(&self, request: ApiRequest) -> Result<()> {
        self.execute(request).await.map(|_| ())
    }

    /// Send a request, running the refresh-and-retry flow on a first 401.
    ///
    /// Any non-success status left after that is returned as an error.
    pub async fn execute(&self, mut request: ApiRequest) -> Result<Response> {
        let token = self.inner.store.access_token().await;
        let response = self.dispatch(&request, token.as_deref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED
            || request.retried
            || !request.reauthenticate
        {
            return check_status(response).await;
        }

        request.retried = true;
        debug!(
            path = request.path.as_str(),
            "request rejected with 401, renewing session"
        );
        let access_token = self.reauthenticate(token.as_deref()).await?;
        let response = self.dispatch(&request, Some(&access_token)).await?;
        check_status(response).await
    }

    async fn dispatch(&self, request: &ApiRequest, token: Option<&str>) -> Result<Response> {
        let url = format!("{}{}", self.inner.base_url, request.path);
        debug!(
            method = %request.method,
            path = request.path.as_str(),
            retried = request.retried,
            authenticated = token.is_some(),
            "sending API request"
        );

        let mut builder = self.inner.http.request(request.method.clone(), &url);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        Ok(builder.send().await?)
    }

    /// Obtain a usable access token after `rejected` was refused.
    ///
    /// In single-flight mode refreshes are serialised; a caller that finds the
    /// stored token already differs from the one it sent reuses it, and one
    /// that finds the store emptied gives up without redirecting again.
    async fn reauthenticate(&self, rejected: Option<&str>) -> Result<String> {
        let _guard = match self.inner.refresh_mode {
            RefreshMode::SingleFlight => {
                let guard = self.inner.refresh_lock.lock().await;
                match self.inner.store.access_token().await {
                    Some(current) if rejected != Some(current.as_str()) => {
                        debug!("access token already renewed by a concurrent request");
                        return Ok(current);
                    }
                    // the session was ended while we waited; it is already cleared
                    None if rejected.is_some() => {
                        debug!("session already expired by a concurrent request");
                        return Err(ClientError::SessionExpired);
                    }
                    _ => {}
                }
                Some(guard)
            }
            RefreshMode::Independent => None,
        };

        let Some(refresh_token) = self.inner.store.refresh_token().await else {
            return Err(self.expire_session("no refresh token available").await);
        };

        match self.refresh(&refresh_token).await {
            Ok(tokens) => {
                self.inner
                    .store
                    .set_tokens(&tokens.access_token, &tokens.refresh_token)
                    .await
                    .map_err(ClientError::TokenStore)?;
                info!("Session tokens refreshed");
                Ok(tokens.access_token)
            }
            Err(e) => Err(self.expire_session(&e).await),
        }
    }

    /// Calls the refresh endpoint directly, bypassing the bearer header and
    /// the retry flow.
    async fn refresh(&self, refresh_token: &str) -> Result<SessionTokens, String> {
        let url = format!("{}{}", self.inner.base_url, REFRESH_TOKEN_PATH);
        let response = self
            .inner
            .http
            .post(&url)
            .json(&json!({ "refreshToken": refresh_token }))
            .send()
            .await
            .map_err(|e| format!("Error sending refresh request: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("Refresh rejected with status {}", response.status()));
        }
        response
            .json::<SessionTokens>()
            .await
            .map_err(|e| format!("Error parsing refresh response: {}", e))
    }

    async fn expire_session(&self, reason: &str) -> ClientError {
        warn!(reason, "session expired, clearing tokens");
        if let Err(e) = self.inner.store.clear_tokens().await {
            error!("Failed to clear session tokens: {}", e);
        }
        self.inner.navigator.redirect_to_login();
        ClientError::SessionExpired
    }
}

/// Turn a non-success response into the matching error.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = error_message(status, &body);
    debug!(status = status.as_u16(), message = message.as_str(), "API error response");
    if status == StatusCode::NOT_FOUND {
        Err(ClientError::NotFound(message))
    } else {
        Err(ClientError::Http { status, message })
    }
}

/// Prefer the API's `error` or `message` field, then the raw body.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for field in ["error", "message"] {
            if let Some(Value::String(message)) = map.get(field) {
                return message.clone();
            }
        }
    }
    let body = body.trim();
    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    } else {
        body.to_string()
    }
}
