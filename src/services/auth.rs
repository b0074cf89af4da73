use std::time::Duration;

use tracing::{info, warn};
use validator::Validate;

use crate::cache::{QueryCache, QueryKey, QueryOptions};
use crate::client::{ApiClient, ApiRequest};
use crate::error::{ClientError, Result};
use crate::models::{Credentials, Registration, SessionTokens, User};

pub const LOGIN_PATH: &str = "/api/login";
pub const REGISTER_PATH: &str = "/api/register";
pub const LOGOUT_PATH: &str = "/api/logout";
pub const ME_PATH: &str = "/api/me";

const USER_STALE_TIME: Duration = Duration::from_secs(5 * 60);

/// Login, registration, logout and the current-user lookup.
#[derive(Clone)]
pub struct AuthService {
    api: ApiClient,
    cache: QueryCache,
}

impl AuthService {
    pub fn new(api: ApiClient, cache: QueryCache) -> Self {
        AuthService { api, cache }
    }

    /// Exchange credentials for a token pair and start a session with it.
    pub async fn login(&self, credentials: &Credentials) -> Result<SessionTokens> {
        credentials.validate()?;
        let request = ApiRequest::post(LOGIN_PATH).json(credentials)?.public();
        let tokens = self
            .start_session(request)
            .await
            .inspect_err(|e| warn!("Login failed: {}", e))?;
        info!(username = credentials.username.as_str(), "logged in");
        Ok(tokens)
    }

    /// Create an account and start a session with the returned tokens.
    pub async fn register(&self, registration: &Registration) -> Result<SessionTokens> {
        registration.validate()?;
        let request = ApiRequest::post(REGISTER_PATH).json(registration)?.public();
        let tokens = self
            .start_session(request)
            .await
            .inspect_err(|e| warn!("Registration failed: {}", e))?;
        info!(username = registration.username.as_str(), "registered");
        Ok(tokens)
    }

    async fn start_session(&self, request: ApiRequest) -> Result<SessionTokens> {
        self.cache
            .write(&[QueryKey::User], async {
                let tokens: SessionTokens = self.api.fetch_json(request).await?;
                self.api
                    .store()
                    .set_tokens(&tokens.access_token, &tokens.refresh_token)
                    .await
                    .map_err(ClientError::TokenStore)?;
                Ok(tokens)
            })
            .await
    }

    /// End the session. Tokens and cached reads are dropped even when the
    /// server call fails; that failure is still returned.
    pub async fn logout(&self) -> Result<()> {
        let result = self.api.fetch_empty(ApiRequest::post(LOGOUT_PATH)).await;
        if let Err(e) = &result {
            warn!("Logout failed: {}", e);
        }
        let cleared = self.api.store().clear_tokens().await;
        self.cache.clear();
        cleared.map_err(ClientError::TokenStore)?;
        info!("logged out");
        result
    }

    /// The user behind the current token, or `None` when no session is held.
    pub async fn current_user(&self) -> Result<Option<User>> {
        if self.api.store().access_token().await.is_none() {
            return Ok(None);
        }
        let api = self.api.clone();
        let options = QueryOptions::default().stale_time(USER_STALE_TIME).retry(0);
        let user = self
            .cache
            .read(QueryKey::User, options, move || {
                let api = api.clone();
                async move { api.fetch_json::<User>(ApiRequest::get(ME_PATH)).await }
            })
            .await?;
        Ok(Some(user))
    }

    pub async fn is_authenticated(&self) -> bool {
        matches!(self.current_user().await, Ok(Some(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LoggingNavigator;
    use crate::config::{ApiConfig, AuthConfig, CacheConfig};
    use crate::store::{MemoryTokenStore, TokenStore};
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::sync::Arc;

    const USER_BODY: &str =
        r#"{"id": "u1", "email": "alice@example.com", "firstName": "Alice", "lastName": "Smith"}"#;

    fn service(url: String) -> (AuthService, Arc<MemoryTokenStore>) {
        let store = Arc::new(MemoryTokenStore::new());
        let api = ApiClient::new(
            &ApiConfig {
                base_url: url,
                ..ApiConfig::default()
            },
            &AuthConfig::default(),
            store.clone(),
            Arc::new(LoggingNavigator::new("/login")),
        )
        .unwrap();
        let cache = QueryCache::new(&CacheConfig::default());
        (AuthService::new(api, cache), store)
    }

    #[tokio::test]
    async fn test_login_stores_tokens() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", LOGIN_PATH)
            .match_body(Matcher::Json(json!({"username": "alice", "password": "secret1"})))
            .with_status(200)
            .with_body(r#"{"accessToken": "a1", "refreshToken": "r1"}"#)
            .create_async()
            .await;

        let (auth, store) = service(server.url());
        let tokens = auth
            .login(&Credentials::new("alice", "secret1"))
            .await
            .unwrap();

        m.assert_async().await;
        assert_eq!(tokens, SessionTokens::new("a1", "r1"));
        assert_eq!(store.access_token().await.as_deref(), Some("a1"));
        assert_eq!(store.refresh_token().await.as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn test_invalid_credentials_send_nothing() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", LOGIN_PATH)
            .expect(0)
            .create_async()
            .await;

        let (auth, store) = service(server.url());
        let err = auth.login(&Credentials::new("al", "")).await.unwrap_err();

        m.assert_async().await;
        match err {
            ClientError::Validation(errors) => {
                assert!(errors.field_errors().contains_key("username"));
                assert!(errors.field_errors().contains_key("password"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
        assert_eq!(store.get_tokens().await, None);
    }

    #[tokio::test]
    async fn test_rejected_login_keeps_store_empty() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", LOGIN_PATH)
            .with_status(401)
            .with_body(r#"{"error": "Invalid credentials"}"#)
            .create_async()
            .await;

        let (auth, store) = service(server.url());
        let err = auth
            .login(&Credentials::new("alice", "wrong-password"))
            .await
            .unwrap_err();

        assert!(err.is_unauthorized());
        assert!(!matches!(err, ClientError::SessionExpired));
        assert_eq!(store.get_tokens().await, None);
    }

    #[tokio::test]
    async fn test_register_sends_username_and_password() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", REGISTER_PATH)
            .match_body(Matcher::Json(json!({"username": "bob", "password": "secret1"})))
            .with_status(201)
            .with_body(r#"{"accessToken": "a2", "refreshToken": "r2"}"#)
            .create_async()
            .await;

        let (auth, store) = service(server.url());
        auth.register(&Registration::new("bob", "secret1", "secret1"))
            .await
            .unwrap();

        m.assert_async().await;
        assert_eq!(store.access_token().await.as_deref(), Some("a2"));
    }

    #[tokio::test]
    async fn test_current_user_without_session_skips_request() {
        let mut server = Server::new_async().await;
        let m = server.mock("GET", ME_PATH).expect(0).create_async().await;

        let (auth, _) = service(server.url());
        assert_eq!(auth.current_user().await.unwrap(), None);
        assert!(!auth.is_authenticated().await);
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_current_user_is_cached() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", ME_PATH)
            .match_header("authorization", "Bearer a1")
            .with_status(200)
            .with_body(USER_BODY)
            .expect(1)
            .create_async()
            .await;

        let (auth, store) = service(server.url());
        store.set_tokens("a1", "r1").await.unwrap();

        let first = auth.current_user().await.unwrap().unwrap();
        let second = auth.current_user().await.unwrap().unwrap();

        m.assert_async().await;
        assert_eq!(first, second);
        assert_eq!(first.email, "alice@example.com");
        assert!(auth.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_logout_clears_session_even_on_failure() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", LOGOUT_PATH)
            .with_status(500)
            .create_async()
            .await;

        let (auth, store) = service(server.url());
        store.set_tokens("a1", "r1").await.unwrap();

        let result = auth.logout().await;

        assert!(result.is_err());
        assert_eq!(store.get_tokens().await, None);
    }

    struct StuckStore;

    #[async_trait::async_trait]
    impl TokenStore for StuckStore {
        async fn get_tokens(&self) -> Option<SessionTokens> {
            Some(SessionTokens::new("a1", "r1"))
        }

        async fn set_tokens(&self, _: &str, _: &str) -> Result<(), String> {
            Ok(())
        }

        async fn clear_tokens(&self) -> Result<(), String> {
            Err("disk is read-only".to_string())
        }
    }

    #[tokio::test]
    async fn test_logout_drops_cache_when_store_fails() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", ME_PATH)
            .with_status(200)
            .with_body(USER_BODY)
            .create_async()
            .await;
        server
            .mock("POST", LOGOUT_PATH)
            .with_status(204)
            .create_async()
            .await;

        let api = ApiClient::new(
            &ApiConfig {
                base_url: server.url(),
                ..ApiConfig::default()
            },
            &AuthConfig::default(),
            Arc::new(StuckStore),
            Arc::new(LoggingNavigator::new("/login")),
        )
        .unwrap();
        let cache = QueryCache::new(&CacheConfig::default());
        let auth = AuthService::new(api, cache.clone());
        auth.current_user().await.unwrap();
        assert!(cache.peek::<User>(&QueryKey::User).is_some());

        let err = auth.logout().await.unwrap_err();

        assert!(matches!(err, ClientError::TokenStore(ref m) if m == "disk is read-only"));
        assert_eq!(cache.peek::<User>(&QueryKey::User), None);
    }
}
