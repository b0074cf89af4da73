//! Session construction.
//!
//! Builds the token store, request client and cache from configuration and
//! wires them into a [`Session`].

use std::sync::Arc;

use tracing::info;

use crate::cache::QueryCache;
use crate::client::{ApiClient, LoggingNavigator, Navigator};
use crate::config::ConfigV1;
use crate::error::{ClientError, Result};
use crate::state::Session;
use crate::store::create_token_store;

/// Builds a session whose expiry redirects are only logged.
pub async fn build_session(config: Arc<ConfigV1>) -> Result<Session> {
    let navigator = Arc::new(LoggingNavigator::new(config.auth.login_route.clone()));
    build_session_with_navigator(config, navigator).await
}

/// Builds a session that reports expiry redirects to `navigator`.
///
/// # Errors
///
/// Returns an error if the token store cannot be opened or the HTTP client
/// cannot be constructed.
pub async fn build_session_with_navigator(
    config: Arc<ConfigV1>,
    navigator: Arc<dyn Navigator>,
) -> Result<Session> {
    let store = create_token_store(&config.token_store)
        .await
        .map_err(ClientError::TokenStore)?;
    let api = ApiClient::new(&config.api, &config.auth, store.clone(), navigator)?;
    let cache = QueryCache::new(&config.cache);

    info!(
        "Session ready against {} (durable tokens: {})",
        config.api.base_url,
        store.is_durable()
    );

    Ok(Session {
        config,
        store,
        api,
        cache,
    })
}
