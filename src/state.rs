//! Shared client state.
//!
//! Holds the pieces every service works with: configuration, the token
//! store, the authenticated request client and the query cache.

use std::sync::Arc;

use crate::cache::QueryCache;
use crate::client::ApiClient;
use crate::config::ConfigV1;
use crate::services::{AuthService, TodoService};
use crate::store::TokenStore;

/// A wired-up client session.
///
/// Cloning is cheap; clones share the token store, connection pool and cache.
#[derive(Clone)]
pub struct Session {
    /// Configuration the session was built from.
    pub config: Arc<ConfigV1>,
    /// Where the access/refresh token pair is kept.
    pub store: Arc<dyn TokenStore>,
    /// Request client attaching and renewing the bearer token.
    pub api: ApiClient,
    /// Cache of server reads shared by all services.
    pub cache: QueryCache,
}

impl Session {
    pub fn auth(&self) -> AuthService {
        AuthService::new(self.api.clone(), self.cache.clone())
    }

    pub fn todos(&self) -> TodoService {
        TodoService::new(self.api.clone(), self.cache.clone())
    }
}
