use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use super::TokenStore;
use crate::models::SessionTokens;

/// Volatile token slot. Tokens are lost when the process exits.
#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<Option<SessionTokens>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that starts out holding the given pair.
    pub fn with_tokens(tokens: SessionTokens) -> Self {
        MemoryTokenStore {
            tokens: RwLock::new(Some(tokens)),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get_tokens(&self) -> Option<SessionTokens> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn set_tokens(&self, access_token: &str, refresh_token: &str) -> Result<(), String> {
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) =
            Some(SessionTokens::new(access_token, refresh_token));
        Ok(())
    }

    async fn clear_tokens(&self) -> Result<(), String> {
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
