use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{file_store::FileTokenStore, memory_store::MemoryTokenStore};
use crate::config::TokenStoreConfig;
use crate::models::SessionTokens;

/// The TokenStore trait abstracts where the session tokens are kept.
///
/// Concurrent writers are last-write-wins; token contents are never inspected.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get_tokens(&self) -> Option<SessionTokens>;
    async fn set_tokens(&self, access_token: &str, refresh_token: &str) -> Result<(), String>;
    /// Clearing an empty store succeeds.
    async fn clear_tokens(&self) -> Result<(), String>;

    async fn access_token(&self) -> Option<String> {
        self.get_tokens().await.map(|t| t.access_token)
    }

    async fn refresh_token(&self) -> Option<String> {
        self.get_tokens().await.map(|t| t.refresh_token)
    }

    /// Whether tokens outlive the process.
    fn is_durable(&self) -> bool {
        false
    }
}

/// Creates a concrete token store based on the TokenStoreConfig.
pub async fn create_token_store(config: &TokenStoreConfig) -> Result<Arc<dyn TokenStore>, String> {
    match config {
        TokenStoreConfig::Memory => {
            info!("Keeping session tokens in memory.");
            Ok(Arc::new(MemoryTokenStore::new()))
        }
        TokenStoreConfig::File(file_config) => {
            let store = FileTokenStore::open(&file_config.path).await?;
            info!(
                "Keeping session tokens in file '{}'.",
                file_config.path.display()
            );
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileTokenStoreConfig;

    #[tokio::test]
    async fn test_create_memory_store() {
        let store = create_token_store(&TokenStoreConfig::Memory).await.unwrap();
        assert!(!store.is_durable());
        assert_eq!(store.get_tokens().await, None);
    }

    #[tokio::test]
    async fn test_create_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = TokenStoreConfig::File(FileTokenStoreConfig {
            path: dir.path().join("tokens.json"),
        });
        let store = create_token_store(&config).await.unwrap();
        assert!(store.is_durable());
        store.set_tokens("a", "r").await.unwrap();
        assert_eq!(store.access_token().await.as_deref(), Some("a"));
        assert_eq!(store.refresh_token().await.as_deref(), Some("r"));
    }
}
