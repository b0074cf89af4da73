#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use todoclient::client::Navigator;
use todoclient::config::{ApiConfig, CacheConfig, ConfigV1, TokenStoreConfig};
use todoclient::startup::build_session_with_navigator;
use todoclient::Session;

/// Navigator that counts redirects to the login route.
#[derive(Default)]
pub struct RecordingNavigator {
    redirects: AtomicUsize,
}

impl RecordingNavigator {
    pub fn redirects(&self) -> usize {
        self.redirects.load(Ordering::SeqCst)
    }
}

impl Navigator for RecordingNavigator {
    fn redirect_to_login(&self) {
        self.redirects.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn test_config(base_url: String, token_store: TokenStoreConfig) -> ConfigV1 {
    ConfigV1 {
        api: ApiConfig {
            base_url,
            timeout_in_ms: 2000,
        },
        token_store,
        cache: CacheConfig {
            retry: 0,
            ..CacheConfig::default()
        },
        ..ConfigV1::default()
    }
}

pub async fn build_test_session(
    base_url: String,
    token_store: TokenStoreConfig,
) -> (Session, Arc<RecordingNavigator>) {
    let navigator = Arc::new(RecordingNavigator::default());
    let session = build_session_with_navigator(
        Arc::new(test_config(base_url, token_store)),
        navigator.clone(),
    )
    .await
    .expect("session should build");
    (session, navigator)
}

pub fn todo_json(id: &str, title: &str, completed: bool) -> Value {
    json!({
        "id": id,
        "title": title,
        "description": "",
        "completed": completed,
        "createdAt": "2024-05-01T10:00:00Z",
        "updatedAt": "2024-05-01T10:05:00Z"
    })
}

pub fn list_json(todos: &[Value]) -> String {
    json!({ "todos": todos }).to_string()
}
