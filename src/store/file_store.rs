use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::TokenStore;
use crate::models::SessionTokens;

/// Durable token slot backed by a JSON file.
///
/// The file is read once on open and written through on every change, so
/// reads never touch the disk. Changes are serialised so the file and the
/// in-memory copy always agree. On unix the file is readable by its owner only.
pub struct FileTokenStore {
    path: PathBuf,
    tokens: RwLock<Option<SessionTokens>>,
    write_lock: Mutex<()>,
}

impl FileTokenStore {
    /// Opens the store, loading any tokens left by a previous run.
    /// An unreadable token file is treated as an empty session.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref().to_path_buf();
        let tokens = match fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<SessionTokens>(&bytes) {
                Ok(tokens) => Some(tokens),
                Err(e) => {
                    warn!(
                        "Ignoring malformed token file '{}': {}",
                        path.display(),
                        e
                    );
                    None
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                return Err(format!(
                    "Error reading token file '{}': {}",
                    path.display(),
                    e
                ))
            }
        };
        debug!(
            "Opened token file '{}' (session present: {})",
            path.display(),
            tokens.is_some()
        );
        Ok(FileTokenStore {
            path,
            tokens: RwLock::new(tokens),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("tokens"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Writes `tokens` to a temporary file and renames it over the token file.
    async fn persist(&self, tokens: &SessionTokens) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    format!("Error creating directory '{}': {}", parent.display(), e)
                })?;
            }
        }
        let body = serde_json::to_vec(tokens).map_err(|e| format!("Error encoding tokens: {}", e))?;
        let temp = self.temp_path();
        let write_error = |e: std::io::Error| {
            format!("Error writing token file '{}': {}", temp.display(), e)
        };

        // clear a temp file left by an interrupted write
        let _ = fs::remove_file(&temp).await;
        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options.open(&temp).await.map_err(write_error)?;
        file.write_all(&body).await.map_err(write_error)?;
        file.sync_all().await.map_err(write_error)?;
        drop(file);

        fs::rename(&temp, &self.path).await.map_err(|e| {
            format!("Error replacing token file '{}': {}", self.path.display(), e)
        })
    }

    fn replace(&self, tokens: Option<SessionTokens>) {
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = tokens;
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn get_tokens(&self) -> Option<SessionTokens> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn set_tokens(&self, access_token: &str, refresh_token: &str) -> Result<(), String> {
        let _guard = self.write_lock.lock().await;
        let tokens = SessionTokens::new(access_token, refresh_token);
        self.persist(&tokens).await?;
        self.replace(Some(tokens));
        Ok(())
    }

    async fn clear_tokens(&self) -> Result<(), String> {
        let _guard = self.write_lock.lock().await;
        match fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(format!(
                    "Error removing token file '{}': {}",
                    self.path.display(),
                    e
                ))
            }
        }
        self.replace(None);
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }
}
