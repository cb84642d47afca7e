//! Single-slot bearer token storage.
//!
//! Only the session manager writes to a store; the transport reads it
//! before each request.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use crate::error::ClientError;

/// Fixed storage key of the bearer token.
pub const TOKEN_KEY: &str = "token";

/// Short prefix of a token, safe to put in logs.
pub(crate) fn redact(token: &str) -> String {
    let prefix: String = token.chars().take(8).collect();
    format!("{}…", prefix)
}

/// Persistent storage for one opaque token string.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Read the stored token, if any.
    async fn get(&self) -> Result<Option<String>, ClientError>;

    /// Replace the stored token.
    async fn set(&self, token: &str) -> Result<(), ClientError>;

    /// Remove the stored token. Succeeds when nothing is stored.
    async fn clear(&self) -> Result<(), ClientError>;
}

/// Token kept in a file named after [`TOKEN_KEY`] inside a data directory.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(TOKEN_KEY),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn get(&self) -> Result<Option<String>, ClientError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                // Only a trailing newline is stripped.
                let token = content.trim_end_matches(|c| c == '\n' || c == '\r');
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, token: &str) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Write-then-rename so a reader never sees a half-written token.
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, token).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        tracing::debug!(path = %self.path.display(), "Token stored");
        Ok(())
    }

    async fn clear(&self) -> Result<(), ClientError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "Token removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local token store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slot: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a token.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            slot: RwLock::new(Some(token.into())),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get(&self) -> Result<Option<String>, ClientError> {
        Ok(self.slot.read().await.clone())
    }

    async fn set(&self, token: &str) -> Result<(), ClientError> {
        *self.slot.write().await = Some(token.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<(), ClientError> {
        *self.slot.write().await = None;
        Ok(())
    }
}
