use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use jiff::Timestamp;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::errors::Error;

use super::{AccessToken, TokenRecord};

/// Persistent home of the current token record.
///
/// Every method is atomic from the caller's point of view: a reader sees
/// either the whole previous record or the whole new one.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn record(&self) -> Result<Option<TokenRecord>, Error>;

    async fn get_token(&self) -> Result<Option<AccessToken>, Error> {
        Ok(self.record().await?.map(|record| record.token))
    }

    async fn get_issued_at(&self) -> Result<Option<Timestamp>, Error> {
        Ok(self.record().await?.map(|record| record.issued_at))
    }

    /// Stores `token` stamped with the store's current time.
    async fn set_token_with_timestamp(&self, token: AccessToken) -> Result<TokenRecord, Error>;

    /// Clears token and timestamp together. Removing an absent record succeeds.
    async fn remove_token(&self) -> Result<(), Error>;
}

pub struct MemoryTokenStore {
    record: RwLock<Option<TokenRecord>>,
    clock: Arc<dyn Clock>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            record: RwLock::new(None),
            clock,
        }
    }

    /// Seeds the store with an existing record, e.g. one issued at a chosen time.
    pub fn with_record(self, record: TokenRecord) -> Self {
        Self {
            record: RwLock::new(Some(record)),
            clock: self.clock,
        }
    }
}

impl Default for MemoryTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn record(&self) -> Result<Option<TokenRecord>, Error> {
        Ok(self.record.read().await.clone())
    }

    async fn set_token_with_timestamp(&self, token: AccessToken) -> Result<TokenRecord, Error> {
        let record = TokenRecord::new(token, self.clock.now());
        *self.record.write().await = Some(record.clone());
        Ok(record)
    }

    async fn remove_token(&self) -> Result<(), Error> {
        *self.record.write().await = None;
        Ok(())
    }
}

/// Keeps the token record in a JSON file readable only by the owner.
pub struct FileTokenStore {
    path: PathBuf,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_clock(path, Arc::new(SystemClock))
    }

    pub fn with_clock(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            clock,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "token".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn write_record(&self, record: &TokenRecord) -> Result<(), Error> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let temp = self.temp_path();
        tokio::fs::write(&temp, serde_json::to_vec(record)?).await?;
        restrict_permissions(&temp).await?;
        // rename replaces the old file in one step
        tokio::fs::rename(&temp, &self.path).await?;
        Ok(())
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> Result<(), Error> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> Result<(), Error> {
    Ok(())
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn record(&self) -> Result<Option<TokenRecord>, Error> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn set_token_with_timestamp(&self, token: AccessToken) -> Result<TokenRecord, Error> {
        let _guard = self.write_lock.lock().await;
        let record = TokenRecord::new(token, self.clock.now());
        self.write_record(&record).await?;
        debug!(path = %self.path.display(), "token.stored");
        Ok(record)
    }

    async fn remove_token(&self) -> Result<(), Error> {
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "token.removed");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
