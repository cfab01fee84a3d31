use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{trace, warn};

pub const HISTORY_KEY: &str = "testHistory";
pub const LAYOUT_SETTINGS_KEY: &str = "layoutSettings";
pub const THEME_KEY: &str = "theme";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Storage document {0} is not a JSON object")]
    InvalidDocument(String),
    #[error("Storage unavailable")]
    Unavailable,
}

/// Keyed JSON persistence shared by history and preferences.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError>;
    async fn save(&self, key: &str, value: Value) -> Result<(), StorageError>;
}

/// All keys live in a single JSON object on disk.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<Map<String, Value>, StorageError> {
        let contents = match tokio::fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(error) => return Err(error.into()),
        };

        match serde_json::from_slice(&contents)? {
            Value::Object(document) => Ok(document),
            _ => Err(StorageError::InvalidDocument(
                self.path.display().to_string(),
            )),
        }
    }

    /// Moves an unreadable document aside so the next write starts fresh.
    async fn quarantine(&self, reason: &StorageError) -> Result<(), StorageError> {
        let corrupt_path = self.path.with_extension("json.corrupt");
        warn!(
            "Replacing unreadable {} ({reason}), previous contents kept in {}",
            self.path.display(),
            corrupt_path.display()
        );
        tokio::fs::rename(&self.path, &corrupt_path).await?;
        Ok(())
    }

    async fn write_document(&self, document: Map<String, Value>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let bytes = serde_json::to_vec_pretty(&Value::Object(document))?;
        let temp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, bytes).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let _guard = self.lock.lock().await;
        let mut document = self.read_document().await?;
        Ok(document.remove(key))
    }

    async fn save(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut document = match self.read_document().await {
            Ok(document) => document,
            Err(error @ (StorageError::Serialization(_) | StorageError::InvalidDocument(_))) => {
                self.quarantine(&error).await?;
                Map::new()
            }
            Err(error) => return Err(error),
        };
        document.insert(key.to_owned(), value);
        self.write_document(document).await?;
        trace!("Saved key {key} to {}", self.path.display());
        Ok(())
    }
}

/// In-process store, optionally failing every call.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable);
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        self.check_available()?;
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn save(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.check_available()?;
        self.values.lock().await.insert(key.to_owned(), value);
        Ok(())
    }
}
