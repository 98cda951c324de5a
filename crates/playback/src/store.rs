//! Position store adapter and key-value backends
//!
//! The durable store is an opaque async get/set of byte values. Two keys are
//! used: the last opened book as JSON and the last position as a JSON integer
//! of milliseconds.

use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use storyplayer_core::BookDescriptor;
use tempfile::NamedTempFile;
use tokio::sync::{Mutex, RwLock};

pub const LAST_BOOK_KEY: &str = "lastAddedBook";
pub const LAST_POSITION_KEY: &str = "lastPlaybackPosition";

/// Asynchronous durable key-value store
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    async fn set(&self, key: &str, value: Vec<u8>) -> StoreResult<()>;
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

/// Store backed by a single JSON document of string values
///
/// Every write rewrites the whole document through a temporary file in the
/// same directory, so a crash leaves either the old or the new document.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

type Document = BTreeMap<String, String>;

fn read_document(path: &Path) -> StoreResult<Document> {
    match std::fs::read_to_string(path) {
        Ok(contents) if contents.trim().is_empty() => Ok(Document::new()),
        Ok(contents) => Ok(serde_json::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Document::new()),
        Err(e) => Err(e.into()),
    }
}

fn write_document(path: &Path, document: &Document) -> StoreResult<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut temp_file = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut temp_file, document)?;
    temp_file.flush()?;
    temp_file.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

async fn blocking<T, F>(task: F) -> StoreResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> StoreResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| StoreError::Backend(format!("store task failed: {}", e)))?
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let path = self.path.clone();
        let document = blocking(move || read_document(&path)).await?;
        Ok(document.get(key).map(|value| value.clone().into_bytes()))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        let value = String::from_utf8(value)
            .map_err(|_| StoreError::Serialization(format!("value for {} is not UTF-8", key)))?;

        let _guard = self.write_lock.lock().await;
        let path = self.path.clone();
        let key = key.to_string();
        blocking(move || {
            let mut document = read_document(&path)?;
            document.insert(key, value);
            write_document(&path, &document)
        })
        .await
    }
}

/// The durable record restored across process restarts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedPlaybackState {
    pub last_book: Option<BookDescriptor>,
    pub last_position_ms: u64,
}

/// Reads and writes the last book and position
#[derive(Clone)]
pub struct PositionStore {
    backend: Arc<dyn KeyValueStore>,
}

impl PositionStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileStore::new(path)))
    }

    /// Records `book` at `position_ms`
    pub async fn save(&self, book: &BookDescriptor, position_ms: u64) -> StoreResult<()> {
        self.backend
            .set(LAST_BOOK_KEY, serde_json::to_vec(book)?)
            .await?;
        self.backend
            .set(LAST_POSITION_KEY, serde_json::to_vec(&position_ms)?)
            .await
    }

    /// Records a newly added book, starting it from the beginning
    pub async fn remember_book(&self, book: &BookDescriptor) -> StoreResult<()> {
        self.save(book, 0).await
    }

    /// The last saved book and position, if a book was ever saved
    pub async fn load(&self) -> StoreResult<Option<(BookDescriptor, u64)>> {
        let state = self.load_state().await?;
        Ok(state
            .last_book
            .map(|book| (book, state.last_position_ms)))
    }

    pub async fn load_state(&self) -> StoreResult<PersistedPlaybackState> {
        let last_book = match self.backend.get(LAST_BOOK_KEY).await? {
            Some(bytes) => Some(serde_json::from_slice::<BookDescriptor>(&bytes)?),
            None => None,
        };

        let last_position_ms = match self.backend.get(LAST_POSITION_KEY).await? {
            Some(bytes) => serde_json::from_slice::<u64>(&bytes)?,
            None => 0,
        };

        Ok(PersistedPlaybackState {
            last_book,
            last_position_ms,
        })
    }
}
