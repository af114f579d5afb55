//! JSON file storage with XDG path support.
//!
//! [`JsonFile`] reads and writes one JSON document atomically (temp file +
//! rename). [`ResultStore`] builds the persistent result cache on top of it:
//! a map of cache key to matching row indices, stored at
//! `~/.cache/gridfilter/results.json` by default.
//!
//! Both synchronous and asynchronous I/O methods are provided:
//! - `save()`, `load()` - Synchronous methods using `std::fs`
//! - `save_async()`, `load_async()` - Asynchronous methods using `tokio::fs`

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

/// Default result store filename.
const RESULTS_FILENAME: &str = "results.json";

/// Application qualifier (for XDG paths).
pub(crate) const QUALIFIER: &str = "";

/// Application organization (for XDG paths).
pub(crate) const ORGANIZATION: &str = "";

/// Application name (for XDG paths).
pub(crate) const APPLICATION: &str = "gridfilter";

/// Default time-to-live of a persisted result.
pub const DEFAULT_PERSISTENT_TTL: Duration = Duration::from_secs(3600);

/// Default maximum number of persisted results.
pub const DEFAULT_PERSISTENT_MAX_ENTRIES: usize = 500;

/// Errors that can occur during file storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to determine an XDG directory.
    #[error("failed to determine storage directory: no valid home directory found")]
    NoStorageDir,

    /// I/O error during file read.
    #[error("failed to read store file '{path}': {source}")]
    ReadError {
        /// The path that failed to read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// I/O error during file write.
    #[error("failed to write store file '{path}': {source}")]
    WriteError {
        /// The path that failed to write.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// I/O error during directory creation.
    #[error("failed to create store directory '{path}': {source}")]
    CreateDirError {
        /// The directory path that failed to create.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// I/O error during file delete.
    #[error("failed to delete store file '{path}': {source}")]
    DeleteError {
        /// The path that failed to delete.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    fn is_not_found(&self) -> bool {
        matches!(self, StoreError::ReadError { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Returns the XDG project directories for gridfilter.
pub(crate) fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION).ok_or(StoreError::NoStorageDir)
}

// ============================================================================
// JsonFile
// ============================================================================

/// A single JSON document on disk.
///
/// File operations are not synchronized; callers that write concurrently
/// must serialize access themselves (as [`ResultStore`] does).
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    /// Creates a handle for the file at `path`. Nothing is read or created.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path to the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if the file exists on disk.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("tmp")
    }

    fn read_error(&self, source: io::Error) -> StoreError {
        StoreError::ReadError {
            path: self.path.clone(),
            source,
        }
    }

    fn delete_result(&self, result: io::Result<()>) -> Result<()> {
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::DeleteError {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    /// Loads the document.
    ///
    /// # Errors
    ///
    /// - Returns `StoreError::ReadError` if the file cannot be read (including
    ///   when it does not exist; see [`load_or_default`](Self::load_or_default)).
    /// - Returns `StoreError::Json` if the file contains invalid JSON.
    pub fn load<T: DeserializeOwned>(&self) -> Result<T> {
        let contents = fs::read_to_string(&self.path).map_err(|e| self.read_error(e))?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Loads the document, returning `T::default()` if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load), except for "file not found".
    pub fn load_or_default<T: DeserializeOwned + Default>(&self) -> Result<T> {
        match self.load() {
            Err(e) if e.is_not_found() => Ok(T::default()),
            other => other,
        }
    }

    /// Saves the document atomically as pretty-printed JSON.
    ///
    /// Creates the parent directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// - Returns `StoreError::CreateDirError` if the directory cannot be created.
    /// - Returns `StoreError::WriteError` if the file cannot be written.
    /// - Returns `StoreError::Json` if serialization fails.
    pub fn save<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::CreateDirError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let json = serde_json::to_string_pretty(value)?;

        let temp_path = self.temp_path();
        fs::write(&temp_path, &json).map_err(|e| StoreError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;
        fs::rename(&temp_path, &self.path).map_err(|e| StoreError::WriteError {
            path: self.path.clone(),
            source: e,
        })?;

        Ok(())
    }

    // =========================================================================
    // Async I/O Methods
    // =========================================================================

    /// Async equivalent of [`load`](Self::load).
    pub async fn load_async<T: DeserializeOwned>(&self) -> Result<T> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| self.read_error(e))?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Async equivalent of [`load_or_default`](Self::load_or_default).
    pub async fn load_or_default_async<T: DeserializeOwned + Default>(&self) -> Result<T> {
        match self.load_async().await {
            Err(e) if e.is_not_found() => Ok(T::default()),
            other => other,
        }
    }

    /// Async equivalent of [`save`](Self::save).
    pub async fn save_async<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::CreateDirError {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        let json = serde_json::to_string_pretty(value)?;

        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, &json)
            .await
            .map_err(|e| StoreError::WriteError {
                path: temp_path.clone(),
                source: e,
            })?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| StoreError::WriteError {
                path: self.path.clone(),
                source: e,
            })?;

        Ok(())
    }

    /// Deletes the file. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DeleteError` if the file cannot be deleted.
    pub async fn delete_async(&self) -> Result<()> {
        self.delete_result(tokio::fs::remove_file(&self.path).await)
    }
}

// ============================================================================
// ResultStore
// ============================================================================

/// One persisted filter result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResult {
    /// Indices of the matching rows.
    pub rows: Vec<usize>,
    /// When the result was written.
    pub timestamp: DateTime<Utc>,
}

impl StoredResult {
    fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        // Timestamps in the future count as fresh.
        let age = (now - self.timestamp).to_std().unwrap_or_default();
        age > ttl
    }
}

/// On-disk layout of the result store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultFile {
    /// Results keyed by cache key.
    #[serde(default)]
    pub entries: HashMap<String, StoredResult>,
}

/// Persistent, TTL-checked cache of filter results.
///
/// Clones share one write lock, so upserts issued from detached tasks are
/// applied one at a time (each is a read-modify-write of the whole file).
///
/// # Example
///
/// ```no_run
/// use gridfilter::store::ResultStore;
///
/// # async fn run() -> Result<(), gridfilter::store::StoreError> {
/// let store = ResultStore::new()?;
/// store.put("key", vec![0, 2, 5]).await?;
/// assert_eq!(store.get("key").await?, Some(vec![0, 2, 5]));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ResultStore {
    file: JsonFile,
    ttl: Duration,
    max_entries: usize,
    lock: Arc<Mutex<()>>,
}

impl ResultStore {
    /// Creates a store at the default XDG cache path.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NoStorageDir` if the home directory cannot be determined.
    pub fn new() -> Result<Self> {
        Ok(Self::with_path(Self::default_path()?))
    }

    /// Creates a store at a custom path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonFile::new(path),
            ttl: DEFAULT_PERSISTENT_TTL,
            max_entries: DEFAULT_PERSISTENT_MAX_ENTRIES,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Sets the time-to-live of stored results.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the maximum number of stored results.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Returns the default path for the result store.
    ///
    /// On Unix: `~/.cache/gridfilter/results.json`
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NoStorageDir` if the home directory cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        Ok(project_dirs()?.cache_dir().join(RESULTS_FILENAME))
    }

    /// Returns the path to the store file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Returns true if the store file exists on disk.
    pub fn exists(&self) -> bool {
        self.file.exists()
    }

    /// Loads the whole store file; a missing file is empty.
    pub fn load(&self) -> Result<ResultFile> {
        self.file.load_or_default()
    }

    /// Looks up a result. Expired entries read as absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn get(&self, key: &str) -> Result<Option<Vec<usize>>> {
        let contents: ResultFile = self.file.load_or_default_async().await?;
        let now = Utc::now();
        Ok(contents
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired(self.ttl, now))
            .map(|entry| entry.rows.clone()))
    }

    /// Inserts or replaces a result.
    ///
    /// Expired entries are pruned on every write and, when over capacity, the
    /// oldest entries by timestamp are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or written.
    pub async fn put(&self, key: impl Into<String>, rows: Vec<usize>) -> Result<()> {
        let _guard = self.lock.lock().await;

        let mut contents: ResultFile = self.file.load_or_default_async().await?;
        let now = Utc::now();
        contents
            .entries
            .retain(|_, entry| !entry.is_expired(self.ttl, now));
        contents.entries.insert(
            key.into(),
            StoredResult {
                rows,
                timestamp: now,
            },
        );

        if contents.entries.len() > self.max_entries {
            let mut by_age: Vec<(String, DateTime<Utc>)> = contents
                .entries
                .iter()
                .map(|(k, v)| (k.clone(), v.timestamp))
                .collect();
            by_age.sort_by_key(|(_, timestamp)| *timestamp);
            let excess = contents.entries.len() - self.max_entries;
            for (key, _) in by_age.into_iter().take(excess) {
                contents.entries.remove(&key);
            }
        }

        self.file.save_async(&contents).await
    }

    /// Deletes the store file.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DeleteError` if the file exists but cannot be deleted.
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.file.delete_async().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    // ==========================================================================
    // JsonFile
    // ==========================================================================

    #[test]
    fn test_default_path_returns_xdg_path() {
        let path = ResultStore::default_path().expect("should get default path");
        let path_str = path.to_string_lossy();

        assert!(
            path_str.contains("gridfilter") && path_str.ends_with("results.json"),
            "path should contain gridfilter and results.json: {}",
            path_str
        );
        assert!(path.is_absolute(), "path should be absolute: {:?}", path);
    }

    #[test]
    fn test_read_error_includes_file_path() {
        let file = JsonFile::new("/nonexistent/path/to/store.json");

        let error = file.load::<ResultFile>().unwrap_err();
        let error_msg = error.to_string();

        assert!(
            error_msg.contains("/nonexistent/path/to/store.json"),
            "error should include file path: {}",
            error_msg
        );
        assert!(
            error_msg.contains("failed to read store file"),
            "error should describe the operation: {}",
            error_msg
        );
    }

    #[test]
    fn test_load_or_default_for_missing_file() {
        let file = JsonFile::new("/nonexistent/path/to/store.json");
        let contents: ResultFile = file.load_or_default().expect("missing file is empty");
        assert!(contents.entries.is_empty());
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let path = temp_dir.path().join("store.json");
        fs::write(&path, "{ not json").expect("failed to write");

        let result = JsonFile::new(&path).load_or_default::<ResultFile>();
        assert!(matches!(result, Err(StoreError::Json(_))));
    }

    #[test]
    fn test_write_error_includes_file_path() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let blocker_file = temp_dir.path().join("blocker");
        fs::write(&blocker_file, "blocking").expect("failed to create blocker file");

        let file = JsonFile::new(blocker_file.join("subdir").join("store.json"));
        let error = file.save(&ResultFile::default()).unwrap_err();
        let error_msg = error.to_string();

        assert!(
            error_msg.contains("failed to create store directory")
                || error_msg.contains("failed to write store file"),
            "error should describe the operation: {}",
            error_msg
        );
        assert!(error_msg.contains("blocker"), "{}", error_msg);
    }

    #[test]
    fn test_error_message_format_delete() {
        let error = StoreError::DeleteError {
            path: PathBuf::from("/home/user/.cache/gridfilter/results.json"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        };

        assert_eq!(
            error.to_string(),
            "failed to delete store file '/home/user/.cache/gridfilter/results.json': permission denied"
        );
    }

    #[tokio::test]
    async fn test_atomic_write_async() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let path = temp_dir.path().join("nested").join("store.json");
        let file = JsonFile::new(&path);

        file.save_async(&ResultFile::default())
            .await
            .expect("save_async failed");

        assert!(path.exists(), "store file should exist");
        assert!(
            !path.with_extension("tmp").exists(),
            "temp file should be cleaned up"
        );
    }

    #[tokio::test]
    async fn test_delete_async_nonexistent() {
        let file = JsonFile::new("/nonexistent/path/to/store.json");
        assert!(file.delete_async().await.is_ok());
    }

    // ==========================================================================
    // ResultStore
    // ==========================================================================

    #[tokio::test]
    async fn test_put_then_get() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let store = ResultStore::with_path(temp_dir.path().join("results.json"));

        store.put("a", vec![1, 4, 9]).await.expect("put failed");

        assert_eq!(store.get("a").await.unwrap(), Some(vec![1, 4, 9]));
        assert_eq!(store.get("b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_on_missing_file_is_none() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let store = ResultStore::with_path(temp_dir.path().join("results.json"));

        assert_eq!(store.get("a").await.unwrap(), None);
        assert!(!store.exists());
    }

    #[tokio::test]
    async fn test_expired_entries_read_as_absent() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let path = temp_dir.path().join("results.json");

        let mut contents = ResultFile::default();
        contents.entries.insert(
            "old".to_string(),
            StoredResult {
                rows: vec![1],
                timestamp: Utc::now() - chrono::Duration::hours(2),
            },
        );
        JsonFile::new(&path).save(&contents).unwrap();

        let store = ResultStore::with_path(&path);
        assert_eq!(store.get("old").await.unwrap(), None);

        // The next write prunes it from disk.
        store.put("new", vec![2]).await.unwrap();
        assert!(!store.load().unwrap().entries.contains_key("old"));
    }

    #[tokio::test]
    async fn test_put_caps_entries() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let store =
            ResultStore::with_path(temp_dir.path().join("results.json")).with_max_entries(2);

        store.put("a", vec![0]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        store.put("b", vec![1]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        store.put("c", vec![2]).await.unwrap();

        let contents = store.load().unwrap();
        assert_eq!(contents.entries.len(), 2);
        assert!(!contents.entries.contains_key("a"));
    }

    #[tokio::test]
    async fn test_concurrent_puts_are_serialized() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let store = ResultStore::with_path(temp_dir.path().join("results.json"));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.put(format!("k{}", i), vec![i]).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.load().unwrap().entries.len(), 8);
    }

    #[tokio::test]
    async fn test_clear_removes_file() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let store = ResultStore::with_path(temp_dir.path().join("results.json"));

        store.put("a", vec![0]).await.unwrap();
        assert!(store.exists());

        store.clear().await.unwrap();
        assert!(!store.exists());
        assert_eq!(store.get("a").await.unwrap(), None);
    }
}
