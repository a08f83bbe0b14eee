//! # Blob Persistence
//!
//! Key/value storage of opaque byte blobs, the only contract the journey and
//! achievement stores need:
//!
//! - `read_blob(key)` returns the bytes last written under `key`, or `None`
//! - `write_blob(key, bytes)` replaces whatever was stored under `key`
//!
//! ## Backends
//!
//! - [`MemoryBlobStore`] - in-process map, for tests and ephemeral hosts
//! - [`FileBlobStore`] - one file per key in a directory
//! - `SqliteBlobStore` - a single `blobs` table (requires `persistence` feature)

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{Result, SpeedSyncError};

/// Byte-blob storage keyed by string.
pub trait BlobStore {
    /// Read the blob stored under `key`, if any.
    fn read_blob(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `bytes` under `key`, replacing any previous value.
    fn write_blob(&mut self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Remove the blob stored under `key`. Missing keys are not an error.
    fn remove_blob(&mut self, key: &str) -> Result<()>;
}

impl<S: BlobStore + ?Sized> BlobStore for Box<S> {
    fn read_blob(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).read_blob(key)
    }

    fn write_blob(&mut self, key: &str, bytes: &[u8]) -> Result<()> {
        (**self).write_blob(key, bytes)
    }

    fn remove_blob(&mut self, key: &str) -> Result<()> {
        (**self).remove_blob(key)
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Blob store backed by a `HashMap`. Contents are lost on drop.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: HashMap<String, Vec<u8>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl BlobStore for MemoryBlobStore {
    fn read_blob(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.get(key).cloned())
    }

    fn write_blob(&mut self, key: &str, bytes: &[u8]) -> Result<()> {
        self.blobs.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove_blob(&mut self, key: &str) -> Result<()> {
        self.blobs.remove(key);
        Ok(())
    }
}

// ============================================================================
// File-backed
// ============================================================================

/// Blob store keeping each key in its own file under a directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write leaves the previous blob intact.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(SpeedSyncError::persistence(format!(
                "invalid blob key '{}'",
                key
            )));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl BlobStore for FileBlobStore {
    fn read_blob(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_blob(&mut self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        debug!("[BlobStore] Wrote {} bytes to {:?}", bytes.len(), path);
        Ok(())
    }

    fn remove_blob(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// SQLite
// ============================================================================

#[cfg(feature = "persistence")]
pub use sqlite::SqliteBlobStore;

#[cfg(feature = "persistence")]
mod sqlite {
    use rusqlite::{params, Connection, OptionalExtension};

    use super::BlobStore;
    use crate::error::Result;

    /// Blob store in a SQLite database, one row per key.
    pub struct SqliteBlobStore {
        db: Connection,
    }

    impl SqliteBlobStore {
        /// Open (or create) the database at `db_path`.
        pub fn open(db_path: &str) -> Result<Self> {
            let db = Connection::open(db_path)?;
            Self::init_schema(&db)?;
            Ok(Self { db })
        }

        /// Create an in-memory database (for testing).
        pub fn in_memory() -> Result<Self> {
            Self::open(":memory:")
        }

        fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS blobs (
                    key TEXT PRIMARY KEY,
                    data BLOB NOT NULL,
                    updated_at INTEGER DEFAULT (strftime('%s', 'now'))
                );
                "#,
            )
        }
    }

    impl BlobStore for SqliteBlobStore {
        fn read_blob(&self, key: &str) -> Result<Option<Vec<u8>>> {
            let data = self
                .db
                .query_row(
                    "SELECT data FROM blobs WHERE key = ?",
                    params![key],
                    |row| row.get::<_, Vec<u8>>(0),
                )
                .optional()?;
            Ok(data)
        }

        fn write_blob(&mut self, key: &str, bytes: &[u8]) -> Result<()> {
            self.db.execute(
                "INSERT OR REPLACE INTO blobs (key, data, updated_at)
                 VALUES (?, ?, strftime('%s', 'now'))",
                params![key, bytes],
            )?;
            Ok(())
        }

        fn remove_blob(&mut self, key: &str) -> Result<()> {
            self.db
                .execute("DELETE FROM blobs WHERE key = ?", params![key])?;
            Ok(())
        }
    }
}
