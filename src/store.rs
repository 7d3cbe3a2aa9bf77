//! Reading and writing file content.
//!
//! The dispatcher only sees the [`ContentLoader`] and [`ContentPersister`]
//! traits, so plan/apply behaviour can be exercised without a filesystem.

use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Written,
    /// The file already held exactly this content.
    Unchanged,
}

pub trait ContentLoader {
    /// Raw content of `path`, or `None` if it is not UTF-8 text.
    fn load(&self, path: &Path) -> Result<Option<String>, StoreError>;
}

pub trait ContentPersister {
    fn save(&self, path: &Path, content: &str) -> Result<SaveOutcome, StoreError>;
}

/// Filesystem-backed store with atomic writes.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStore;

impl ContentLoader for FsStore {
    fn load(&self, path: &Path) -> Result<Option<String>, StoreError> {
        let bytes = std::fs::read(path).map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(String::from_utf8(bytes).ok())
    }
}

impl ContentPersister for FsStore {
    fn save(&self, path: &Path, content: &str) -> Result<SaveOutcome, StoreError> {
        let wrap = |source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Ok(existing) = std::fs::read(path) {
            if xxh3_64(&existing) == xxh3_64(content.as_bytes()) {
                return Ok(SaveOutcome::Unchanged);
            }
        }

        atomic_write(path, content.as_bytes()).map_err(wrap)?;

        // Bump mtime so watchers and build tools notice the rewrite
        let now = filetime::FileTime::now();
        filetime::set_file_mtime(path, now).map_err(wrap)?;

        tracing::info!(path = %path.display(), bytes = content.len(), "wrote file");
        Ok(SaveOutcome::Written)
    }
}

fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    // Same directory keeps the rename on one filesystem
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
