//! Local destination directory and per-attempt staging files
//!
//! Every download streams into a uniquely named staging file inside the
//! destination directory. A staging file ends in exactly one of two ways:
//! [`StagedFile::commit`] renames it to its final name, or it is deleted
//! ([`StagedFile::discard`], or simply dropping it on any other exit path).

mod space;

pub use space::{FixedSpaceProbe, SpaceProbe, StatvfsProbe};

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempPath;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

const STAGING_PREFIX: &str = ".bulkfetch-";
const STAGING_SUFFIX: &str = ".part";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to create destination directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("Failed to create staging file: {0}")]
    Stage(#[source] io::Error),

    #[error("Failed to write staging file: {0}")]
    Write(#[source] io::Error),

    #[error("Failed to move staged file to {dest}: {source}")]
    Commit { dest: PathBuf, source: io::Error },

    #[error("Failed to delete staging file: {0}")]
    Discard(#[source] io::Error),

    #[error("Failed to query available disk space: {0}")]
    SpaceQuery(#[source] io::Error),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

/// Destination directory plus the probe used to check its free space
#[derive(Clone)]
pub struct LocalStore {
    root: PathBuf,
    probe: Arc<dyn SpaceProbe>,
}

impl LocalStore {
    /// Use `root`, creating it if needed, with the platform space probe
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        Self::with_probe(root, Arc::new(StatvfsProbe))
    }

    pub fn with_probe(root: impl Into<PathBuf>, probe: Arc<dyn SpaceProbe>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|source| StorageError::CreateDir {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root, probe })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final location for a committed file named `name`
    pub fn destination(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Free space on the destination volume, in whole kilobytes (1000 bytes)
    pub fn available_kb(&self) -> Result<u64> {
        self.probe
            .available_bytes(&self.root)
            .map(|bytes| bytes / 1000)
            .map_err(StorageError::SpaceQuery)
    }

    /// Open a fresh, uniquely named staging file
    pub fn stage(&self) -> Result<StagedFile> {
        let named = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .suffix(STAGING_SUFFIX)
            .tempfile_in(&self.root)
            .map_err(StorageError::Stage)?;

        let (file, path) = named.into_parts();
        debug!(path = %path.display(), "Staging file created");

        Ok(StagedFile {
            file: File::from_std(file),
            path,
            written: 0,
        })
    }

    /// Names of staging files currently present in the destination directory
    pub fn staging_files(&self) -> io::Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(STAGING_PREFIX) && name.ends_with(STAGING_SUFFIX) {
                found.push(entry.path());
            }
        }
        Ok(found)
    }
}

/// Bytes received for one attempt, not yet visible under a final name.
///
/// Dropping a `StagedFile` deletes it.
pub struct StagedFile {
    file: File,
    path: TempPath,
    written: u64,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Append `chunk` and flush it to the OS
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        self.file
            .write_all(chunk)
            .await
            .map_err(StorageError::Write)?;
        self.file.flush().await.map_err(StorageError::Write)?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    /// Close the handle and rename the staged bytes to `dest`
    pub async fn commit(self, dest: &Path) -> Result<()> {
        let StagedFile {
            mut file,
            path,
            written,
        } = self;

        file.flush().await.map_err(StorageError::Write)?;
        drop(file);

        // On failure the returned TempPath is dropped, deleting the staging file
        path.persist(dest).map_err(|err| StorageError::Commit {
            dest: dest.to_path_buf(),
            source: err.error,
        })?;

        debug!(dest = %dest.display(), bytes = written, "Staged file committed");
        Ok(())
    }

    /// Close the handle and delete the staged bytes
    pub fn discard(self) -> Result<()> {
        let StagedFile { file, path, .. } = self;
        drop(file);

        let staged_path = path.to_path_buf();
        path.close().map_err(StorageError::Discard)?;
        debug!(path = %staged_path.display(), "Staged file discarded");
        Ok(())
    }
}
