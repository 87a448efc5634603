//! Checks on the URL list file before a run starts

use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileValidationError {
    #[error("File path is empty")]
    EmptyPath,

    #[error("File path is not a file (missing or directory)")]
    NotAFile,

    #[error("File is empty")]
    EmptyFile,

    #[error("File is too big ({size} bytes, limit {limit})")]
    TooBigFile { size: u64, limit: u64 },

    #[error("Failed to inspect file: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, FileValidationError>;

/// Validates that `path` names a regular, non-empty file no larger than
/// `max_bytes`.
#[derive(Debug, Clone, Copy)]
pub struct FileValidator {
    max_bytes: u64,
}

impl FileValidator {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    pub fn validate(&self, path: &Path) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Err(FileValidationError::EmptyPath);
        }

        // Missing files and directories are reported the same way
        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(FileValidationError::NotAFile);
            }
            Err(err) => return Err(err.into()),
        };
        if !metadata.is_file() {
            return Err(FileValidationError::NotAFile);
        }

        let size = metadata.len();
        if size == 0 {
            return Err(FileValidationError::EmptyFile);
        }
        if size > self.max_bytes {
            return Err(FileValidationError::TooBigFile {
                size,
                limit: self.max_bytes,
            });
        }

        Ok(())
    }
}
