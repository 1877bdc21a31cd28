//! Storage errors
//!
//! I/O and SQLite failures are classified so the CLI can tell the user
//! what to do about them.

use std::io;
use std::path::PathBuf;

use rusqlite::ErrorCode;
use thiserror::Error;

use crate::models::ValidationError;

/// ENOSPC and EDQUOT on Linux
const DISK_FULL_OS_CODES: [i32; 2] = [28, 122];

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Permission denied on '{}'", path.display())]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Out of disk space or quota while writing '{}'", path.display())]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Write to '{}' failed: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("'{}' does not exist", path.display())]
    NotFound { path: PathBuf },

    /// A stored row that no longer decodes into an entry
    #[error("Entry '{id}' is corrupted: {details}")]
    CorruptRecord { id: String, details: String },

    #[error("Entry cannot be saved: {0}")]
    Invalid(#[from] ValidationError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StorageError {
    /// Classify an I/O failure on `path`
    pub fn from_io(source: io::Error, path: PathBuf) -> Self {
        if source.kind() == io::ErrorKind::PermissionDenied {
            StorageError::PermissionDenied { path, source }
        } else if source.kind() == io::ErrorKind::NotFound {
            StorageError::NotFound { path }
        } else if is_disk_full(&source) {
            StorageError::DiskFull { path, source }
        } else {
            StorageError::WriteFailed { path, source }
        }
    }

    /// Classify a SQLite failure on the database at `path`
    pub fn from_sqlite(error: rusqlite::Error, path: PathBuf) -> Self {
        let kind = match error.sqlite_error_code() {
            Some(ErrorCode::DiskFull) => io::ErrorKind::Other,
            Some(ErrorCode::PermissionDenied | ErrorCode::ReadOnly | ErrorCode::CannotOpen) => {
                io::ErrorKind::PermissionDenied
            }
            _ => return StorageError::Database(error),
        };

        let source = io::Error::new(kind, error.to_string());
        if kind == io::ErrorKind::PermissionDenied {
            StorageError::PermissionDenied { path, source }
        } else {
            StorageError::DiskFull { path, source }
        }
    }

    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        Some(match self {
            StorageError::WriteFailed { .. } => {
                "Check that data_dir points at a writable directory (diary config set data_dir ...)."
            }
            StorageError::PermissionDenied { .. } => {
                "Check the permissions of the data directory and diary.db."
            }
            StorageError::DiskFull { .. } => "Free up disk space and try again.",
            StorageError::CorruptRecord { .. } => {
                "Delete the affected entry or restore diary.db from a backup."
            }
            StorageError::Invalid(_) => "Fill in the required fields and save again.",
            _ => return None,
        })
    }
}

fn is_disk_full(error: &io::Error) -> bool {
    if let Some(code) = error.raw_os_error() {
        return DISK_FULL_OS_CODES.contains(&code);
    }
    let message = error.to_string().to_lowercase();
    ["no space left", "disk full", "quota exceeded", "not enough space"]
        .iter()
        .any(|needle| message.contains(needle))
}

pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(kind: io::ErrorKind, message: &str) -> StorageError {
        StorageError::from_io(io::Error::new(kind, message.to_string()), "/data/diary.db".into())
    }

    #[test]
    fn test_io_classification() {
        let denied = classify(io::ErrorKind::PermissionDenied, "access denied");
        assert!(matches!(denied, StorageError::PermissionDenied { .. }));
        assert!(denied.recovery_suggestion().is_some());

        let missing = classify(io::ErrorKind::NotFound, "gone");
        assert!(matches!(missing, StorageError::NotFound { .. }));
        assert!(missing.recovery_suggestion().is_none());

        let quota = classify(io::ErrorKind::Other, "Quota exceeded for user");
        assert!(matches!(quota, StorageError::DiskFull { .. }));

        let other = classify(io::ErrorKind::Other, "device hiccup");
        assert!(matches!(other, StorageError::WriteFailed { .. }));
        assert!(other.recovery_suggestion().is_some());
    }

    #[test]
    fn test_enospc_is_disk_full() {
        let err = StorageError::from_io(io::Error::from_raw_os_error(28), "/data".into());
        assert!(matches!(err, StorageError::DiskFull { .. }));
    }

    #[test]
    fn test_invalid_entry_message() {
        let err = StorageError::from(ValidationError::NameRequired);
        assert_eq!(err.to_string(), "Entry cannot be saved: place/title required");
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_corrupt_record_message() {
        let err = StorageError::CorruptRecord {
            id: "abc".to_string(),
            details: "bad layers".to_string(),
        };
        assert!(err.to_string().contains("abc"));
        assert!(err.recovery_suggestion().unwrap().contains("backup"));
    }
}
