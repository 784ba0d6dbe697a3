//! Error taxonomy for sync operations.
//!
//! Failures travel on two channels. Enumeration steps (listing a bucket, reading a
//! source folder, ensuring the destination database) return `Err(SyncError)` to
//! the caller. Per-item failures during conversion or write are caught by the
//! pipeline and recorded in a [`TransferReport`](crate::report::TransferReport).

use crate::io::cloud::traits::{CloudIOError, ErrorKind};
use thiserror::Error;

/// Result alias used across the crate.
pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Store or database unreachable.
    #[error("{operation} failed: store unreachable: {message}")]
    Connectivity { operation: String, message: String },

    /// Source rows disagree with their header, or a dataset is otherwise ill-formed.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// A key vanished between listing and fetch.
    #[error("object not found: {bucket}/{key}")]
    ObjectNotFound { bucket: String, key: String },

    /// Container creation lost a race. Gateways resolve this to "already exists".
    #[error("container already exists: {0}")]
    ContainerConflict(String),

    /// The store answered a write with a non-success status.
    #[error("write to {bucket}/{key} was not acknowledged")]
    WriteRejected { bucket: String, key: String },

    /// Two items in one batch resolved to the same destination name.
    #[error("duplicate dataset name in batch: {0}")]
    DuplicateName(String),

    /// Caller-supplied argument was rejected before any I/O.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Columnar encode/decode failure.
    #[error("codec error: {0}")]
    Codec(String),

    /// Any other store-side failure.
    #[error("{operation} failed: {message}")]
    Store { operation: String, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Lift a transport error into the taxonomy, tagging it with the operation that failed.
    pub fn from_cloud(operation: impl Into<String>, err: CloudIOError) -> Self {
        let operation = operation.into();
        match err.kind {
            ErrorKind::Network | ErrorKind::Timeout | ErrorKind::ServiceUnavailable => {
                Self::Connectivity {
                    operation,
                    message: err.message,
                }
            }
            ErrorKind::AlreadyExists => Self::ContainerConflict(err.message),
            ErrorKind::InvalidInput => Self::InvalidInput(err.message),
            _ => Self::Store {
                operation,
                message: err.to_string(),
            },
        }
    }

    /// Whether this error means the store could not be reached at all.
    #[must_use]
    pub const fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity { .. })
    }
}

impl From<arrow::error::ArrowError> for SyncError {
    fn from(err: arrow::error::ArrowError) -> Self {
        Self::Codec(err.to_string())
    }
}

impl From<parquet::errors::ParquetError> for SyncError {
    fn from(err: parquet::errors::ParquetError) -> Self {
        Self::Codec(err.to_string())
    }
}
