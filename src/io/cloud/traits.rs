//! Transport traits for the external stores.
//!
//! These are the collaborator interfaces the gateways sit on: a key/blob store
//! and a relational execution interface. Both are synchronous; implementations
//! that wrap an async SDK must block internally.

use crate::dataset::Value;
use std::error::Error;
use std::fmt;

// ============================================================================
// Core Error Type
// ============================================================================

/// Error reported by a transport.
#[derive(Debug, Clone)]
pub struct CloudIOError {
    pub message: String,
    pub kind: ErrorKind,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidInput,
    Network,
    Timeout,
    ServiceUnavailable,
    InternalError,
    Other,
}

impl fmt::Display for CloudIOError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)?;
        if let Some(source) = &self.source {
            write!(f, " ({source})")?;
        }
        Ok(())
    }
}

impl Error for CloudIOError {}

impl CloudIOError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl From<std::io::Error> for CloudIOError {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            std::io::ErrorKind::AlreadyExists => ErrorKind::AlreadyExists,
            std::io::ErrorKind::TimedOut => ErrorKind::Timeout,
            std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::NotConnected => ErrorKind::Network,
            _ => ErrorKind::InternalError,
        };
        Self::new(kind, err.to_string())
    }
}

pub type CloudResult<T> = Result<T, CloudIOError>;

// ============================================================================
// ObjectIO - Object Storage
// ============================================================================

/// Metadata for an object in storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub key: String,
    pub size: u64,
    pub etag: Option<String>,
}

/// Terminal response to a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutAck {
    /// Protocol-level status code (200 means stored).
    pub status_code: u16,
    pub etag: Option<String>,
}

impl PutAck {
    #[must_use]
    pub const fn ok(etag: Option<String>) -> Self {
        Self {
            status_code: 200,
            etag,
        }
    }
}

/// One page of a prefix listing.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub objects: Vec<ObjectMetadata>,
    /// Token for the next page; `None` once the listing is exhausted.
    pub next_token: Option<String>,
}

/// Trait for object storage operations
pub trait ObjectIO {
    /// Upload data to object storage.
    ///
    /// A completed exchange returns `Ok` carrying the store's status code, even
    /// when that code is not a success.
    ///
    /// # Errors
    ///
    /// Returns an error if the store could not be reached or the request could not be sent
    fn put_object(&self, bucket: &str, key: &str, data: &[u8]) -> CloudResult<PutAck>;

    /// Download data from object storage
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::NotFound`] if the object doesn't exist, or another kind if the download fails
    fn get_object(&self, bucket: &str, key: &str) -> CloudResult<Vec<u8>>;

    /// List up to `max_keys` objects under `prefix`, in key order, starting after
    /// the position encoded by `continuation`.
    ///
    /// # Errors
    ///
    /// Returns an error if the bucket doesn't exist or the listing fails
    fn list_objects_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
        max_keys: usize,
    ) -> CloudResult<ListPage>;
}

// ============================================================================
// DatabaseIO - Relational Databases
// ============================================================================

/// Destination column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Integer,
    Real,
    Text,
}

impl SqlType {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
        }
    }
}

/// A column of a table to be (re)created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub sql_type: SqlType,
}

/// Rows read back from a table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// Trait for relational database operations
pub trait DatabaseIO {
    /// Names of databases matching a SQL `LIKE` pattern (`%` and `_` wildcards).
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be reached
    fn list_databases(&self, pattern: &str) -> CloudResult<Vec<String>>;

    /// Create a database.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::AlreadyExists`] if it already exists, or another kind on failure
    fn create_database(&self, name: &str) -> CloudResult<()>;

    /// Drop `table` if present and recreate it with `columns` holding exactly `rows`.
    /// Returns the number of rows written.
    ///
    /// # Errors
    ///
    /// Returns an error if the database is missing, a statement fails, or there's a connection issue
    fn replace_table(
        &self,
        database: &str,
        table: &str,
        columns: &[ColumnDef],
        rows: &[Vec<Value>],
    ) -> CloudResult<u64>;

    /// Read every row of a table.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::NotFound`] if the table doesn't exist, or another kind on failure
    fn read_table(&self, database: &str, table: &str) -> CloudResult<QueryResult>;
}
