//! Store transports.
//!
//! Two provider-agnostic traits describe the external collaborators the sync
//! gateways drive:
//!
//! - [`ObjectIO`] - object storage (S3, GCS, Azure Blob, or a local directory)
//! - [`DatabaseIO`] - relational databases
//!
//! ## Blocking API
//! All operations block. Implementations wrapping an async SDK own their runtime
//! and expose a blocking interface; retry and backoff, if wanted, belong in the
//! implementation or a wrapper around it.
//!
//! ## Implementations
//! - [`FakeObjectIO`] / [`FakeDatabaseIO`] - in-memory, with fault injection for tests
//! - [`LocalObjectIO`] - buckets as directories
//! - `SqliteDatabaseIO` - databases as `SQLite` files (feature `io-sqlite`)
//!
//! ## Usage
//! ```
//! use tablesync::io::cloud::*;
//!
//! # fn main() -> CloudResult<()> {
//! let storage = FakeObjectIO::new();
//! let ack = storage.put_object("bucket", "files/a.parquet", b"data")?;
//! assert_eq!(ack.status_code, 200);
//! assert_eq!(storage.get_object("bucket", "files/a.parquet")?, b"data");
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Transports return [`CloudResult<T>`] where the error is [`CloudIOError`],
//! categorized by [`ErrorKind`]. Gateways translate these into
//! [`SyncError`](crate::error::SyncError).

pub mod fake;
pub mod helpers;
pub mod local;
#[cfg(feature = "io-sqlite")]
pub mod sqlite;
pub mod traits;

pub use fake::*;
pub use local::LocalObjectIO;
#[cfg(feature = "io-sqlite")]
pub use sqlite::SqliteDatabaseIO;
pub use traits::*;
