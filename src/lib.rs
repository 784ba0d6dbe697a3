//! # Tablesync
//!
//! Moves tabular datasets between three places:
//!
//! - a **local folder** of delimited text files,
//! - an **object store** holding one Parquet object per dataset,
//! - a **relational store** holding one table per dataset.
//!
//! Every transfer is a batch of named items processed in order. A failing item is
//! logged and recorded in the batch's [`TransferReport`]; it never aborts the
//! items after it. Only failures that leave nothing to iterate over (an
//! unreadable source folder, a failed listing, a database that cannot be
//! ensured) are returned as errors.
//!
//! ## Quick Start
//!
//! ```no_run
//! use tablesync::*;
//! use tablesync::io::cloud::{LocalObjectIO, SqliteDatabaseIO};
//! # fn main() -> anyhow::Result<()> {
//! let objects = ObjectStore::new(LocalObjectIO::new("buckets"));
//! let tables = RelationalStore::new(SqliteDatabaseIO::open("databases")?);
//!
//! let mut pipeline = SyncPipeline::default();
//! let uploaded = pipeline.upload_folder("data/final".as_ref(), &objects, "datasets")?;
//! println!("{}", uploaded.summary());
//!
//! let synced = pipeline.sync_bucket_to_database(&objects, "datasets", "files/", &tables, "analytics")?;
//! println!("{}", synced.upload.summary());
//! # Ok(())
//! # }
//! ```
//!
//! ## Layout
//!
//! - [`dataset`]: the in-memory table and the named batch of them.
//! - [`io`]: text and Parquet codecs, plus the store transports in [`io::cloud`].
//! - [`gateway`]: object-store and relational-store contracts over a transport.
//! - [`pipeline`]: the three transfer directions.
//! - [`progress`] and [`report`]: what happened, as it happens and afterwards.
//! - [`config`]: TOML plus environment configuration for the binary.

pub mod config;
pub mod dataset;
pub mod error;
pub mod gateway;
pub mod io;
pub mod pipeline;
pub mod progress;
pub mod report;

pub use config::SyncConfig;
pub use dataset::{ColumnKind, Dataset, TransferBatch, TransferItem, Value};
pub use error::{SyncError, SyncResult};
pub use gateway::{Container, ObjectStore, RelationalStore, TablePlan};
pub use io::Codec;
pub use io::csv::{CsvOptions, TextEncoding};
pub use pipeline::{BucketToDatabase, Downloaded, PipelineOptions, SyncPipeline};
pub use progress::{LogProgress, NoProgress, ProgressEvent, ProgressSink, RecordingProgress};
pub use report::{Direction, ItemState, TransferOutcome, TransferReport};
