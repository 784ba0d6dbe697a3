//! Sync pipeline.
//!
//! One [`SyncPipeline`] drives three transfer directions:
//!
//! 1. [`upload_folder`](SyncPipeline::upload_folder): local delimited files to
//!    Parquet objects under a key prefix.
//! 2. [`download_datasets`](SyncPipeline::download_datasets): Parquet objects
//!    under a prefix into an in-memory [`TransferBatch`].
//! 3. [`upload_tables`](SyncPipeline::upload_tables): a batch into tables of one
//!    database.
//!
//! Items are processed strictly in order, one at a time, each moving through
//! `Pending -> Converting -> Transferring -> Succeeded | Failed`. Enumeration
//! failures (unreadable folder, failed listing, unusable database) are returned as
//! `Err`: the batch could not start. Item failures are logged, recorded in the
//! [`TransferReport`], and the next item runs anyway. Nothing is retried here.

use crate::dataset::{TransferBatch, dataset_name_from_path, object_key};
use crate::error::{SyncError, SyncResult};
use crate::gateway::{Container, ObjectStore, RelationalStore};
use crate::io::Codec;
use crate::io::cloud::traits::{DatabaseIO, ObjectIO};
use crate::io::parquet::PARQUET_EXTENSION;
use crate::progress::{LogProgress, ProgressEvent, ProgressSink};
use crate::report::{Direction, ItemState, TransferOutcome, TransferReport};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default key prefix for uploaded objects.
pub const DEFAULT_KEY_PREFIX: &str = "files";
/// Default extension marking a local data file.
pub const DEFAULT_SOURCE_EXTENSION: &str = "csv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Prefix for object keys written by [`SyncPipeline::upload_folder`].
    pub key_prefix: String,
    /// Extension (without dot, case-insensitive) that marks a local data file.
    pub source_extension: String,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            source_extension: DEFAULT_SOURCE_EXTENSION.to_string(),
        }
    }
}

/// Datasets collected from object storage, plus how the download went.
#[derive(Debug, Clone)]
pub struct Downloaded {
    pub batch: TransferBatch,
    pub report: TransferReport,
    /// Count-based completion message.
    pub message: String,
}

/// Reports from [`SyncPipeline::sync_bucket_to_database`].
#[derive(Debug, Clone)]
pub struct BucketToDatabase {
    pub download: TransferReport,
    pub upload: TransferReport,
    pub container: Container,
}

pub struct SyncPipeline {
    codec: Codec,
    options: PipelineOptions,
    progress: Box<dyn ProgressSink>,
}

impl Default for SyncPipeline {
    fn default() -> Self {
        Self::new(Codec::default(), PipelineOptions::default())
    }
}

/// Run one item through its lifecycle, reporting each state to `progress`.
///
/// `convert` produces the representation to move; `transfer` moves it. An error
/// from either ends the item as `Failed` with the error text as detail.
fn run_item<T>(
    progress: &mut dyn ProgressSink,
    operation: &str,
    index: usize,
    total: usize,
    name: &str,
    convert: impl FnOnce() -> SyncResult<T>,
    transfer: impl FnOnce(T) -> SyncResult<()>,
) -> TransferOutcome {
    let mut set_state = |state: ItemState| {
        progress.emit(&ProgressEvent::ItemState {
            index,
            name: name.to_string(),
            state,
        });
    };

    set_state(ItemState::Pending);
    set_state(ItemState::Converting);
    let result = convert().and_then(|converted| {
        set_state(ItemState::Transferring);
        transfer(converted)
    });

    let outcome = match result {
        Ok(()) => {
            set_state(ItemState::Succeeded);
            TransferOutcome::success(name)
        }
        Err(err) => {
            warn!(operation, item = name, error = %err, "item failed");
            set_state(ItemState::Failed);
            TransferOutcome::failure(name, err.to_string())
        }
    };

    progress.emit(&ProgressEvent::ItemFinished {
        index,
        total,
        outcome: outcome.clone(),
    });
    outcome
}

impl SyncPipeline {
    /// Pipeline that logs progress through `tracing`.
    #[must_use]
    pub fn new(codec: Codec, options: PipelineOptions) -> Self {
        Self {
            codec,
            options,
            progress: Box::new(LogProgress),
        }
    }

    /// Replace the progress sink.
    #[must_use]
    pub fn with_progress(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.progress = Box::new(sink);
        self
    }

    #[must_use]
    pub const fn codec(&self) -> &Codec {
        &self.codec
    }

    #[must_use]
    pub const fn options(&self) -> &PipelineOptions {
        &self.options
    }

    fn start(&mut self, direction: Direction, total: usize) -> TransferReport {
        info!(%direction, total, "batch started");
        self.progress
            .emit(&ProgressEvent::BatchStarted { direction, total });
        TransferReport::new(direction)
    }

    fn finish(&mut self, report: &TransferReport) {
        self.progress.emit(&ProgressEvent::BatchFinished {
            direction: report.direction,
            succeeded: report.succeeded_count,
            total: report.total,
        });
        info!(
            direction = %report.direction,
            succeeded = report.succeeded_count,
            failed = report.failed_count(),
            "{}",
            report.summary()
        );
    }

    /// Regular files in `folder` whose extension marks them as data, sorted by name.
    ///
    /// # Errors
    /// Returns an error if the folder cannot be read.
    pub fn discover_sources(&self, folder: &Path) -> SyncResult<Vec<PathBuf>> {
        let wanted = self.options.source_extension.trim_start_matches('.');
        let mut files = Vec::new();
        for entry in fs::read_dir(folder)? {
            let entry = entry?;
            let path = entry.path();
            let is_data = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(wanted));
            if is_data && entry.file_type()?.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Convert every data file in `folder` to Parquet and write it to
    /// `<key_prefix>/<name>.parquet` in `bucket`.
    ///
    /// # Errors
    /// Returns an error only if `folder` cannot be enumerated. Per-file decode and
    /// write failures are recorded in the report.
    pub fn upload_folder<C: ObjectIO>(
        &mut self,
        folder: &Path,
        store: &ObjectStore<C>,
        bucket: &str,
    ) -> SyncResult<TransferReport> {
        let sources = self.discover_sources(folder)?;
        let total = sources.len();
        let mut report = self.start(Direction::LocalToObjectStore, total);

        let codec = &self.codec;
        for (index, path) in sources.iter().enumerate() {
            let name = dataset_name_from_path(&path.to_string_lossy());
            let key = object_key(&self.options.key_prefix, &name, PARQUET_EXTENSION);
            let outcome = run_item(
                self.progress.as_mut(),
                "put",
                index,
                total,
                &name,
                || {
                    let raw = fs::read(path)?;
                    let dataset = codec.decode_delimited_text(&name, &raw)?;
                    codec.encode(&dataset)
                },
                |bytes| {
                    if store.put(bucket, &key, &bytes) {
                        Ok(())
                    } else {
                        Err(SyncError::WriteRejected {
                            bucket: bucket.to_string(),
                            key: key.clone(),
                        })
                    }
                },
            );
            report.record(outcome);
        }

        self.finish(&report);
        Ok(report)
    }

    /// Fetch and decode every Parquet object under `prefix` in `bucket`.
    ///
    /// Dataset names are the keys' final segments without extension.
    ///
    /// # Errors
    /// Returns an error if the listing fails: there is nothing to iterate over.
    /// Objects that vanish, fail to decode, or collide on name are recorded as
    /// failed items.
    pub fn download_datasets<C: ObjectIO>(
        &mut self,
        store: &ObjectStore<C>,
        bucket: &str,
        prefix: &str,
    ) -> SyncResult<Downloaded> {
        let suffix = format!(".{PARQUET_EXTENSION}");
        let keys = store.list(bucket, prefix, &suffix)?;
        let total = keys.len();
        let mut report = self.start(Direction::ObjectStoreToMemory, total);

        let codec = &self.codec;
        let mut batch = TransferBatch::new();
        for (index, key) in keys.iter().enumerate() {
            let name = dataset_name_from_path(key);
            let outcome = run_item(
                self.progress.as_mut(),
                "get",
                index,
                total,
                &name,
                || {
                    let bytes = store.get(bucket, key)?;
                    codec.decode(&name, bytes)
                },
                |dataset| batch.push(dataset, name.clone()),
            );
            report.record(outcome);
        }

        self.finish(&report);
        let message = format!(
            "downloaded {} of {} datasets from {bucket}/{prefix}",
            report.succeeded_count, report.total
        );
        info!("{message}");
        Ok(Downloaded {
            batch,
            report,
            message,
        })
    }

    /// Write every item of `batch` as a table of `database`, in batch order.
    ///
    /// The database is created first if it does not exist. Each table is
    /// replaced wholesale.
    ///
    /// # Errors
    /// Returns an error only if the database cannot be ensured. A failing table
    /// is logged and recorded; the remaining tables are still written.
    pub fn upload_tables<D: DatabaseIO>(
        &mut self,
        store: &RelationalStore<D>,
        database: &str,
        batch: &TransferBatch,
    ) -> SyncResult<TransferReport> {
        self.upload_tables_inner(store, database, batch)
            .map(|(report, _)| report)
    }

    fn upload_tables_inner<D: DatabaseIO>(
        &mut self,
        store: &RelationalStore<D>,
        database: &str,
        batch: &TransferBatch,
    ) -> SyncResult<(TransferReport, Container)> {
        let container = store.ensure_database(database)?;
        let total = batch.len();
        let mut report = self.start(Direction::MemoryToRelational, total);

        for (index, item) in batch.items().iter().enumerate() {
            let outcome = run_item(
                self.progress.as_mut(),
                "replace_table",
                index,
                total,
                &item.destination,
                || store.plan_table(&item.destination, &item.dataset),
                |plan| {
                    store
                        .write_table(database, &plan, &item.dataset)
                        .map(|_| ())
                },
            );
            report.record(outcome);
        }

        self.finish(&report);
        Ok((report, container))
    }

    /// Download every Parquet object under `prefix` and load the datasets as
    /// tables of `database`.
    ///
    /// # Errors
    /// Returns an error if the listing fails or the database cannot be ensured.
    pub fn sync_bucket_to_database<C: ObjectIO, D: DatabaseIO>(
        &mut self,
        objects: &ObjectStore<C>,
        bucket: &str,
        prefix: &str,
        tables: &RelationalStore<D>,
        database: &str,
    ) -> SyncResult<BucketToDatabase> {
        let Downloaded { batch, report, .. } = self.download_datasets(objects, bucket, prefix)?;
        let (upload, container) = self.upload_tables_inner(tables, database, &batch)?;
        Ok(BucketToDatabase {
            download: report,
            upload,
            container,
        })
    }
}
