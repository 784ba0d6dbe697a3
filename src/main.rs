use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tablesync::io::cloud::{LocalObjectIO, SqliteDatabaseIO};
use tablesync::{ObjectStore, RelationalStore, SyncConfig, SyncPipeline, TransferReport};

/// Tablesync - move tabular datasets between folders, object storage and databases
#[derive(Parser)]
#[command(name = "tablesync", version, about)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "TABLESYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Bucket to read from or write to (overrides config)
    #[arg(long)]
    bucket: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert every delimited file in a folder to Parquet and upload it
    Upload {
        /// Source folder (overrides config)
        folder: Option<PathBuf>,
        /// Source text encoding label, e.g. "utf-8" or "iso-8859-1"
        #[arg(long)]
        encoding: Option<String>,
        /// Write the transfer report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Download Parquet objects under a prefix and describe them
    Download {
        /// Key prefix (overrides config)
        prefix: Option<String>,
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Download Parquet objects under a prefix and load them as tables
    Load {
        /// Key prefix (overrides config)
        prefix: Option<String>,
        /// Destination database (overrides config)
        #[arg(short, long)]
        database: Option<String>,
        /// Write the table load report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info",
        1 => "info,tablesync=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Fails only when the batch could not run; item failures land in the report.
fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = SyncConfig::load(cli.config.as_deref())?;
    if let Some(bucket) = cli.bucket {
        config.object_store.bucket = bucket;
    }

    match cli.command {
        Command::Upload {
            folder,
            encoding,
            report,
        } => {
            if let Some(folder) = folder {
                config.source.folder = folder;
            }
            if let Some(encoding) = encoding {
                config.source.encoding = encoding;
            }
            upload(&config, report.as_deref())
        }
        Command::Download { prefix, report } => {
            if let Some(prefix) = prefix {
                config.object_store.download_prefix = prefix;
            }
            download(&config, report.as_deref())
        }
        Command::Load {
            prefix,
            database,
            report,
        } => {
            if let Some(prefix) = prefix {
                config.object_store.download_prefix = prefix;
            }
            if let Some(database) = database {
                config.database.name = database;
            }
            load(&config, report.as_deref())
        }
    }
}

fn pipeline(config: &SyncConfig) -> anyhow::Result<SyncPipeline> {
    let codec = config.codec().context("source options")?;
    Ok(SyncPipeline::new(codec, config.pipeline_options()))
}

fn object_store(config: &SyncConfig) -> ObjectStore<LocalObjectIO> {
    ObjectStore::new(LocalObjectIO::new(&config.object_store.root))
        .with_page_size(config.object_store.page_size)
}

fn finish(report: &TransferReport, path: Option<&Path>) -> anyhow::Result<()> {
    if let Some(path) = path {
        report.save_to_file(path)?;
        tracing::info!(path = %path.display(), "report written");
    }
    Ok(())
}

fn upload(config: &SyncConfig, report_path: Option<&Path>) -> anyhow::Result<()> {
    let mut pipeline = pipeline(config)?;
    let store = object_store(config);
    tracing::info!(
        folder = %config.source.folder.display(),
        bucket = %config.object_store.bucket,
        encoding = %config.source.encoding,
        "uploading folder"
    );
    let report = pipeline
        .upload_folder(&config.source.folder, &store, &config.object_store.bucket)
        .with_context(|| format!("upload {}", config.source.folder.display()))?;
    finish(&report, report_path)
}

fn download(config: &SyncConfig, report_path: Option<&Path>) -> anyhow::Result<()> {
    let mut pipeline = pipeline(config)?;
    let store = object_store(config);
    let downloaded = pipeline
        .download_datasets(
            &store,
            &config.object_store.bucket,
            &config.object_store.download_prefix,
        )
        .context("download datasets")?;
    for item in downloaded.batch.items() {
        tracing::info!(
            name = %item.destination,
            rows = item.dataset.num_rows(),
            columns = item.dataset.num_columns(),
            "dataset"
        );
    }
    println!("{}", downloaded.message);
    finish(&downloaded.report, report_path)
}

fn load(config: &SyncConfig, report_path: Option<&Path>) -> anyhow::Result<()> {
    let mut pipeline = pipeline(config)?;
    let objects = object_store(config);
    let tables = RelationalStore::new(
        SqliteDatabaseIO::open(&config.database.root)
            .with_context(|| format!("open {}", config.database.root.display()))?,
    );
    let synced = pipeline
        .sync_bucket_to_database(
            &objects,
            &config.object_store.bucket,
            &config.object_store.download_prefix,
            &tables,
            &config.database.name,
        )
        .with_context(|| format!("load into database {}", config.database.name))?;
    tracing::info!(
        database = %config.database.name,
        container = ?synced.container,
        "{}",
        synced.upload.summary()
    );
    finish(&synced.upload, report_path)
}
