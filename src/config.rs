//! Runtime configuration.
//!
//! Loaded from a TOML file (every field optional), then overridden by
//! `TABLESYNC_*` environment variables, then by command-line flags.
//!
//! ```toml
//! [source]
//! folder = "data/final"
//! extension = "csv"
//! encoding = "iso-8859-1"
//! delimiter = ","
//!
//! [object_store]
//! root = "buckets"
//! bucket = "datasets"
//! key_prefix = "files"
//! download_prefix = "files/"
//! page_size = 1000
//!
//! [database]
//! root = "databases"
//! name = "analytics"
//! ```

use crate::error::{SyncError, SyncResult};
use crate::io::Codec;
use crate::io::cloud::helpers::config_from_env;
use crate::io::csv::{CsvOptions, DEFAULT_ENCODING, TextEncoding};
use crate::pipeline::{DEFAULT_KEY_PREFIX, DEFAULT_SOURCE_EXTENSION, PipelineOptions};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Prefix of environment variables read by [`SyncConfig::load`].
pub const ENV_PREFIX: &str = "TABLESYNC_";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    pub folder: PathBuf,
    pub extension: String,
    /// Encoding label of the delimited text files.
    pub encoding: String,
    pub delimiter: char,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            folder: PathBuf::from("."),
            extension: DEFAULT_SOURCE_EXTENSION.to_string(),
            encoding: DEFAULT_ENCODING.to_string(),
            delimiter: ',',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ObjectStoreConfig {
    /// Directory holding one subdirectory per bucket.
    pub root: PathBuf,
    pub bucket: String,
    pub key_prefix: String,
    pub download_prefix: String,
    pub page_size: usize,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("buckets"),
            bucket: "datasets".to_string(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            download_prefix: format!("{DEFAULT_KEY_PREFIX}/"),
            page_size: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Directory holding one file per database.
    pub root: PathBuf,
    pub name: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("databases"),
            name: "datasets".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    pub source: SourceConfig,
    pub object_store: ObjectStoreConfig,
    pub database: DatabaseConfig,
}

impl SyncConfig {
    /// Parse a TOML document.
    ///
    /// # Errors
    /// Returns an error if the document is not valid TOML or has unknown keys.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("parse config")
    }

    /// Read the file at `path` (if any), then apply `TABLESYNC_*` overrides.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or an override
    /// value is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("read {}", path.display()))?;
                Self::from_toml(&text).with_context(|| format!("load {}", path.display()))?
            }
            None => Self::default(),
        };
        config.apply_overrides(&config_from_env(ENV_PREFIX))?;
        Ok(config)
    }

    /// Apply overrides keyed by lowercase name (`bucket`, `database`, `encoding`,
    /// ...). Unknown keys are ignored.
    ///
    /// # Errors
    /// Returns an error if a value cannot be parsed for its field.
    pub fn apply_overrides(&mut self, vars: &HashMap<String, String>) -> Result<()> {
        for (key, value) in vars {
            match key.as_str() {
                "source_folder" => self.source.folder = PathBuf::from(value),
                "source_extension" => self.source.extension.clone_from(value),
                "encoding" => self.source.encoding.clone_from(value),
                "delimiter" => {
                    let mut chars = value.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) => self.source.delimiter = c,
                        _ => anyhow::bail!("{ENV_PREFIX}DELIMITER must be a single character"),
                    }
                }
                "object_root" => self.object_store.root = PathBuf::from(value),
                "bucket" => self.object_store.bucket.clone_from(value),
                "key_prefix" => self.object_store.key_prefix.clone_from(value),
                "download_prefix" => self.object_store.download_prefix.clone_from(value),
                "page_size" => {
                    self.object_store.page_size = value
                        .parse()
                        .with_context(|| format!("{ENV_PREFIX}PAGE_SIZE={value}"))?;
                }
                "database_root" => self.database.root = PathBuf::from(value),
                "database" => self.database.name.clone_from(value),
                _ => {}
            }
        }
        Ok(())
    }

    /// Codec for the configured source encoding and delimiter.
    ///
    /// # Errors
    /// Returns [`SyncError::InvalidInput`] for an unknown encoding label or a
    /// delimiter that is not a single ASCII character.
    pub fn codec(&self) -> SyncResult<Codec> {
        let encoding = TextEncoding::from_label(&self.source.encoding)?;
        let delimiter = u8::try_from(self.source.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                SyncError::InvalidInput(format!(
                    "delimiter {:?} is not a single ASCII character",
                    self.source.delimiter
                ))
            })?;
        Ok(Codec::new(CsvOptions {
            delimiter,
            encoding,
        }))
    }

    #[must_use]
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            key_prefix: self.object_store.key_prefix.clone(),
            source_extension: self.source.extension.clone(),
        }
    }
}
