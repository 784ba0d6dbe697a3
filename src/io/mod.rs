//! Dataset codecs and store transports.
//!
//! - [`csv`] - delimited text to [`Dataset`], under a declared encoding
//! - [`parquet`] - [`Dataset`] to and from Parquet bytes
//! - [`cloud`] - transports for object storage and relational stores
//!
//! [`Codec`] bundles the text reader options with the binary format so the
//! pipeline carries one value for all conversions.

pub mod cloud;
pub mod csv;
pub mod parquet;

use crate::dataset::Dataset;
use crate::error::SyncResult;
use self::csv::CsvOptions;

/// Converts datasets between their wire representations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Codec {
    pub csv: CsvOptions,
}

impl Codec {
    #[must_use]
    pub const fn new(csv: CsvOptions) -> Self {
        Self { csv }
    }

    /// Columnar binary form of `dataset`.
    ///
    /// # Errors
    /// See [`parquet::encode_parquet`].
    pub fn encode(&self, dataset: &Dataset) -> SyncResult<Vec<u8>> {
        parquet::encode_parquet(dataset)
    }

    /// Dataset named `name` from columnar binary bytes.
    ///
    /// # Errors
    /// See [`parquet::decode_parquet`].
    pub fn decode(&self, name: &str, data: Vec<u8>) -> SyncResult<Dataset> {
        parquet::decode_parquet(name, data)
    }

    /// Dataset named `name` from delimited text in the configured encoding.
    ///
    /// # Errors
    /// See [`csv::decode_delimited_text`].
    pub fn decode_delimited_text(&self, name: &str, raw: &[u8]) -> SyncResult<Dataset> {
        csv::decode_delimited_text(name, raw, &self.csv)
    }
}
