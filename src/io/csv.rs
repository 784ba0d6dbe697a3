//! Delimited text decoding.
//!
//! Turns raw bytes of a header-first delimited file into a [`Dataset`]. The bytes
//! are first decoded under a caller-declared character encoding, since a lot of
//! legacy exports are not UTF-8. Decoding is strict: a byte sequence that is not
//! valid under the declared encoding is an error, never a replacement character.
//!
//! Cell typing follows the usual dataframe-reader convention: an empty cell is
//! null, and each column becomes integer, float, or text, whichever is the
//! narrowest kind every non-empty cell parses as.

use crate::dataset::{Dataset, Value};
use crate::error::{SyncError, SyncResult};
use encoding_rs::Encoding;
use std::borrow::Cow;

/// Default label for source text: the legacy 8-bit Western encoding.
pub const DEFAULT_ENCODING: &str = "iso-8859-1";

/// Declared character encoding of a text source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextEncoding(&'static Encoding);

impl TextEncoding {
    /// Resolve a WHATWG encoding label (`"utf-8"`, `"latin1"`, `"shift_jis"`, ...).
    ///
    /// # Errors
    /// Returns [`SyncError::InvalidInput`] for an unknown label.
    pub fn from_label(label: &str) -> SyncResult<Self> {
        Encoding::for_label(label.trim().as_bytes())
            .map(Self)
            .ok_or_else(|| SyncError::InvalidInput(format!("unknown text encoding {label:?}")))
    }

    #[must_use]
    pub const fn utf8() -> Self {
        Self(encoding_rs::UTF_8)
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        self.0.name()
    }

    /// Decode `raw` to text without substituting replacement characters.
    ///
    /// # Errors
    /// Returns [`SyncError::MalformedInput`] if `raw` is not valid under this encoding.
    pub fn decode(self, raw: &[u8]) -> SyncResult<Cow<'_, str>> {
        let raw = if self.0 == encoding_rs::UTF_8 {
            raw.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(raw)
        } else {
            raw
        };
        self.0
            .decode_without_bom_handling_and_without_replacement(raw)
            .ok_or_else(|| {
                SyncError::MalformedInput(format!("text is not valid {}", self.0.name()))
            })
    }
}

impl Default for TextEncoding {
    fn default() -> Self {
        Self(encoding_rs::WINDOWS_1252)
    }
}

/// Options for reading delimited text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    pub delimiter: u8,
    pub encoding: TextEncoding,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            encoding: TextEncoding::default(),
        }
    }
}

/// Parse header-first delimited text into a dataset named `name`.
///
/// # Errors
/// Returns [`SyncError::MalformedInput`] if the text is invalid under the declared
/// encoding, has no header row, or has a row whose field count differs from the
/// header.
pub fn decode_delimited_text(name: &str, raw: &[u8], options: &CsvOptions) -> SyncResult<Dataset> {
    let text = options.encoding.decode(raw)?;

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(options.delimiter)
        .from_reader(text.as_bytes());

    let headers = rdr
        .headers()
        .map_err(|e| SyncError::MalformedInput(format!("{name}: read header: {e}")))?
        .clone();
    if headers.is_empty() {
        return Err(SyncError::MalformedInput(format!("{name}: missing header row")));
    }
    let columns: Vec<String> = headers.iter().map(str::to_string).collect();

    let mut cells: Vec<Vec<String>> = Vec::new();
    for rec in rdr.records() {
        let rec = rec.map_err(|e| SyncError::MalformedInput(format!("{name}: {e}")))?;
        if rec.len() != columns.len() {
            let line = rec.position().map_or(0, csv::Position::line);
            return Err(SyncError::MalformedInput(format!(
                "{name}: line {line} has {} fields, header has {}",
                rec.len(),
                columns.len()
            )));
        }
        cells.push(rec.iter().map(str::to_string).collect());
    }

    let rows = type_columns(cells, columns.len());
    Dataset::new(name, columns, rows)
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Inferred {
    Int,
    Float,
    Text,
}

fn infer(cell: &str) -> Option<Inferred> {
    if cell.is_empty() {
        None
    } else if cell.parse::<i64>().is_ok() {
        Some(Inferred::Int)
    } else if cell.parse::<f64>().is_ok() {
        Some(Inferred::Float)
    } else {
        Some(Inferred::Text)
    }
}

fn type_columns(cells: Vec<Vec<String>>, width: usize) -> Vec<Vec<Value>> {
    let kinds: Vec<Inferred> = (0..width)
        .map(|c| {
            cells
                .iter()
                .filter_map(|row| infer(&row[c]))
                .max()
                .unwrap_or(Inferred::Text)
        })
        .collect();

    cells
        .into_iter()
        .map(|row| {
            row.into_iter()
                .zip(&kinds)
                .map(|(cell, kind)| {
                    if cell.is_empty() {
                        return Value::Null;
                    }
                    match kind {
                        Inferred::Int => cell.parse().map_or(Value::Null, Value::Int),
                        Inferred::Float => cell.parse().map_or(Value::Null, Value::Float),
                        Inferred::Text => Value::Text(cell),
                    }
                })
                .collect()
        })
        .collect()
}
