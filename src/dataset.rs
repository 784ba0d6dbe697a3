//! In-memory tables and transfer batches.
//!
//! A [`Dataset`] is the unit of transfer: a named table with ordered columns and
//! positional rows. It is validated once at construction and never mutated after.
//! A [`TransferBatch`] pairs datasets with their destination names, in order.

use crate::error::{SyncError, SyncResult};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// A single scalar cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// The single kind shared by every non-null value of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnKind {
    /// Every value is null (or the dataset has no rows).
    Empty,
    Int,
    Float,
    Text,
}

/// A named table with ordered columns and rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    name: String,
    columns: Vec<String>,
    kinds: Vec<ColumnKind>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Build a dataset, checking its shape and normalizing column kinds.
    ///
    /// A column holding both integers and floats is widened to floats. A column
    /// mixing text with numbers is rejected, as is any row whose width differs from
    /// the header.
    ///
    /// # Errors
    /// Returns [`SyncError::MalformedInput`] if the name is empty, a column name is
    /// repeated, a row has the wrong width, or a column mixes text and numbers.
    pub fn new(
        name: impl Into<String>,
        columns: Vec<String>,
        mut rows: Vec<Vec<Value>>,
    ) -> SyncResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(SyncError::MalformedInput("dataset name is empty".into()));
        }

        let mut seen = HashSet::with_capacity(columns.len());
        for col in &columns {
            if !seen.insert(col.as_str()) {
                return Err(SyncError::MalformedInput(format!(
                    "dataset {name}: duplicate column {col:?}"
                )));
            }
        }

        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(SyncError::MalformedInput(format!(
                    "dataset {name}: row {} has {} values, expected {}",
                    i + 1,
                    row.len(),
                    columns.len()
                )));
            }
        }

        let mut kinds = Vec::with_capacity(columns.len());
        for (c, col) in columns.iter().enumerate() {
            let kind = column_kind(&rows, c).ok_or_else(|| {
                SyncError::MalformedInput(format!(
                    "dataset {name}: column {col:?} mixes text and numeric values"
                ))
            })?;
            if kind == ColumnKind::Float {
                widen_to_float(&mut rows, c);
            }
            kinds.push(kind);
        }

        Ok(Self {
            name,
            columns,
            kinds,
            rows,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn column_kinds(&self) -> &[ColumnKind] {
        &self.kinds
    }

    #[must_use]
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Look up one cell by row index and column name.
    #[must_use]
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let c = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[c])
    }

    /// Iterate one row as `(column, value)` pairs in column order.
    pub fn record(&self, row: usize) -> impl Iterator<Item = (&str, &Value)> {
        self.rows
            .get(row)
            .into_iter()
            .flat_map(|r| self.columns.iter().map(String::as_str).zip(r.iter()))
    }
}

fn column_kind(rows: &[Vec<Value>], c: usize) -> Option<ColumnKind> {
    let (mut ints, mut floats, mut texts) = (false, false, false);
    for row in rows {
        match &row[c] {
            Value::Null => {}
            Value::Int(_) => ints = true,
            Value::Float(_) => floats = true,
            Value::Text(_) => texts = true,
        }
    }
    match (texts, ints || floats) {
        (true, true) => None,
        (true, false) => Some(ColumnKind::Text),
        (false, true) if floats => Some(ColumnKind::Float),
        (false, true) => Some(ColumnKind::Int),
        (false, false) => Some(ColumnKind::Empty),
    }
}

#[allow(clippy::cast_precision_loss)]
fn widen_to_float(rows: &mut [Vec<Value>], c: usize) {
    for row in rows {
        if let Value::Int(v) = row[c] {
            row[c] = Value::Float(v as f64);
        }
    }
}

/// Derive a dataset name from a file path or object key: the final `/`-separated
/// segment with one trailing extension removed.
#[must_use]
pub fn dataset_name_from_path(path: &str) -> String {
    let segment = path
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(path);
    match segment.rfind('.') {
        Some(dot) if dot > 0 => segment[..dot].to_string(),
        _ => segment.to_string(),
    }
}

/// Build `<prefix>/<name>.<ext>`. An empty prefix yields `<name>.<ext>`.
#[must_use]
pub fn object_key(prefix: &str, name: &str, ext: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let ext = ext.trim_start_matches('.');
    if prefix.is_empty() {
        format!("{name}.{ext}")
    } else {
        format!("{prefix}/{name}.{ext}")
    }
}

/// One dataset bound for one destination.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferItem {
    pub dataset: Dataset,
    pub destination: String,
}

/// Ordered, independent items processed by a single pipeline invocation.
///
/// Destinations are unique within a batch. Order only fixes reporting order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferBatch {
    items: Vec<TransferItem>,
}

impl TransferBatch {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Each dataset goes to the destination carrying its own name.
    ///
    /// # Errors
    /// Returns [`SyncError::DuplicateName`] if two datasets share a name.
    pub fn from_datasets(datasets: impl IntoIterator<Item = Dataset>) -> SyncResult<Self> {
        let mut batch = Self::new();
        for ds in datasets {
            let dest = ds.name().to_string();
            batch.push(ds, dest)?;
        }
        Ok(batch)
    }

    /// Pair datasets with destination names positionally.
    ///
    /// # Errors
    /// Returns [`SyncError::InvalidInput`] if the lengths differ and
    /// [`SyncError::DuplicateName`] if a destination repeats.
    pub fn zip(datasets: Vec<Dataset>, names: Vec<String>) -> SyncResult<Self> {
        if datasets.len() != names.len() {
            return Err(SyncError::InvalidInput(format!(
                "{} datasets but {} names",
                datasets.len(),
                names.len()
            )));
        }
        let mut batch = Self::new();
        for (ds, name) in datasets.into_iter().zip(names) {
            batch.push(ds, name)?;
        }
        Ok(batch)
    }

    /// Append one item.
    ///
    /// # Errors
    /// Returns [`SyncError::DuplicateName`] if the destination is already taken.
    pub fn push(&mut self, dataset: Dataset, destination: impl Into<String>) -> SyncResult<()> {
        let destination = destination.into();
        if self.items.iter().any(|i| i.destination == destination) {
            return Err(SyncError::DuplicateName(destination));
        }
        self.items.push(TransferItem {
            dataset,
            destination,
        });
        Ok(())
    }

    #[must_use]
    pub fn items(&self) -> &[TransferItem] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|i| i.destination.as_str())
    }

    #[must_use]
    pub fn get(&self, destination: &str) -> Option<&Dataset> {
        self.items
            .iter()
            .find(|i| i.destination == destination)
            .map(|i| &i.dataset)
    }

    #[must_use]
    pub fn into_datasets(self) -> Vec<Dataset> {
        self.items.into_iter().map(|i| i.dataset).collect()
    }
}
