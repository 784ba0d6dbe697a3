//! Parquet encoding for datasets.
//!
//! - [`encode_parquet`] writes a [`Dataset`] into an in-memory Parquet file
//! - [`decode_parquet`] reads a Parquet file back into a [`Dataset`]
//!
//! The Arrow schema is derived from the dataset's column kinds: integers map to
//! `Int64`, floats to `Float64`, and text (or all-null) columns to `Utf8`. Every
//! field is nullable. On the way back, any integer type is read as `Int`, any
//! float type as `Float`, and everything else is cast to text. A value the cast
//! cannot represent (a `UInt64` above `i64::MAX`, say) is a codec error, never a
//! silent null.

use crate::dataset::{ColumnKind, Dataset, Value};
use crate::error::{SyncError, SyncResult};
use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::compute::{CastOptions, cast_with_options};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::arrow_writer::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::sync::Arc;

/// File extension used for encoded objects.
pub const PARQUET_EXTENSION: &str = "parquet";

const fn arrow_type(kind: ColumnKind) -> DataType {
    match kind {
        ColumnKind::Int => DataType::Int64,
        ColumnKind::Float => DataType::Float64,
        ColumnKind::Text | ColumnKind::Empty => DataType::Utf8,
    }
}

fn build_column(ds: &Dataset, c: usize) -> ArrayRef {
    let cells = ds.rows().iter().map(|row| &row[c]);
    match ds.column_kinds()[c] {
        ColumnKind::Int => Arc::new(
            cells
                .map(|v| match v {
                    Value::Int(i) => Some(*i),
                    _ => None,
                })
                .collect::<Int64Array>(),
        ),
        ColumnKind::Float => Arc::new(
            cells
                .map(|v| match v {
                    Value::Float(f) => Some(*f),
                    _ => None,
                })
                .collect::<Float64Array>(),
        ),
        ColumnKind::Text | ColumnKind::Empty => Arc::new(
            cells
                .map(Value::as_text)
                .collect::<StringArray>(),
        ),
    }
}

/// Serialize a dataset into Parquet bytes.
///
/// Works for zero-row datasets too: the schema is still written.
///
/// # Errors
/// Returns [`SyncError::MalformedInput`] for a dataset without columns and
/// [`SyncError::Codec`] if the batch cannot be assembled or written.
pub fn encode_parquet(ds: &Dataset) -> SyncResult<Vec<u8>> {
    if ds.num_columns() == 0 {
        return Err(SyncError::MalformedInput(format!(
            "dataset {} has no columns",
            ds.name()
        )));
    }
    let fields: Vec<Field> = ds
        .columns()
        .iter()
        .zip(ds.column_kinds())
        .map(|(name, kind)| Field::new(name, arrow_type(*kind), true))
        .collect();
    let schema = Arc::new(Schema::new(fields));
    let arrays: Vec<ArrayRef> = (0..ds.num_columns()).map(|c| build_column(ds, c)).collect();

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let batch = RecordBatch::try_new(Arc::clone(&schema), arrays)?;
    let mut writer = ArrowWriter::try_new(Vec::new(), schema, Some(props))?;
    writer.write(&batch)?;
    Ok(writer.into_inner()?)
}

fn read_column(array: &ArrayRef, out: &mut [Vec<Value>], offset: usize) -> SyncResult<()> {
    let target = match array.data_type() {
        t if t.is_integer() => DataType::Int64,
        t if t.is_floating() => DataType::Float64,
        _ => DataType::Utf8,
    };
    let array = if array.data_type() == &target {
        Arc::clone(array)
    } else {
        let options = CastOptions {
            safe: false,
            ..CastOptions::default()
        };
        cast_with_options(array, &target, &options)?
    };

    let len = array.len();
    let rows = &mut out[offset..offset + len];
    match target {
        DataType::Int64 => {
            let a = downcast::<Int64Array>(&array)?;
            for (i, row) in rows.iter_mut().enumerate() {
                row.push(if a.is_null(i) { Value::Null } else { Value::Int(a.value(i)) });
            }
        }
        DataType::Float64 => {
            let a = downcast::<Float64Array>(&array)?;
            for (i, row) in rows.iter_mut().enumerate() {
                row.push(if a.is_null(i) { Value::Null } else { Value::Float(a.value(i)) });
            }
        }
        _ => {
            let a = downcast::<StringArray>(&array)?;
            for (i, row) in rows.iter_mut().enumerate() {
                row.push(if a.is_null(i) {
                    Value::Null
                } else {
                    Value::Text(a.value(i).to_string())
                });
            }
        }
    }
    Ok(())
}

fn downcast<T: 'static>(array: &ArrayRef) -> SyncResult<&T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| SyncError::Codec(format!("unexpected array type {}", array.data_type())))
}

/// Read Parquet bytes into a dataset named `name`.
///
/// # Errors
/// Returns [`SyncError::Codec`] if the bytes are not a readable Parquet file, or
/// [`SyncError::MalformedInput`] if the decoded table is not a valid dataset.
pub fn decode_parquet(name: &str, data: impl Into<Bytes>) -> SyncResult<Dataset> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(data.into())?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let total = usize::try_from(builder.metadata().file_metadata().num_rows())
        .map_err(|e| SyncError::Codec(format!("row count: {e}")))?;
    let reader = builder.build()?;

    let mut rows: Vec<Vec<Value>> = (0..total)
        .map(|_| Vec::with_capacity(columns.len()))
        .collect();
    let mut offset = 0usize;
    for batch in reader {
        let batch = batch?;
        if offset + batch.num_rows() > rows.len() {
            rows.resize_with(offset + batch.num_rows(), Vec::new);
        }
        for array in batch.columns() {
            read_column(array, &mut rows, offset)?;
        }
        offset += batch.num_rows();
    }
    rows.truncate(offset);

    Dataset::new(name, columns, rows)
}
