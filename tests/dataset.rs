mod common;

use anyhow::Result;
use common::sample_dataset;
use tablesync::dataset::{dataset_name_from_path, object_key};
use tablesync::{ColumnKind, Dataset, SyncError, TransferBatch, Value};

#[test]
fn rows_must_match_header_width() {
    let err = Dataset::new(
        "bad",
        vec!["a".into(), "b".into()],
        vec![vec![Value::Int(1), Value::Int(2)], vec![Value::Int(3)]],
    )
    .unwrap_err();
    assert!(matches!(err, SyncError::MalformedInput(msg) if msg.contains("row 2")));
}

#[test]
fn duplicate_columns_and_empty_name_are_rejected() {
    let dup = Dataset::new("d", vec!["a".into(), "a".into()], vec![]);
    assert!(matches!(dup, Err(SyncError::MalformedInput(_))));

    let unnamed = Dataset::new("", vec!["a".into()], vec![]);
    assert!(matches!(unnamed, Err(SyncError::MalformedInput(_))));
}

#[test]
fn int_and_float_widen_to_float() -> Result<()> {
    let ds = Dataset::new(
        "nums",
        vec!["x".into()],
        vec![vec![Value::Int(1)], vec![Value::Float(2.5)], vec![Value::Null]],
    )?;
    assert_eq!(ds.column_kinds(), &[ColumnKind::Float]);
    assert_eq!(ds.value(0, "x"), Some(&Value::Float(1.0)));
    assert_eq!(ds.value(2, "x"), Some(&Value::Null));
    Ok(())
}

#[test]
fn text_mixed_with_numbers_is_rejected() {
    let res = Dataset::new(
        "mixed",
        vec!["x".into()],
        vec![vec![Value::Int(1)], vec![Value::from("one")]],
    );
    assert!(matches!(res, Err(SyncError::MalformedInput(_))));
}

#[test]
fn all_null_column_is_empty_kind() -> Result<()> {
    let ds = Dataset::new("n", vec!["x".into()], vec![vec![Value::Null]])?;
    assert_eq!(ds.column_kinds(), &[ColumnKind::Empty]);
    Ok(())
}

#[test]
fn record_view_pairs_columns_with_values() -> Result<()> {
    let ds = sample_dataset("people", 2)?;
    let record: Vec<(&str, &Value)> = ds.record(1).collect();
    assert_eq!(
        record,
        vec![("id", &Value::Int(1)), ("label", &Value::from("row-1"))]
    );
    assert_eq!(ds.record(5).count(), 0);
    assert_eq!(ds.value(0, "missing"), None);
    Ok(())
}

#[test]
fn names_come_from_final_segment_without_extension() {
    assert_eq!(dataset_name_from_path("files/sales.parquet"), "sales");
    assert_eq!(dataset_name_from_path("a/b/x.tar.parquet"), "x.tar");
    assert_eq!(dataset_name_from_path("data\\final\\Region.CSV"), "Region");
    assert_eq!(dataset_name_from_path("plain"), "plain");
    assert_eq!(dataset_name_from_path(".hidden"), ".hidden");
}

#[test]
fn object_keys_join_prefix_name_and_extension() {
    assert_eq!(object_key("files", "sales", "parquet"), "files/sales.parquet");
    assert_eq!(object_key("/files/", "sales", ".parquet"), "files/sales.parquet");
    assert_eq!(object_key("", "sales", "parquet"), "sales.parquet");
}

#[test]
fn batch_destinations_are_unique() -> Result<()> {
    let mut batch = TransferBatch::new();
    batch.push(sample_dataset("a", 1)?, "t1")?;
    let err = batch.push(sample_dataset("b", 1)?, "t1").unwrap_err();
    assert!(matches!(err, SyncError::DuplicateName(name) if name == "t1"));
    assert_eq!(batch.len(), 1);
    Ok(())
}

#[test]
fn batch_from_datasets_uses_dataset_names() -> Result<()> {
    let batch = TransferBatch::from_datasets([sample_dataset("a", 1)?, sample_dataset("b", 2)?])?;
    assert_eq!(batch.names().collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(batch.get("b").map(Dataset::num_rows), Some(2));

    let dup = TransferBatch::from_datasets([sample_dataset("a", 1)?, sample_dataset("a", 2)?]);
    assert!(matches!(dup, Err(SyncError::DuplicateName(_))));
    Ok(())
}

#[test]
fn batch_zip_requires_equal_lengths() -> Result<()> {
    let res = TransferBatch::zip(vec![sample_dataset("a", 1)?], vec![]);
    assert!(matches!(res, Err(SyncError::InvalidInput(_))));

    let batch = TransferBatch::zip(
        vec![sample_dataset("a", 1)?, sample_dataset("b", 1)?],
        vec!["first".into(), "second".into()],
    )?;
    assert_eq!(batch.names().collect::<Vec<_>>(), vec!["first", "second"]);
    let datasets = batch.into_datasets();
    assert_eq!(datasets[1].name(), "b");
    Ok(())
}
