// Shared fixtures for the integration tests.
#![allow(dead_code)]

use anyhow::Result;
use std::fs;
use std::path::Path;
use tablesync::{Dataset, Value};

/// Two-column dataset with `n` rows: `id` (int) and `label` (text).
pub fn sample_dataset(name: &str, n: i64) -> Result<Dataset> {
    let rows = (0..n)
        .map(|i| vec![Value::Int(i), Value::from(format!("row-{i}"))])
        .collect();
    Ok(Dataset::new(name, vec!["id".into(), "label".into()], rows)?)
}

/// Dataset covering every column kind, nulls included.
pub fn mixed_dataset(name: &str) -> Result<Dataset> {
    Ok(Dataset::new(
        name,
        vec!["id".into(), "score".into(), "city".into(), "note".into()],
        vec![
            vec![Value::Int(1), Value::Float(1.5), Value::from("Paris"), Value::Null],
            vec![Value::Int(2), Value::Null, Value::from("Orléans"), Value::Null],
            vec![Value::Null, Value::Float(-0.25), Value::Null, Value::Null],
        ],
    )?)
}

/// Write `files` (name, content) into `dir`.
pub fn write_files(dir: &Path, files: &[(&str, &[u8])]) -> Result<()> {
    for (name, content) in files {
        fs::write(dir.join(name), content)?;
    }
    Ok(())
}
