//! Relational store gateway.
//!
//! Ensures destination databases exist and replaces tables wholesale from
//! datasets. Column types come from simple value inference on the dataset; there
//! is no schema negotiation with an existing table, which is dropped first.

use crate::dataset::{ColumnKind, Dataset};
use crate::error::{SyncError, SyncResult};
use crate::io::cloud::helpers::validate_resource_name;
use crate::io::cloud::traits::{ColumnDef, DatabaseIO, ErrorKind, QueryResult, SqlType};
use tracing::{debug, info};

/// Result of [`RelationalStore::ensure_database`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Created,
    Existing,
}

/// A table ready to be written: validated name plus inferred column types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePlan {
    pub table: String,
    pub columns: Vec<ColumnDef>,
}

const fn sql_type(kind: ColumnKind) -> SqlType {
    match kind {
        ColumnKind::Int => SqlType::Integer,
        ColumnKind::Float => SqlType::Real,
        ColumnKind::Text | ColumnKind::Empty => SqlType::Text,
    }
}

pub struct RelationalStore<D> {
    db: D,
}

impl<D: DatabaseIO> RelationalStore<D> {
    pub const fn new(db: D) -> Self {
        Self { db }
    }

    #[must_use]
    pub const fn client(&self) -> &D {
        &self.db
    }

    /// Make sure database `name` exists, creating it if needed.
    ///
    /// Safe when several callers race on the same name: whoever loses the
    /// creation race sees [`Container::Existing`].
    ///
    /// # Errors
    /// Returns [`SyncError::InvalidInput`] for an unusable name, or
    /// [`SyncError::Connectivity`] / [`SyncError::Store`] if the server fails.
    pub fn ensure_database(&self, name: &str) -> SyncResult<Container> {
        validate_resource_name(name).map_err(|e| SyncError::from_cloud("ensure_database", e))?;

        // `_` is a LIKE wildcard, so the lookup may return near-misses.
        let found = self
            .db
            .list_databases(name)
            .map_err(|e| SyncError::from_cloud(format!("look up database {name}"), e))?;
        if found.iter().any(|n| n == name) {
            info!(database = name, "database already exists");
            return Ok(Container::Existing);
        }

        match self.db.create_database(name) {
            Ok(()) => {
                info!(database = name, "database created");
                Ok(Container::Created)
            }
            Err(e) if e.kind == ErrorKind::AlreadyExists => {
                debug!(database = name, "database created concurrently by another client");
                Ok(Container::Existing)
            }
            Err(e) => Err(SyncError::from_cloud(format!("create database {name}"), e)),
        }
    }

    /// Validate `table` and infer destination column types from `dataset`.
    ///
    /// # Errors
    /// Returns [`SyncError::InvalidInput`] for an unusable table name and
    /// [`SyncError::MalformedInput`] for a dataset without columns.
    pub fn plan_table(&self, table: &str, dataset: &Dataset) -> SyncResult<TablePlan> {
        validate_resource_name(table).map_err(|e| SyncError::from_cloud("plan_table", e))?;
        if dataset.num_columns() == 0 {
            return Err(SyncError::MalformedInput(format!(
                "dataset {} has no columns",
                dataset.name()
            )));
        }
        let columns = dataset
            .columns()
            .iter()
            .zip(dataset.column_kinds())
            .map(|(name, kind)| ColumnDef {
                name: name.clone(),
                sql_type: sql_type(*kind),
            })
            .collect();
        Ok(TablePlan {
            table: table.to_string(),
            columns,
        })
    }

    /// Write a planned table, replacing any previous contents.
    ///
    /// # Errors
    /// Returns an error if the store rejects the write.
    pub fn write_table(&self, database: &str, plan: &TablePlan, dataset: &Dataset) -> SyncResult<u64> {
        let written = self
            .db
            .replace_table(database, &plan.table, &plan.columns, dataset.rows())
            .map_err(|e| SyncError::from_cloud(format!("replace_table {database}.{}", plan.table), e))?;
        debug!(database, table = %plan.table, rows = written, "table replaced");
        Ok(written)
    }

    /// Create or fully replace `table` in `database` from `dataset`.
    ///
    /// # Errors
    /// See [`plan_table`](Self::plan_table) and [`write_table`](Self::write_table).
    pub fn replace_table(&self, database: &str, table: &str, dataset: &Dataset) -> SyncResult<()> {
        let plan = self.plan_table(table, dataset)?;
        self.write_table(database, &plan, dataset)?;
        Ok(())
    }

    /// Read a table back as a dataset named after it.
    ///
    /// # Errors
    /// Returns an error if the table is missing or the read fails.
    pub fn read_table(&self, database: &str, table: &str) -> SyncResult<Dataset> {
        let QueryResult { columns, rows } = self
            .db
            .read_table(database, table)
            .map_err(|e| SyncError::from_cloud(format!("read_table {database}.{table}"), e))?;
        Dataset::new(table, columns, rows)
    }
}
