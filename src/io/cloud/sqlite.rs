//! `SQLite`-backed relational store.
//!
//! Each database is one file, `<root>/<name>.db`. Existence lookups are a name
//! pattern match over the root directory, and creation uses create-new file
//! semantics so that two clients racing on the same name resolve to exactly one
//! creator. Connections are opened lazily and reused for the life of the handle.

use crate::dataset::Value;
use crate::io::cloud::helpers::validate_resource_name;
use crate::io::cloud::traits::{
    CloudIOError, CloudResult, ColumnDef, DatabaseIO, ErrorKind, QueryResult,
};
use glob::Pattern;
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{Connection, OpenFlags, ToSql};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::debug;

const DB_EXTENSION: &str = "db";

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Self::Int(v) => ToSqlOutput::Borrowed(ValueRef::Integer(*v)),
            Self::Float(v) => ToSqlOutput::Borrowed(ValueRef::Real(*v)),
            Self::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

fn value_from_sql(value: ValueRef<'_>) -> CloudResult<Value> {
    Ok(match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::Int(v),
        ValueRef::Real(v) => Value::Float(v),
        ValueRef::Text(bytes) => Value::Text(
            std::str::from_utf8(bytes)
                .map_err(|e| CloudIOError::new(ErrorKind::InvalidInput, e.to_string()))?
                .to_string(),
        ),
        ValueRef::Blob(_) => {
            return Err(CloudIOError::new(
                ErrorKind::InvalidInput,
                "blob columns are not supported",
            ));
        }
    })
}

fn sqlite_error(operation: &str, err: &rusqlite::Error) -> CloudIOError {
    let kind = match err.sqlite_error_code() {
        Some(rusqlite::ErrorCode::CannotOpen) => ErrorKind::Network,
        Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked) => {
            ErrorKind::ServiceUnavailable
        }
        _ => ErrorKind::InternalError,
    };
    CloudIOError::new(kind, format!("{operation}: {err}"))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Translate a SQL `LIKE` pattern into a glob pattern over file stems.
fn like_to_glob(pattern: &str) -> CloudResult<Pattern> {
    let mut out = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        match c {
            '%' => out.push('*'),
            '_' => out.push('?'),
            other => out.push_str(&Pattern::escape(&other.to_string())),
        }
    }
    Pattern::new(&out).map_err(|e| CloudIOError::new(ErrorKind::InvalidInput, e.to_string()))
}

pub struct SqliteDatabaseIO {
    root: PathBuf,
    connections: RefCell<HashMap<String, Connection>>,
}

impl SqliteDatabaseIO {
    /// Open a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> CloudResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            connections: RefCell::new(HashMap::new()),
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn db_path(&self, name: &str) -> CloudResult<PathBuf> {
        validate_resource_name(name)?;
        Ok(self.root.join(format!("{name}.{DB_EXTENSION}")))
    }

    fn with_connection<T>(
        &self,
        database: &str,
        f: impl FnOnce(&mut Connection) -> CloudResult<T>,
    ) -> CloudResult<T> {
        let mut connections = self.connections.borrow_mut();
        if !connections.contains_key(database) {
            let path = self.db_path(database)?;
            if !path.is_file() {
                return Err(CloudIOError::new(
                    ErrorKind::NotFound,
                    format!("Database {database} not found"),
                ));
            }
            let conn = Connection::open_with_flags(
                &path,
                OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .map_err(|e| sqlite_error("open", &e))?;
            debug!(database, path = %path.display(), "opened sqlite connection");
            connections.insert(database.to_string(), conn);
        }
        let conn = connections
            .get_mut(database)
            .ok_or_else(|| CloudIOError::new(ErrorKind::InternalError, "connection cache miss"))?;
        f(conn)
    }
}

impl DatabaseIO for SqliteDatabaseIO {
    fn list_databases(&self, pattern: &str) -> CloudResult<Vec<String>> {
        let matcher = like_to_glob(pattern)?;
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(DB_EXTENSION) || !path.is_file()
            {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                && matcher.matches(stem)
            {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn create_database(&self, name: &str) -> CloudResult<()> {
        let path = self.db_path(name)?;
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    CloudIOError::new(
                        ErrorKind::AlreadyExists,
                        format!("Database {name} already exists"),
                    )
                } else {
                    e.into()
                }
            })?;
        Ok(())
    }

    fn replace_table(
        &self,
        database: &str,
        table: &str,
        columns: &[ColumnDef],
        rows: &[Vec<Value>],
    ) -> CloudResult<u64> {
        validate_resource_name(table)?;
        let table_ident = quote_ident(table);
        let column_sql = columns
            .iter()
            .map(|c| format!("{} {}", quote_ident(&c.name), c.sql_type.as_sql()))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; columns.len()].join(", ");

        self.with_connection(database, |conn| {
            let tx = conn
                .transaction()
                .map_err(|e| sqlite_error("begin", &e))?;
            tx.execute(&format!("DROP TABLE IF EXISTS {table_ident}"), [])
                .map_err(|e| sqlite_error("drop table", &e))?;
            tx.execute(&format!("CREATE TABLE {table_ident} ({column_sql})"), [])
                .map_err(|e| sqlite_error("create table", &e))?;
            {
                let mut stmt = tx
                    .prepare(&format!(
                        "INSERT INTO {table_ident} VALUES ({placeholders})"
                    ))
                    .map_err(|e| sqlite_error("prepare insert", &e))?;
                for row in rows {
                    stmt.execute(rusqlite::params_from_iter(row.iter()))
                        .map_err(|e| sqlite_error("insert", &e))?;
                }
            }
            tx.commit().map_err(|e| sqlite_error("commit", &e))?;
            Ok(rows.len() as u64)
        })
    }

    fn read_table(&self, database: &str, table: &str) -> CloudResult<QueryResult> {
        validate_resource_name(table)?;
        self.with_connection(database, |conn| {
            let mut stmt = conn
                .prepare(&format!("SELECT * FROM {}", quote_ident(table)))
                .map_err(|e| {
                    if e.to_string().contains("no such table") {
                        CloudIOError::new(
                            ErrorKind::NotFound,
                            format!("Table {database}.{table} not found"),
                        )
                    } else {
                        sqlite_error("select", &e)
                    }
                })?;
            let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
            let width = columns.len();
            let mut cursor = stmt.query([]).map_err(|e| sqlite_error("select", &e))?;
            let mut rows = Vec::new();
            while let Some(row) = cursor.next().map_err(|e| sqlite_error("select", &e))? {
                let mut values = Vec::with_capacity(width);
                for i in 0..width {
                    let v = row.get_ref(i).map_err(|e| sqlite_error("select", &e))?;
                    values.push(value_from_sql(v)?);
                }
                rows.push(values);
            }
            Ok(QueryResult { columns, rows })
        })
    }
}
