//! Fake implementations for testing.
//!
//! These implementations use in-memory data structures to simulate the stores,
//! making them ideal for unit testing without external dependencies. Each fake
//! can also be told to misbehave (unreachable, rejected writes, failing tables,
//! creation races) so that failure policy can be exercised deterministically.

use crate::dataset::Value;
use crate::io::cloud::traits::{
    CloudIOError, CloudResult, ColumnDef, DatabaseIO, ErrorKind, ListPage, ObjectIO,
    ObjectMetadata, PutAck, QueryResult,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// Type aliases for complex nested types
type BucketStorage = Arc<Mutex<HashMap<String, BTreeMap<String, Vec<u8>>>>>;
type DatabaseStorage = Arc<Mutex<HashMap<String, HashMap<String, QueryResult>>>>;

fn unreachable_error(what: &str) -> CloudIOError {
    CloudIOError::new(ErrorKind::Network, format!("{what}: connection refused"))
}

// ============================================================================
// FakeObjectIO
// ============================================================================

#[derive(Clone, Default)]
pub struct FakeObjectIO {
    storage: BucketStorage,
    rejected: Arc<Mutex<HashMap<String, u16>>>,
    unreachable: Arc<AtomicBool>,
    max_page_size: Arc<AtomicUsize>,
    list_calls: Arc<AtomicUsize>,
}

impl FakeObjectIO {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap every listing page at `size` objects, whatever the caller asks for.
    #[must_use]
    pub fn with_page_size(self, size: usize) -> Self {
        self.max_page_size.store(size, Ordering::SeqCst);
        self
    }

    /// Create an empty bucket.
    ///
    /// # Panics
    ///
    /// Panics if the storage mutex is poisoned.
    pub fn create_bucket(&self, bucket: &str) {
        self.storage
            .lock()
            .expect("storage mutex poisoned")
            .entry(bucket.to_string())
            .or_default();
    }

    /// Answer writes to `key` with `status_code` instead of storing them.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned.
    pub fn reject_key(&self, key: &str, status_code: u16) {
        self.rejected
            .lock()
            .expect("rejected mutex poisoned")
            .insert(key.to_string(), status_code);
    }

    /// Make every call fail as if the endpoint were down.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Remove an object, e.g. to simulate deletion between list and fetch.
    ///
    /// # Panics
    ///
    /// Panics if the storage mutex is poisoned.
    pub fn remove(&self, bucket: &str, key: &str) {
        if let Some(objects) = self
            .storage
            .lock()
            .expect("storage mutex poisoned")
            .get_mut(bucket)
        {
            objects.remove(key);
        }
    }

    /// All keys currently stored in `bucket`, sorted.
    ///
    /// # Panics
    ///
    /// Panics if the storage mutex is poisoned.
    #[must_use]
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.storage
            .lock()
            .expect("storage mutex poisoned")
            .get(bucket)
            .map(|b| b.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of listing pages served so far.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn check_reachable(&self, what: &str) -> CloudResult<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(unreachable_error(what));
        }
        Ok(())
    }
}

impl ObjectIO for FakeObjectIO {
    fn put_object(&self, bucket: &str, key: &str, data: &[u8]) -> CloudResult<PutAck> {
        self.check_reachable("put_object")?;
        if let Some(&status_code) = self
            .rejected
            .lock()
            .expect("rejected mutex poisoned")
            .get(key)
        {
            return Ok(PutAck {
                status_code,
                etag: None,
            });
        }
        self.storage
            .lock()
            .expect("storage mutex poisoned")
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), data.to_vec());
        Ok(PutAck::ok(Some(format!("etag-{key}"))))
    }

    fn get_object(&self, bucket: &str, key: &str) -> CloudResult<Vec<u8>> {
        self.check_reachable("get_object")?;
        let storage = self.storage.lock().expect("storage mutex poisoned");
        storage
            .get(bucket)
            .and_then(|b| b.get(key))
            .cloned()
            .ok_or_else(|| {
                CloudIOError::new(
                    ErrorKind::NotFound,
                    format!("Object {bucket}/{key} not found"),
                )
            })
    }

    fn list_objects_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
        max_keys: usize,
    ) -> CloudResult<ListPage> {
        self.check_reachable("list_objects")?;
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let cap = match self.max_page_size.load(Ordering::SeqCst) {
            0 => max_keys,
            n => n.min(max_keys),
        }
        .max(1);

        let storage = self.storage.lock().expect("storage mutex poisoned");
        let bucket_map = storage.get(bucket).ok_or_else(|| {
            CloudIOError::new(ErrorKind::NotFound, format!("Bucket {bucket} not found"))
        })?;

        let mut matching = bucket_map
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .filter(|(key, _)| continuation.is_none_or(|after| key.as_str() > after));

        let objects: Vec<ObjectMetadata> = matching
            .by_ref()
            .take(cap)
            .map(|(key, data)| ObjectMetadata {
                key: key.clone(),
                size: data.len() as u64,
                etag: Some(format!("etag-{key}")),
            })
            .collect();
        let more = matching.next().is_some();
        drop(storage);

        let next_token = if more {
            objects.last().map(|o| o.key.clone())
        } else {
            None
        };
        Ok(ListPage {
            objects,
            next_token,
        })
    }
}

// ============================================================================
// FakeDatabaseIO
// ============================================================================

#[derive(Clone, Default)]
pub struct FakeDatabaseIO {
    databases: DatabaseStorage,
    failing_tables: Arc<Mutex<HashSet<String>>>,
    racing: Arc<Mutex<HashSet<String>>>,
    unreachable: Arc<AtomicBool>,
    create_calls: Arc<AtomicUsize>,
}

impl FakeDatabaseIO {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-create a database.
    ///
    /// # Panics
    ///
    /// Panics if the databases mutex is poisoned.
    pub fn add_database(&self, name: &str) {
        self.databases
            .lock()
            .expect("databases mutex poisoned")
            .entry(name.to_string())
            .or_default();
    }

    /// Make every write to `table` fail.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned.
    pub fn fail_table(&self, table: &str) {
        self.failing_tables
            .lock()
            .expect("failing tables mutex poisoned")
            .insert(table.to_string());
    }

    /// Simulate another client creating `name` right after our next lookup:
    /// the lookup misses it, the following create finds it already there.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned.
    pub fn race_creation(&self, name: &str) {
        self.racing
            .lock()
            .expect("racing mutex poisoned")
            .insert(name.to_string());
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Number of databases that exist with exactly this name (0 or 1).
    ///
    /// # Panics
    ///
    /// Panics if the databases mutex is poisoned.
    #[must_use]
    pub fn database_count(&self, name: &str) -> usize {
        usize::from(
            self.databases
                .lock()
                .expect("databases mutex poisoned")
                .contains_key(name),
        )
    }

    /// Number of `create_database` calls that actually created something.
    #[must_use]
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Table names in `database`, sorted.
    ///
    /// # Panics
    ///
    /// Panics if the databases mutex is poisoned.
    #[must_use]
    pub fn tables(&self, database: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .databases
            .lock()
            .expect("databases mutex poisoned")
            .get(database)
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    fn check_reachable(&self, what: &str) -> CloudResult<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(unreachable_error(what));
        }
        Ok(())
    }
}

/// SQL `LIKE` matching with `%` (any run) and `_` (any one char).
fn like_matches(pattern: &[char], text: &[char]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some((&'%', rest)) => (0..=text.len()).any(|i| like_matches(rest, &text[i..])),
        Some((&'_', rest)) => !text.is_empty() && like_matches(rest, &text[1..]),
        Some((c, rest)) => text.first() == Some(c) && like_matches(rest, &text[1..]),
    }
}

impl DatabaseIO for FakeDatabaseIO {
    fn list_databases(&self, pattern: &str) -> CloudResult<Vec<String>> {
        self.check_reachable("list_databases")?;
        let pattern: Vec<char> = pattern.chars().collect();
        let mut databases = self.databases.lock().expect("databases mutex poisoned");

        // A pending race: the other client's database lands just after this lookup.
        let raced: Vec<String> = self
            .racing
            .lock()
            .expect("racing mutex poisoned")
            .drain()
            .collect();

        let mut names: Vec<String> = databases
            .keys()
            .filter(|name| like_matches(&pattern, &name.chars().collect::<Vec<_>>()))
            .cloned()
            .collect();
        names.sort();

        for name in raced {
            databases.entry(name).or_default();
        }
        drop(databases);
        Ok(names)
    }

    fn create_database(&self, name: &str) -> CloudResult<()> {
        self.check_reachable("create_database")?;
        let mut databases = self.databases.lock().expect("databases mutex poisoned");
        if databases.contains_key(name) {
            return Err(CloudIOError::new(
                ErrorKind::AlreadyExists,
                format!("Database {name} already exists"),
            ));
        }
        databases.insert(name.to_string(), HashMap::new());
        drop(databases);
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn replace_table(
        &self,
        database: &str,
        table: &str,
        columns: &[ColumnDef],
        rows: &[Vec<Value>],
    ) -> CloudResult<u64> {
        self.check_reachable("replace_table")?;
        if self
            .failing_tables
            .lock()
            .expect("failing tables mutex poisoned")
            .contains(table)
        {
            return Err(CloudIOError::new(
                ErrorKind::InternalError,
                format!("write to {database}.{table} failed"),
            ));
        }

        let mut databases = self.databases.lock().expect("databases mutex poisoned");
        let tables = databases.get_mut(database).ok_or_else(|| {
            CloudIOError::new(
                ErrorKind::NotFound,
                format!("Database {database} not found"),
            )
        })?;
        tables.insert(
            table.to_string(),
            QueryResult {
                columns: columns.iter().map(|c| c.name.clone()).collect(),
                rows: rows.to_vec(),
            },
        );
        drop(databases);
        Ok(rows.len() as u64)
    }

    fn read_table(&self, database: &str, table: &str) -> CloudResult<QueryResult> {
        self.check_reachable("read_table")?;
        self.databases
            .lock()
            .expect("databases mutex poisoned")
            .get(database)
            .and_then(|t| t.get(table))
            .cloned()
            .ok_or_else(|| {
                CloudIOError::new(
                    ErrorKind::NotFound,
                    format!("Table {database}.{table} not found"),
                )
            })
    }
}
