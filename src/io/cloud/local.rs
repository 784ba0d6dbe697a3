//! Filesystem-backed object storage.
//!
//! Buckets are directories under a root; keys are `/`-separated paths inside the
//! bucket directory. Useful for running the pipeline against a mounted share or a
//! local mirror of a bucket.

use crate::io::cloud::helpers::validate_key_path;
use crate::io::cloud::traits::{
    CloudIOError, CloudResult, ErrorKind, ListPage, ObjectIO, ObjectMetadata, PutAck,
};
use glob::Pattern;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct LocalObjectIO {
    root: PathBuf,
}

impl LocalObjectIO {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self, bucket: &str) -> CloudResult<PathBuf> {
        if bucket.is_empty() || bucket.contains(['/', '\\']) || bucket == ".." {
            return Err(CloudIOError::new(
                ErrorKind::InvalidInput,
                format!("invalid bucket name {bucket:?}"),
            ));
        }
        Ok(self.root.join(bucket))
    }

    fn object_path(&self, bucket: &str, key: &str) -> CloudResult<PathBuf> {
        validate_key_path(key)?;
        let mut path = self.bucket_dir(bucket)?;
        path.extend(key.split('/').filter(|s| !s.is_empty()));
        Ok(path)
    }

    /// Every object key in the bucket, sorted.
    fn all_keys(&self, bucket: &str) -> CloudResult<Vec<(String, u64)>> {
        let dir = self.bucket_dir(bucket)?;
        if !dir.is_dir() {
            return Err(CloudIOError::new(
                ErrorKind::NotFound,
                format!("Bucket {bucket} not found"),
            ));
        }

        let dir_str = dir.to_string_lossy();
        let pattern = format!("{}/**/*", Pattern::escape(&dir_str));
        let entries = glob::glob(&pattern).map_err(|e| {
            CloudIOError::new(ErrorKind::InternalError, format!("bad listing pattern: {e}"))
        })?;

        let mut keys = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| {
                CloudIOError::new(ErrorKind::InternalError, e.to_string())
                    .with_source(e.path().display().to_string())
            })?;
            let meta = fs::metadata(&path)?;
            if !meta.is_file() {
                continue;
            }
            let Ok(rel) = path.strip_prefix(&dir) else {
                continue;
            };
            let key = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            keys.push((key, meta.len()));
        }
        keys.sort();
        Ok(keys)
    }
}

/// Temp name for an in-flight write: the full file name plus `.partial`, so
/// `a.parquet` and `a.csv` never share one.
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

impl ObjectIO for LocalObjectIO {
    fn put_object(&self, bucket: &str, key: &str, data: &[u8]) -> CloudResult<PutAck> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Write beside the target then rename, so readers never see a partial object.
        let tmp = partial_path(&path);
        fs::write(&tmp, data)?;
        fs::rename(&tmp, &path)?;
        Ok(PutAck::ok(None))
    }

    fn get_object(&self, bucket: &str, key: &str) -> CloudResult<Vec<u8>> {
        let path = self.object_path(bucket, key)?;
        fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CloudIOError::new(
                    ErrorKind::NotFound,
                    format!("Object {bucket}/{key} not found"),
                )
            } else {
                e.into()
            }
        })
    }

    fn list_objects_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
        max_keys: usize,
    ) -> CloudResult<ListPage> {
        let mut matching = self
            .all_keys(bucket)?
            .into_iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .filter(|(key, _)| continuation.is_none_or(|after| key.as_str() > after));

        let objects: Vec<ObjectMetadata> = matching
            .by_ref()
            .take(max_keys.max(1))
            .map(|(key, size)| ObjectMetadata {
                key,
                size,
                etag: None,
            })
            .collect();
        let next_token = if matching.next().is_some() {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_path_keeps_the_extension() {
        assert_eq!(
            partial_path(Path::new("bucket/files/a.parquet")),
            Path::new("bucket/files/a.parquet.partial")
        );
        assert_eq!(
            partial_path(Path::new("bucket/files/a.csv")),
            Path::new("bucket/files/a.csv.partial")
        );
        assert_eq!(partial_path(Path::new("bucket/README")), Path::new("bucket/README.partial"));
    }
}
