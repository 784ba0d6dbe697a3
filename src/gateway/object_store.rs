//! Object store gateway.
//!
//! Wraps an [`ObjectIO`] transport with the contract the pipeline relies on:
//! writes report success as a plain `bool`, listings are complete (paginated
//! internally until exhausted), and a missing key surfaces as
//! [`SyncError::ObjectNotFound`].

use crate::error::{SyncError, SyncResult};
use crate::io::cloud::helpers::{PaginationConfig, paginate, validate_key_path};
use crate::io::cloud::traits::{ErrorKind, ObjectIO};
use tracing::{debug, warn};

/// Status code a store answers with when a write is durable.
pub const SUCCESS_STATUS: u16 = 200;

pub struct ObjectStore<C> {
    client: C,
    pagination: PaginationConfig,
}

impl<C: ObjectIO> ObjectStore<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            pagination: PaginationConfig::default(),
        }
    }

    /// Number of keys requested per listing page.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.pagination.page_size = page_size.max(1);
        self
    }

    #[must_use]
    pub const fn client(&self) -> &C {
        &self.client
    }

    /// Write a blob. Returns `true` only when the store acknowledges the write
    /// with a success status; any other terminal response, or a transport
    /// failure, yields `false`. Never raises.
    pub fn put(&self, bucket: &str, key: &str, data: &[u8]) -> bool {
        if let Err(e) = validate_key_path(key) {
            warn!(bucket, key, error = %e, "put rejected before sending");
            return false;
        }
        match self.client.put_object(bucket, key, data) {
            Ok(ack) if ack.status_code == SUCCESS_STATUS => {
                debug!(bucket, key, bytes = data.len(), "put acknowledged");
                true
            }
            Ok(ack) => {
                warn!(bucket, key, status = ack.status_code, "put not acknowledged");
                false
            }
            Err(e) => {
                warn!(bucket, key, error = %e, "put failed");
                false
            }
        }
    }

    /// Every key under `key_prefix` ending with `suffix`, in key order.
    ///
    /// # Errors
    /// Returns [`SyncError::Connectivity`] if the store cannot be reached, or
    /// another variant if the listing fails or does not terminate.
    pub fn list(&self, bucket: &str, key_prefix: &str, suffix: &str) -> SyncResult<Vec<String>> {
        let objects = paginate(&self.pagination, |token, page_size| {
            let page = self
                .client
                .list_objects_page(bucket, key_prefix, token, page_size)?;
            Ok((page.objects, page.next_token))
        })
        .map_err(|e| SyncError::from_cloud(format!("list {bucket}/{key_prefix}"), e))?;

        let keys: Vec<String> = objects
            .into_iter()
            .map(|o| o.key)
            .filter(|k| k.ends_with(suffix))
            .collect();
        debug!(bucket, prefix = key_prefix, suffix, count = keys.len(), "listed objects");
        Ok(keys)
    }

    /// Full content of one blob.
    ///
    /// # Errors
    /// Returns [`SyncError::ObjectNotFound`] if the key is absent, or another
    /// variant if the fetch fails.
    pub fn get(&self, bucket: &str, key: &str) -> SyncResult<Vec<u8>> {
        self.client.get_object(bucket, key).map_err(|e| {
            if e.kind == ErrorKind::NotFound {
                SyncError::ObjectNotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                }
            } else {
                SyncError::from_cloud(format!("get {bucket}/{key}"), e)
            }
        })
    }
}
