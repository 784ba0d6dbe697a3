//! Generic helpers shared by the transports and gateways.
//!
//! - [`paginate`] - Drain a continuation-token listing to exhaustion
//! - [`validate_resource_name`] - Validate database and table identifiers
//! - [`validate_key_path`] - Validate object keys
//! - [`config_from_env`] - Collect prefixed environment variables

use crate::io::cloud::traits::{CloudIOError, CloudResult, ErrorKind};
use std::collections::HashMap;

// ============================================================================
// Pagination Helper
// ============================================================================

/// How [`paginate`] drives a listing.
#[derive(Debug, Clone, Copy)]
pub struct PaginationConfig {
    pub page_size: usize,
    /// Upper bound on pages fetched. Reaching it with pages still pending is an
    /// error, never a silently truncated result.
    pub max_pages: Option<usize>,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: 1000,
            max_pages: None,
        }
    }
}

/// Fetch every page of a token-based listing and concatenate the items.
///
/// `fetch_page` receives the continuation token from the previous page (`None`
/// for the first) and the page size, and returns the page items plus the next
/// token, `None` once exhausted.
///
/// # Example
/// ```ignore
/// let keys = paginate(&PaginationConfig::default(), |token, size| {
///     let page = client.list_objects_page("bucket", "data/", token, size)?;
///     Ok((page.objects, page.next_token))
/// })?;
/// ```
///
/// # Errors
///
/// Returns an error if any page fetch fails, if a token repeats (the listing
/// would never finish), or if `max_pages` is reached before exhaustion.
pub fn paginate<T, F>(config: &PaginationConfig, mut fetch_page: F) -> CloudResult<Vec<T>>
where
    F: FnMut(Option<&str>, usize) -> CloudResult<(Vec<T>, Option<String>)>,
{
    let mut all_items = Vec::new();
    let mut token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let (items, next) = fetch_page(token.as_deref(), config.page_size.max(1))?;
        all_items.extend(items);
        pages += 1;

        let Some(next) = next else {
            break;
        };

        if token.as_deref() == Some(next.as_str()) {
            return Err(CloudIOError::new(
                ErrorKind::InternalError,
                format!("listing did not advance past token {next:?}"),
            ));
        }

        if let Some(max_pages) = config.max_pages
            && pages >= max_pages
        {
            return Err(CloudIOError::new(
                ErrorKind::InternalError,
                format!("listing still incomplete after {pages} pages"),
            ));
        }

        token = Some(next);
    }

    Ok(all_items)
}

// ============================================================================
// Config Helpers
// ============================================================================

/// Collect every environment variable whose name starts with `prefix`.
///
/// Keys are returned lowercased with the prefix stripped, so `TABLESYNC_BUCKET`
/// becomes `bucket` for prefix `TABLESYNC_`.
#[must_use]
pub fn config_from_env(prefix: &str) -> HashMap<String, String> {
    let mut config = HashMap::new();

    for (key, value) in std::env::vars() {
        if let Some(key_name) = key.strip_prefix(prefix) {
            config.insert(key_name.to_lowercase(), value);
        }
    }

    config
}

// ============================================================================
// Validation Helpers
// ============================================================================

/// Validate a database or table name.
///
/// # Errors
///
/// Returns an error if:
/// - The resource name is empty
/// - The resource name exceeds 64 characters
/// - The resource name contains characters other than ASCII alphanumerics, hyphens, and underscores
pub fn validate_resource_name(name: &str) -> CloudResult<()> {
    if name.is_empty() {
        return Err(CloudIOError::new(
            ErrorKind::InvalidInput,
            "Resource name cannot be empty",
        ));
    }

    if name.len() > 64 {
        return Err(CloudIOError::new(
            ErrorKind::InvalidInput,
            format!("Resource name {name:?} too long (max 64 characters)"),
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(CloudIOError::new(
            ErrorKind::InvalidInput,
            format!("Resource name {name:?} contains invalid characters"),
        ));
    }

    Ok(())
}

/// Validate an object key before it reaches a transport.
///
/// # Errors
///
/// Returns an error if:
/// - The key path is empty
/// - The key path starts with a forward slash
/// - The key path contains a `..` segment
pub fn validate_key_path(path: &str) -> CloudResult<()> {
    if path.is_empty() {
        return Err(CloudIOError::new(
            ErrorKind::InvalidInput,
            "Key path cannot be empty",
        ));
    }

    if path.starts_with('/') {
        return Err(CloudIOError::new(
            ErrorKind::InvalidInput,
            "Key path cannot start with '/'",
        ));
    }

    if path.split('/').any(|seg| seg == "..") {
        return Err(CloudIOError::new(
            ErrorKind::InvalidInput,
            format!("Key path {path:?} contains a '..' segment"),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paginate_follows_tokens() {
        let pages = [(vec![1, 2], Some("b")), (vec![3, 4], Some("d")), (vec![5], None)];
        let mut seen_tokens = Vec::new();
        let mut i = 0;
        let all = paginate(&PaginationConfig::default(), |token, _| {
            seen_tokens.push(token.map(str::to_string));
            let (items, next) = pages[i].clone();
            i += 1;
            Ok((items, next.map(str::to_string)))
        })
        .unwrap();
        assert_eq!(all, vec![1, 2, 3, 4, 5]);
        assert_eq!(
            seen_tokens,
            vec![None, Some("b".to_string()), Some("d".to_string())]
        );
    }

    #[test]
    fn paginate_rejects_stuck_token() {
        let result: CloudResult<Vec<u8>> = paginate(&PaginationConfig::default(), |_, _| {
            Ok((vec![1], Some("same".to_string())))
        });
        assert_eq!(result.unwrap_err().kind, ErrorKind::InternalError);
    }

    #[test]
    fn paginate_max_pages_is_an_error_not_truncation() {
        let config = PaginationConfig {
            page_size: 1,
            max_pages: Some(2),
        };
        let mut n = 0;
        let result: CloudResult<Vec<u32>> = paginate(&config, |_, _| {
            n += 1;
            Ok((vec![n], Some(format!("t{n}"))))
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_resource_name() {
        assert!(validate_resource_name("sales_2024").is_ok());
        assert!(validate_resource_name("my-db").is_ok());
        assert!(validate_resource_name("").is_err());
        assert!(validate_resource_name("drop table;").is_err());
        assert!(validate_resource_name("a.b").is_err());
        assert!(validate_resource_name(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_key_path() {
        assert!(validate_key_path("files/a.parquet").is_ok());
        assert!(validate_key_path("").is_err());
        assert!(validate_key_path("/abs").is_err());
        assert!(validate_key_path("a/../b").is_err());
    }
}
