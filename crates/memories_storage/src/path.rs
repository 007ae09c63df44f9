//! Storage key derivation.
//!
//! Every object lives at `events/{namespace}/{unix_millis}-{sanitized_name}`.
//! Keys are unique only down to millisecond granularity: two uploads of the
//! same name into the same namespace within one millisecond derive the same
//! key, and the second write is refused by the backend.

use chrono::{DateTime, Utc};
use memories_error::{StorageError, StorageErrorKind};

/// Root of every namespace prefix.
pub const KEY_ROOT: &str = "events";

/// Replace every character outside `[A-Za-z0-9.-]` with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Derive the storage key for a new upload.
///
/// Pure: identical inputs at the same millisecond give the same key.
pub fn derive_key(namespace: &str, original_name: &str, now: DateTime<Utc>) -> String {
    format!(
        "{}{}-{}",
        namespace_prefix(namespace),
        now.timestamp_millis(),
        sanitize_file_name(original_name)
    )
}

/// Listing prefix for a namespace, with trailing slash.
pub fn namespace_prefix(namespace: &str) -> String {
    format!("{}/{}/", KEY_ROOT, namespace)
}

/// Full key for a storage-relative file name.
pub fn object_key(namespace: &str, file_name: &str) -> String {
    format!("{}{}", namespace_prefix(namespace), file_name)
}

/// Storage-relative name of a key inside `namespace`, if it belongs there.
pub fn relative_name<'a>(namespace: &str, key: &'a str) -> Option<&'a str> {
    key.strip_prefix(KEY_ROOT)?
        .strip_prefix('/')?
        .strip_prefix(namespace)?
        .strip_prefix('/')
        .filter(|name| !name.is_empty())
}

/// Split a storage-relative name into its upload time and sanitized original name.
pub fn split_stored_name(name: &str) -> Option<(DateTime<Utc>, &str)> {
    let (millis, rest) = name.split_once('-')?;
    if millis.is_empty() || !millis.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let at = DateTime::<Utc>::from_timestamp_millis(millis.parse().ok()?)?;
    Some((at, rest))
}

/// Reject namespaces that would escape or share another namespace's prefix.
pub fn check_namespace(namespace: &str) -> Result<(), StorageError> {
    if namespace.is_empty() {
        return Err(invalid("namespace must not be empty"));
    }
    if namespace.contains('/') || namespace == "." || namespace == ".." {
        return Err(invalid(format!("invalid namespace: {}", namespace)));
    }
    Ok(())
}

/// Reject storage-relative names that are not a single path segment.
pub fn check_file_name(file_name: &str) -> Result<(), StorageError> {
    if file_name.is_empty() {
        return Err(invalid("file name must not be empty"));
    }
    if file_name.contains('/') || file_name == "." || file_name == ".." {
        return Err(invalid(format!("invalid file name: {}", file_name)));
    }
    Ok(())
}

#[track_caller]
fn invalid(reason: impl Into<String>) -> StorageError {
    StorageError::new(StorageErrorKind::InvalidInput(reason.into()))
}
