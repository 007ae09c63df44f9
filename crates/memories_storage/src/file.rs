//! Plain-data types returned to callers.

use crate::MediaType;
use chrono::{DateTime, Utc};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// A URL granting time-limited access to one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct SignedUrl {
    /// The signed URL
    url: String,
    /// Instant after which the backend refuses the URL
    expires_at: DateTime<Utc>,
}

impl SignedUrl {
    pub(crate) fn new(url: String, expires_at: DateTime<Utc>) -> Self {
        Self { url, expires_at }
    }

    /// Whether the URL is still valid at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.url.is_empty() && self.expires_at > now
    }
}

/// A file stored in a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct StoredFile {
    /// Storage-relative name, unique within the namespace. Pass this to
    /// share and delete.
    name: String,
    /// Name the file was uploaded under. Listings can only recover the
    /// sanitized form.
    original_name: String,
    /// Size in bytes
    size: u64,
    /// MIME type
    mime_type: String,
    /// Time-limited read link; `None` if signing failed for this entry
    access_url: Option<SignedUrl>,
    /// Upload time
    created_at: DateTime<Utc>,
}

impl StoredFile {
    pub(crate) fn new(
        name: String,
        original_name: String,
        size: u64,
        mime_type: String,
        access_url: Option<SignedUrl>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name,
            original_name,
            size,
            mime_type,
            access_url,
            created_at,
        }
    }
}

/// Where and how a browser may upload directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct UploadTicket {
    /// Time-limited write URL
    upload_url: SignedUrl,
    /// Full storage key the URL writes to
    storage_key: String,
}

impl UploadTicket {
    pub(crate) fn new(upload_url: SignedUrl, storage_key: String) -> Self {
        Self {
            upload_url,
            storage_key,
        }
    }
}

/// An upload before it is validated and written.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct UploadCandidate {
    /// Name supplied by the uploader
    original_name: String,
    /// MIME type supplied by the uploader
    mime_type: String,
    /// Payload length
    size_bytes: u64,
}

impl UploadCandidate {
    /// Describe an upload of `data`.
    pub fn new(original_name: impl Into<String>, mime_type: impl Into<String>, data: &[u8]) -> Self {
        Self {
            original_name: original_name.into(),
            mime_type: mime_type.into(),
            size_bytes: data.len() as u64,
        }
    }
}

/// Size and type of a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct FileMetadata {
    /// Size in bytes
    size: u64,
    /// Content type
    content_type: String,
    /// Media class, if the content type is allow-listed
    media_type: Option<MediaType>,
}

impl FileMetadata {
    pub(crate) fn new(size: u64, content_type: String, media_type: Option<MediaType>) -> Self {
        Self {
            size,
            content_type,
            media_type,
        }
    }
}
