//! Upload validation policy.
//!
//! Classifies a candidate upload by MIME type and checks its size against the
//! ceiling for its class. Validation is pure and runs before any backend call.

use crate::media_type::{MediaType, normalize_mime};
use memories_error::{StorageError, StorageErrorKind};
use serde::{Deserialize, Serialize};

/// One mebibyte.
pub const MIB: u64 = 1024 * 1024;

/// One gibibyte.
pub const GIB: u64 = 1024 * MIB;

/// Allow-lists, size ceilings and the per-namespace quota.
///
/// # Example
///
/// ```toml
/// [policy]
/// max_image_bytes = 10_485_760
/// max_video_bytes = 104_857_600
/// quota_bytes = 107_374_182_400
/// image_types = ["image/jpeg", "image/png"]
/// video_types = ["video/mp4"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadPolicy {
    /// Accepted image MIME types
    #[serde(default = "default_image_types")]
    pub image_types: Vec<String>,

    /// Accepted video MIME types
    #[serde(default = "default_video_types")]
    pub video_types: Vec<String>,

    /// Largest accepted image, in bytes
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: u64,

    /// Largest accepted video, in bytes
    #[serde(default = "default_max_video_bytes")]
    pub max_video_bytes: u64,

    /// Aggregate bytes allowed per namespace
    #[serde(default = "default_quota_bytes")]
    pub quota_bytes: u64,
}

fn default_image_types() -> Vec<String> {
    [
        "image/jpeg",
        "image/jpg",
        "image/png",
        "image/webp",
        "image/heic",
        "image/heif",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_video_types() -> Vec<String> {
    ["video/mp4", "video/quicktime", "video/x-msvideo", "video/webm"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_max_image_bytes() -> u64 {
    10 * MIB
}

fn default_max_video_bytes() -> u64 {
    100 * MIB
}

fn default_quota_bytes() -> u64 {
    100 * GIB
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            image_types: default_image_types(),
            video_types: default_video_types(),
            max_image_bytes: default_max_image_bytes(),
            max_video_bytes: default_max_video_bytes(),
            quota_bytes: default_quota_bytes(),
        }
    }
}

impl UploadPolicy {
    /// Media class for a MIME type, or `None` if neither allow-list has it.
    pub fn classify(&self, mime_type: &str) -> Option<MediaType> {
        let mime = normalize_mime(mime_type);
        let listed = |types: &[String]| types.iter().any(|t| normalize_mime(t) == mime);

        if listed(&self.image_types) {
            Some(MediaType::Image)
        } else if listed(&self.video_types) {
            Some(MediaType::Video)
        } else {
            None
        }
    }

    /// Size ceiling for a media class, in bytes.
    pub fn ceiling(&self, media_type: MediaType) -> u64 {
        match media_type {
            MediaType::Image => self.max_image_bytes,
            MediaType::Video => self.max_video_bytes,
        }
    }

    /// Accept or reject an upload by type and size.
    ///
    /// # Errors
    ///
    /// - `UnsupportedType` if the MIME type is in neither allow-list, whatever the size
    /// - `TooLarge` with the class ceiling in MiB, rounded up, if `size_bytes` exceeds it
    pub fn validate(&self, mime_type: &str, size_bytes: u64) -> Result<MediaType, StorageError> {
        let media_type = self.classify(mime_type).ok_or_else(|| {
            StorageError::new(StorageErrorKind::UnsupportedType(mime_type.to_string()))
        })?;

        let ceiling = self.ceiling(media_type);
        if size_bytes > ceiling {
            return Err(StorageError::new(StorageErrorKind::TooLarge {
                limit_mib: ceiling.div_ceil(MIB),
            }));
        }

        Ok(media_type)
    }

    /// Check that the policy is usable.
    pub fn validate_settings(&self) -> Result<(), String> {
        if self.image_types.is_empty() && self.video_types.is_empty() {
            return Err("at least one image or video type must be allowed".to_string());
        }
        if self.max_image_bytes == 0 || self.max_video_bytes == 0 {
            return Err("size ceilings must be greater than zero".to_string());
        }
        if self.quota_bytes == 0 {
            return Err("quota_bytes must be greater than zero".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(result: Result<MediaType, StorageError>) -> StorageErrorKind {
        result.unwrap_err().kind
    }

    #[test]
    fn test_unknown_types_rejected_regardless_of_size() {
        let policy = UploadPolicy::default();
        for mime in ["application/pdf", "text/plain", "audio/mpeg", "image/gif", ""] {
            for size in [0, 1, 10 * MIB, u64::MAX] {
                assert!(matches!(
                    kind(policy.validate(mime, size)),
                    StorageErrorKind::UnsupportedType(_)
                ));
            }
        }
    }

    #[test]
    fn test_image_ceiling_is_inclusive() {
        let policy = UploadPolicy::default();
        assert_eq!(
            policy.validate("image/jpeg", 10 * MIB).unwrap(),
            MediaType::Image
        );
        assert_eq!(
            kind(policy.validate("image/jpeg", 10 * MIB + 1)),
            StorageErrorKind::TooLarge { limit_mib: 10 }
        );
    }

    #[test]
    fn test_video_ceiling_is_inclusive() {
        let policy = UploadPolicy::default();
        assert_eq!(
            policy.validate("video/mp4", 100 * MIB).unwrap(),
            MediaType::Video
        );
        assert_eq!(
            kind(policy.validate("video/quicktime", 100 * MIB + 1)),
            StorageErrorKind::TooLarge { limit_mib: 100 }
        );
    }

    #[test]
    fn test_fractional_ceiling_rounds_up() {
        let policy = UploadPolicy {
            max_image_bytes: 5_000_000,
            ..UploadPolicy::default()
        };
        assert_eq!(
            kind(policy.validate("image/png", 5_000_001)),
            StorageErrorKind::TooLarge { limit_mib: 5 }
        );

        let policy = UploadPolicy {
            max_image_bytes: 1000,
            ..UploadPolicy::default()
        };
        assert_eq!(
            kind(policy.validate("image/png", 1001)),
            StorageErrorKind::TooLarge { limit_mib: 1 }
        );
    }

    #[test]
    fn test_image_types_do_not_get_video_ceiling() {
        let policy = UploadPolicy::default();
        assert!(policy.validate("image/png", 50 * MIB).is_err());
        assert!(policy.validate("video/webm", 50 * MIB).is_ok());
    }

    #[test]
    fn test_classify_normalizes() {
        let policy = UploadPolicy::default();
        assert_eq!(policy.classify("IMAGE/HEIC"), Some(MediaType::Image));
        assert_eq!(
            policy.classify("video/mp4; codecs=avc1"),
            Some(MediaType::Video)
        );
        assert_eq!(policy.classify("image/svg+xml"), None);
    }

    #[test]
    fn test_settings_validation() {
        assert!(UploadPolicy::default().validate_settings().is_ok());

        let policy = UploadPolicy {
            quota_bytes: 0,
            ..UploadPolicy::default()
        };
        assert!(policy.validate_settings().is_err());
    }
}
