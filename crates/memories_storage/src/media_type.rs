//! Media type enumeration.

use serde::{Deserialize, Serialize};

/// Class of media an upload belongs to. Each class has its own size ceiling.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// Still images (JPEG, PNG, WebP, HEIC, ...)
    #[display("image")]
    Image,
    /// Video clips (MP4, QuickTime, AVI, WebM)
    #[display("video")]
    Video,
}

impl MediaType {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }
}

impl std::str::FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(MediaType::Image),
            "video" => Ok(MediaType::Video),
            _ => Err(format!("Unknown media type: {}", s)),
        }
    }
}

/// Normalize a MIME type for allow-list comparison.
///
/// Lowercases, trims, and drops parameters (`video/mp4; codecs=avc1` becomes
/// `video/mp4`).
pub fn normalize_mime(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_round_trip_through_str() {
        for media_type in MediaType::iter() {
            let parsed: MediaType = media_type.as_str().parse().unwrap();
            assert_eq!(parsed, media_type);
            assert_eq!(media_type.to_string(), media_type.as_str());
        }
    }

    #[test]
    fn test_normalize_mime() {
        assert_eq!(normalize_mime("IMAGE/JPEG"), "image/jpeg");
        assert_eq!(normalize_mime(" video/mp4; codecs=avc1 "), "video/mp4");
        assert_eq!(normalize_mime(""), "");
    }
}
