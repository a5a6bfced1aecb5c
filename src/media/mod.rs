//! Protected media storage.
//!
//! A signed URL names a resource; a [`MediaSource`] turns that name into a
//! [`RangeReader`] the stream handler pulls bytes from.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         video_stream_handler            │
//! └────────────────────┬────────────────────┘
//!                      │ resource
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │           MediaSource Trait             │
//! └────────────────────┬────────────────────┘
//!          ┌───────────┴───────────┐
//!          ▼                       ▼
//! ┌─────────────────┐    ┌─────────────────────┐
//! │  FsMediaSource  │    │   S3MediaSource     │
//! │ (FsRangeReader) │    │  (S3RangeReader)    │
//! └─────────────────┘    └─────────────────────┘
//! ```

mod fs_source;
mod range;
mod s3_source;

use async_trait::async_trait;

use crate::error::IoError;
use crate::io::RangeReader;

pub use fs_source::FsMediaSource;
pub use range::ByteRange;
pub use s3_source::S3MediaSource;

/// Default number of bytes sent per ranged response (1 MB).
pub const DEFAULT_STREAM_CHUNK_SIZE: usize = 1_000_000;

/// Opens stored media by resource reference.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// The type of range reader this source creates.
    type Reader: RangeReader + 'static;

    /// Open a reader for `resource` (e.g. "videos/intro.mp4").
    async fn open(&self, resource: &str) -> Result<Self::Reader, IoError>;
}

/// Guess a `Content-Type` from the resource's extension.
pub fn content_type_for(resource: &str) -> &'static str {
    let extension = resource
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "ogv" | "ogg" => "video/ogg",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "m3u8" => "application/vnd.apple.mpegurl",
        "ts" => "video/mp2t",
        "mp3" => "audio/mpeg",
        _ => "application/octet-stream",
    }
}

/// Check a resource reference and split it into path segments.
///
/// References are relative, slash-separated, and may not contain empty,
/// `.` or `..` segments or backslashes.
pub fn resource_segments(resource: &str) -> Result<Vec<&str>, IoError> {
    let invalid = || IoError::InvalidPath(resource.to_string());

    if resource.is_empty() || resource.starts_with('/') || resource.contains('\\') {
        return Err(invalid());
    }

    let segments: Vec<&str> = resource.split('/').collect();
    if segments
        .iter()
        .any(|s| s.is_empty() || *s == "." || *s == ".." || s.contains('\0'))
    {
        return Err(invalid());
    }

    Ok(segments)
}
