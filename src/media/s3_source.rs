//! S3-backed media source implementation.
//!
//! This module provides an implementation of `MediaSource` that creates
//! `S3RangeReader` instances for videos stored in S3 or S3-compatible storage.

use async_trait::async_trait;
use aws_sdk_s3::Client;

use super::{resource_segments, MediaSource};
use crate::error::IoError;
use crate::io::S3RangeReader;

/// S3-backed implementation of `MediaSource`.
///
/// The resource reference, prefixed with the optional key prefix, is the
/// object key within the bucket.
///
/// # Example
///
/// ```ignore
/// use media_gate::media::S3MediaSource;
/// use media_gate::io::create_s3_client;
///
/// let client = create_s3_client(None, "us-east-1").await;
/// let source = S3MediaSource::new(client, "my-bucket".to_string());
///
/// // The resource "videos/intro.mp4" becomes the S3 key
/// let reader = source.open("videos/intro.mp4").await?;
/// ```
#[derive(Clone)]
pub struct S3MediaSource {
    client: Client,
    bucket: String,
    prefix: Option<String>,
}

impl S3MediaSource {
    /// Create a new S3MediaSource for the given bucket.
    pub fn new(client: Client, bucket: String) -> Self {
        Self {
            client,
            bucket,
            prefix: None,
        }
    }

    /// Store all resources under `prefix` (e.g. "media/").
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.prefix = if prefix.is_empty() {
            None
        } else {
            Some(prefix.trim_end_matches('/').to_string())
        };
        self
    }

    /// Get the bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Map a resource reference to its object key.
    pub fn object_key(&self, resource: &str) -> Result<String, IoError> {
        resource_segments(resource)?;
        Ok(match &self.prefix {
            Some(prefix) => format!("{}/{}", prefix, resource),
            None => resource.to_string(),
        })
    }
}

#[async_trait]
impl MediaSource for S3MediaSource {
    type Reader = S3RangeReader;

    async fn open(&self, resource: &str) -> Result<Self::Reader, IoError> {
        let key = self.object_key(resource)?;
        S3RangeReader::open(self.client.clone(), self.bucket.as_str(), key).await
    }
}
