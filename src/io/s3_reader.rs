//! Range reads against objects in S3 or S3-compatible storage.

use async_trait::async_trait;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::debug;

use super::range_reader::check_bounds;
use super::RangeReader;
use crate::error::IoError;

/// A single S3 object read through `GetObject` range requests.
///
/// Length and stored `Content-Type` come from one `HeadObject` call at open
/// time; every later read fetches exactly the requested span.
#[derive(Clone)]
pub struct S3RangeReader {
    client: Client,
    bucket: String,
    key: String,
    size: u64,
    content_type: Option<String>,
    identifier: String,
}

impl S3RangeReader {
    /// Open `key` in `bucket`.
    ///
    /// Fails with `NotFound` when the object does not exist and with
    /// `Connection` when the storage endpoint cannot be reached.
    pub async fn open(
        client: Client,
        bucket: impl Into<String>,
        key: impl Into<String>,
    ) -> Result<Self, IoError> {
        let bucket = bucket.into();
        let key = key.into();
        let identifier = format!("s3://{}/{}", bucket, key);

        let head = client
            .head_object()
            .bucket(&bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| classify(e, &identifier))?;

        let size = u64::try_from(head.content_length().unwrap_or(0)).unwrap_or(0);
        let content_type = head.content_type().map(str::to_string);

        debug!(object = %identifier, size = size, "Opened S3 object");

        Ok(Self {
            client,
            bucket,
            key,
            size,
            content_type,
            identifier,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

#[async_trait]
impl RangeReader for S3RangeReader {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        check_bounds(offset, len, self.size)?;
        if len == 0 {
            return Ok(Bytes::new());
        }

        let last = offset + len as u64 - 1;
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .range(format!("bytes={}-{}", offset, last))
            .send()
            .await
            .map_err(|e| classify(e, &self.identifier))?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| IoError::Connection(format!("{}: {}", self.identifier, e)))?
            .into_bytes();

        if data.len() != len {
            return Err(IoError::S3(format!(
                "{}: expected {} bytes at offset {}, got {}",
                self.identifier,
                len,
                offset,
                data.len()
            )));
        }

        Ok(data)
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }
}

/// Sort an SDK failure into not-found, unreachable, or other storage errors.
fn classify<E>(err: SdkError<E, HttpResponse>, identifier: &str) -> IoError
where
    E: std::error::Error + Send + Sync + 'static,
{
    match &err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
            IoError::Connection(format!("{}: {}", identifier, err))
        }
        _ if err.raw_response().map(|r| r.status().as_u16()) == Some(404) => {
            IoError::NotFound(identifier.to_string())
        }
        _ => IoError::S3(format!("{}: {}", identifier, err)),
    }
}

/// Build an S3 client for `region`, optionally against a custom endpoint
/// (MinIO and other S3-compatible services, which get path-style addressing).
pub async fn create_s3_client(endpoint_url: Option<&str>, region: &str) -> Client {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(region.to_string()));
    if let Some(endpoint) = endpoint_url {
        loader = loader.endpoint_url(endpoint);
    }
    let shared = loader.load().await;

    let config = aws_sdk_s3::config::Builder::from(&shared)
        .force_path_style(endpoint_url.is_some())
        .build();

    Client::from_conf(config)
}
