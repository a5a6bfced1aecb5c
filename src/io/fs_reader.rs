use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::range_reader::check_bounds;
use super::RangeReader;
use crate::error::IoError;

/// Local-file implementation of RangeReader.
///
/// The file size is read once on creation; each read opens the file, seeks
/// and reads exactly the requested span.
#[derive(Debug, Clone)]
pub struct FsRangeReader {
    path: PathBuf,
    size: u64,
    identifier: String,
}

impl FsRangeReader {
    /// Open a reader for `path`, failing with `NotFound` if it is not a regular file.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, IoError> {
        let path = path.into();
        let identifier = format!("file://{}", path.display());

        let metadata = tokio::fs::metadata(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => IoError::NotFound(identifier.clone()),
            _ => IoError::Fs(e.to_string()),
        })?;

        if !metadata.is_file() {
            return Err(IoError::NotFound(identifier));
        }

        Ok(Self {
            path,
            size: metadata.len(),
            identifier,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RangeReader for FsRangeReader {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        check_bounds(offset, len, self.size)?;

        if len == 0 {
            return Ok(Bytes::new());
        }

        let mut file = File::open(&self.path)
            .await
            .map_err(|e| IoError::Fs(e.to_string()))?;
        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(|e| IoError::Fs(e.to_string()))?;

        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf)
            .await
            .map_err(|e| IoError::Fs(e.to_string()))?;

        Ok(Bytes::from(buf))
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}
