//! Media stored under a local directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{resource_segments, MediaSource};
use crate::error::IoError;
use crate::io::FsRangeReader;

/// Serves resources as files below a root directory.
///
/// The resource "videos/intro.mp4" maps to `{root}/videos/intro.mp4`.
#[derive(Debug, Clone)]
pub struct FsMediaSource {
    root: PathBuf,
}

impl FsMediaSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a resource to a path that cannot escape the root.
    pub fn resolve(&self, resource: &str) -> Result<PathBuf, IoError> {
        let mut path = self.root.clone();
        for segment in resource_segments(resource)? {
            path.push(segment);
        }
        Ok(path)
    }
}

#[async_trait]
impl MediaSource for FsMediaSource {
    type Reader = FsRangeReader;

    async fn open(&self, resource: &str) -> Result<Self::Reader, IoError> {
        let path = self.resolve(resource)?;
        FsRangeReader::open(path).await
    }
}
