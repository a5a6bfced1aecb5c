//! Parsing of single-range `Range: bytes=...` request headers.

use crate::error::IoError;

/// An inclusive byte span within a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Parse a `Range` header value against a resource of `size` bytes.
    ///
    /// Returns `Ok(None)` for headers that should be ignored (other units,
    /// multiple ranges, bad syntax) and `RangeNotSatisfiable` when the range
    /// starts past the end of the resource.
    pub fn parse(header: &str, size: u64) -> Result<Option<Self>, IoError> {
        let Some(spec) = header.trim().strip_prefix("bytes=") else {
            return Ok(None);
        };
        if spec.contains(',') {
            return Ok(None);
        }
        let Some((first, last)) = spec.trim().split_once('-') else {
            return Ok(None);
        };

        let unsatisfiable = || IoError::RangeNotSatisfiable { size };

        match (first.trim(), last.trim()) {
            ("", "") => Ok(None),
            ("", suffix) => {
                let Ok(suffix) = suffix.parse::<u64>() else {
                    return Ok(None);
                };
                if suffix == 0 || size == 0 {
                    return Err(unsatisfiable());
                }
                Ok(Some(Self {
                    start: size.saturating_sub(suffix),
                    end: size - 1,
                }))
            }
            (start, "") => {
                let Ok(start) = start.parse::<u64>() else {
                    return Ok(None);
                };
                if start >= size {
                    return Err(unsatisfiable());
                }
                Ok(Some(Self {
                    start,
                    end: size - 1,
                }))
            }
            (start, end) => {
                let (Ok(start), Ok(end)) = (start.parse::<u64>(), end.parse::<u64>()) else {
                    return Ok(None);
                };
                if end < start {
                    return Ok(None);
                }
                if start >= size {
                    return Err(unsatisfiable());
                }
                Ok(Some(Self {
                    start,
                    end: end.min(size - 1),
                }))
            }
        }
    }

    /// Number of bytes in the range.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Inclusive ranges always hold at least one byte.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Shorten the range to at most `max` bytes.
    pub fn capped(self, max: usize) -> Self {
        let max = (max as u64).max(1);
        Self {
            start: self.start,
            end: self.end.min(self.start + max - 1),
        }
    }

    /// `Content-Range` header value for this range.
    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, size)
    }
}
