//! Published content: raster images and the identifiers the store assigns them.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// MIME type of every image the sandbox produces.
pub const IMAGE_CONTENT_TYPE: &str = "image/png";

/// Identifier returned by the content-addressed store after publication.
///
/// Opaque to everything except the store that issued it. Construction only
/// rejects values that could not be used as a gateway path.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Validate and wrap an identifier.
    pub fn new(value: impl Into<String>) -> crate::Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(crate::Error::InvalidContentId("empty".to_string()));
        }
        if value.starts_with('/')
            || value.split('/').any(|segment| segment.is_empty() || segment == "..")
            || value.chars().any(char::is_whitespace)
        {
            return Err(crate::Error::InvalidContentId(value));
        }
        Ok(Self(value))
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self.0)
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// PNG bytes produced by one sandbox execution.
#[derive(Clone, PartialEq, Eq)]
pub struct RasterImage(Bytes);

impl RasterImage {
    /// Wrap encoded PNG bytes.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self(data.into())
    }

    /// Borrow the encoded bytes.
    pub fn bytes(&self) -> &Bytes {
        &self.0
    }

    /// Take the encoded bytes.
    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    /// Encoded size in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the image holds no data.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// MIME type of the encoded bytes.
    pub fn content_type(&self) -> &'static str {
        IMAGE_CONTENT_TYPE
    }
}

impl fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RasterImage({} bytes)", self.0.len())
    }
}
