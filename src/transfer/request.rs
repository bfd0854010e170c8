//! Per-file requests issued by directory transfers.

use std::path::PathBuf;

/// Download of a single object into a local file.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DownloadFileRequest {
    /// Bucket holding the object.
    pub bucket: String,
    /// Key of the object.
    pub key: String,
    /// Local file the object is written to.
    pub destination: PathBuf,
}

impl DownloadFileRequest {
    /// Creates a download request.
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        destination: impl Into<PathBuf>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            destination: destination.into(),
        }
    }
}

/// Upload of a single local file as an object.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UploadFileRequest {
    /// Local file being uploaded.
    pub source: PathBuf,
    /// Destination bucket.
    pub bucket: String,
    /// Destination key.
    pub key: String,
}

impl UploadFileRequest {
    /// Creates an upload request.
    pub fn new(
        source: impl Into<PathBuf>,
        bucket: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}
