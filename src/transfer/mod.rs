//! Results of directory-wide transfers.
//!
//! A directory upload or download runs one transfer per file, concurrently.
//! Failures are reported to a [`DirectoryTransferCollector`] as they happen and
//! folded into a single immutable [`CompletedDirectoryTransfer`] once every
//! file transfer has finished.

pub mod collector;
pub mod completed;
pub mod failure;
pub mod request;

// Re-export main types for convenient access
pub use collector::{CollectorError, DirectoryTransferCollector};
pub use completed::{
    CompletedDirectoryDownload, CompletedDirectoryTransfer, CompletedDirectoryTransferBuilder,
    CompletedDirectoryUpload, FailedFileDownload, FailedFileUpload,
};
pub use failure::{FailedTransfer, FailedTransferBuilder, TransferError};
pub use request::{DownloadFileRequest, UploadFileRequest};
