//! Completed directory transfers.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::failure::{FailedTransfer, TransferError};
use super::request::{DownloadFileRequest, UploadFileRequest};

/// A failed file download inside a directory download.
pub type FailedFileDownload = FailedTransfer<DownloadFileRequest, TransferError>;

/// A failed file upload inside a directory upload.
pub type FailedFileUpload = FailedTransfer<UploadFileRequest, TransferError>;

/// Outcome of a directory download.
pub type CompletedDirectoryDownload = CompletedDirectoryTransfer<FailedFileDownload>;

/// Outcome of a directory upload.
pub type CompletedDirectoryUpload = CompletedDirectoryTransfer<FailedFileUpload>;

/// The outcome of a transfer made up of many independent file transfers.
///
/// Only failures are recorded; a transfer with no failures succeeded for every
/// file. Equality and hashing compare the failures as a multiset: content and
/// multiplicity count, recording order does not.
#[derive(Clone, Debug)]
pub struct CompletedDirectoryTransfer<F> {
    failed_transfers: Vec<F>,
}

impl<F: PartialEq> PartialEq for CompletedDirectoryTransfer<F> {
    fn eq(&self, other: &Self) -> bool {
        if self.failed_transfers.len() != other.failed_transfers.len() {
            return false;
        }
        let mut matched = vec![false; other.failed_transfers.len()];
        self.failed_transfers.iter().all(|failed| {
            let found = other
                .failed_transfers
                .iter()
                .enumerate()
                .position(|(i, candidate)| !matched[i] && candidate == failed);
            match found {
                Some(i) => {
                    matched[i] = true;
                    true
                }
                None => false,
            }
        })
    }
}

impl<F: Eq> Eq for CompletedDirectoryTransfer<F> {}

impl<F: Hash> Hash for CompletedDirectoryTransfer<F> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Sum of per-element hashes, so the result does not depend on order.
        let combined = self
            .failed_transfers
            .iter()
            .map(|failed| {
                let mut hasher = DefaultHasher::new();
                failed.hash(&mut hasher);
                hasher.finish()
            })
            .fold(0u64, u64::wrapping_add);
        self.failed_transfers.len().hash(state);
        combined.hash(state);
    }
}

impl<F> Default for CompletedDirectoryTransfer<F> {
    fn default() -> Self {
        Self {
            failed_transfers: Vec::new(),
        }
    }
}

impl<F> CompletedDirectoryTransfer<F> {
    /// Creates a builder with no failures.
    pub fn builder() -> CompletedDirectoryTransferBuilder<F> {
        CompletedDirectoryTransferBuilder::default()
    }

    /// Returns the failed transfers. Empty when every file succeeded.
    pub fn failed_transfers(&self) -> &[F] {
        &self.failed_transfers
    }

    /// Returns true if no file transfer failed.
    pub fn is_success(&self) -> bool {
        self.failed_transfers.is_empty()
    }

    /// Consumes the result, returning the failed transfers.
    pub fn into_failed_transfers(self) -> Vec<F> {
        self.failed_transfers
    }
}

/// Builder for [`CompletedDirectoryTransfer`].
#[derive(Clone, Debug)]
pub struct CompletedDirectoryTransferBuilder<F> {
    failed_transfers: Vec<F>,
}

impl<F> Default for CompletedDirectoryTransferBuilder<F> {
    fn default() -> Self {
        Self {
            failed_transfers: Vec::new(),
        }
    }
}

impl<F> CompletedDirectoryTransferBuilder<F> {
    /// Replaces the failures recorded so far.
    pub fn failed_transfers(mut self, failed_transfers: impl IntoIterator<Item = F>) -> Self {
        self.failed_transfers = failed_transfers.into_iter().collect();
        self
    }

    /// Records one more failure.
    pub fn add_failed_transfer(mut self, failed_transfer: F) -> Self {
        self.failed_transfers.push(failed_transfer);
        self
    }

    /// Builds the result.
    pub fn build(self) -> CompletedDirectoryTransfer<F> {
        CompletedDirectoryTransfer {
            failed_transfers: self.failed_transfers,
        }
    }
}
