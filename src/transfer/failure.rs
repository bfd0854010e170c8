//! Failure records for individual transfers.

use std::path::PathBuf;

use thiserror::Error;

use crate::error::{BuildError, BuildResult};
use crate::exception::ServiceException;

/// Why a single file transfer failed.
#[derive(Error, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TransferError {
    /// The service rejected a request.
    #[error(transparent)]
    Service(#[from] ServiceException),

    /// The local file could not be read or written.
    #[error("local file error on {}: {message}", path.display())]
    LocalFile { path: PathBuf, message: String },

    /// The transfer was cancelled before it finished.
    #[error("transfer cancelled")]
    Cancelled,
}

impl TransferError {
    /// Returns true if retrying the transfer may succeed.
    pub fn retryable(&self) -> bool {
        match self {
            TransferError::Service(e) => e.retryable(),
            TransferError::LocalFile { .. } | TransferError::Cancelled => false,
        }
    }
}

/// One failed sub-operation of a batch transfer.
///
/// `R` identifies the sub-operation (usually its request) and `E` is the cause.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FailedTransfer<R, E> {
    request: R,
    error: E,
}

impl<R, E> FailedTransfer<R, E> {
    /// Creates a failure record.
    pub fn new(request: R, error: E) -> Self {
        Self { request, error }
    }

    /// Creates a builder; both fields are required.
    pub fn builder() -> FailedTransferBuilder<R, E> {
        FailedTransferBuilder::default()
    }

    /// Returns the request that failed.
    pub fn request(&self) -> &R {
        &self.request
    }

    /// Returns the cause of the failure.
    pub fn error(&self) -> &E {
        &self.error
    }

    /// Splits the record into its request and cause.
    pub fn into_parts(self) -> (R, E) {
        (self.request, self.error)
    }
}

/// Builder for [`FailedTransfer`].
#[derive(Clone, Debug)]
pub struct FailedTransferBuilder<R, E> {
    request: Option<R>,
    error: Option<E>,
}

impl<R, E> Default for FailedTransferBuilder<R, E> {
    fn default() -> Self {
        Self {
            request: None,
            error: None,
        }
    }
}

impl<R, E> FailedTransferBuilder<R, E> {
    /// Sets the request that failed.
    pub fn request(mut self, request: R) -> Self {
        self.request = Some(request);
        self
    }

    /// Sets the cause of the failure.
    pub fn error(mut self, error: E) -> Self {
        self.error = Some(error);
        self
    }

    /// Builds the record.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::MissingField`] if the request or the error is unset.
    pub fn build(self) -> BuildResult<FailedTransfer<R, E>> {
        Ok(FailedTransfer {
            request: self.request.ok_or(BuildError::MissingField("request"))?,
            error: self.error.ok_or(BuildError::MissingField("error"))?,
        })
    }
}
