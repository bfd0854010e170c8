//! Thread-safe accumulation of per-file failures.

use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use tracing::{debug, trace};

use super::completed::CompletedDirectoryTransfer;

/// Errors that can occur when finishing a collector.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorError {
    /// Another handle to the collector is still alive, so a worker may still
    /// record a failure.
    #[error("collector is still shared by {0} other handle(s)")]
    StillShared(usize),
}

/// Collects failures reported by concurrently running file transfers.
///
/// Workers call [`record_failure`](Self::record_failure) through a shared
/// reference (typically an `Arc`). Once every worker has finished, the batch
/// driver calls [`finish`](Self::finish), which consumes the collector, so no
/// failure can be recorded after the result is built.
#[derive(Debug)]
pub struct DirectoryTransferCollector<F> {
    failed_transfers: Mutex<Vec<F>>,
}

impl<F> Default for DirectoryTransferCollector<F> {
    fn default() -> Self {
        Self {
            failed_transfers: Mutex::new(Vec::new()),
        }
    }
}

impl<F> DirectoryTransferCollector<F> {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one failed transfer. Safe to call from many threads at once.
    pub fn record_failure(&self, failed_transfer: F) {
        let mut failed = self.lock();
        failed.push(failed_transfer);
        trace!(failures = failed.len(), "recorded failed transfer");
    }

    /// Returns the number of failures recorded so far.
    pub fn failure_count(&self) -> usize {
        self.lock().len()
    }

    /// Builds the final result.
    ///
    /// Failures appear in recording order, which varies between runs when
    /// workers race; the result's equality does not depend on it.
    pub fn finish(self) -> CompletedDirectoryTransfer<F> {
        let failed_transfers = self
            .failed_transfers
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        debug!(failures = failed_transfers.len(), "directory transfer finished");
        CompletedDirectoryTransfer::builder()
            .failed_transfers(failed_transfers)
            .build()
    }

    /// Builds the final result from a shared collector.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError::StillShared`] if any other handle to the
    /// collector still exists.
    pub fn finish_shared(
        collector: Arc<Self>,
    ) -> Result<CompletedDirectoryTransfer<F>, CollectorError> {
        match Arc::try_unwrap(collector) {
            Ok(collector) => Ok(collector.finish()),
            Err(shared) => Err(CollectorError::StillShared(Arc::strong_count(&shared) - 1)),
        }
    }

    // A worker that panicked mid-push leaves the vector intact, so a poisoned
    // lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, Vec<F>> {
        self.failed_transfers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_finish_without_failures() {
        let collector: DirectoryTransferCollector<String> = DirectoryTransferCollector::new();
        assert_eq!(collector.failure_count(), 0);

        let completed = collector.finish();
        assert!(completed.failed_transfers().is_empty());
    }

    #[test]
    fn test_failures_from_many_threads() {
        let collector = Arc::new(DirectoryTransferCollector::new());

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let collector = Arc::clone(&collector);
                thread::spawn(move || {
                    for file in 0..25 {
                        collector.record_failure(format!("worker-{}/file-{}", worker, file));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(collector.failure_count(), 200);
        let completed = DirectoryTransferCollector::finish_shared(collector).unwrap();
        assert_eq!(completed.failed_transfers().len(), 200);
        assert!(completed
            .failed_transfers()
            .contains(&"worker-3/file-24".to_string()));
    }

    #[test]
    fn test_finish_shared_rejects_live_handles() {
        let collector = Arc::new(DirectoryTransferCollector::<u32>::new());
        let worker = Arc::clone(&collector);
        worker.record_failure(7);

        let err = DirectoryTransferCollector::finish_shared(collector).unwrap_err();
        assert_eq!(err, CollectorError::StillShared(1));
        assert_eq!(worker.failure_count(), 1);
    }

    #[test]
    fn test_still_shared_display() {
        assert_eq!(
            CollectorError::StillShared(2).to_string(),
            "collector is still shared by 2 other handle(s)"
        );
    }
}
