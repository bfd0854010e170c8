//! svc-retry - service error classification for cloud SDK clients
//!
//! Decides, for every failed call to a remote service, whether the failure is
//! throttling, transient, caused by clock skew, or permanent, and aggregates
//! the per-file failures of directory-wide transfers into a single result.

pub mod error;
pub mod exception;
pub mod http;
pub mod logging;
pub mod metrics;
pub mod retry;
pub mod settings;
pub mod transfer;
