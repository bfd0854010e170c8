//! Service error classification.
//!
//! This module turns a failed service call into a [`ServiceException`] and
//! answers the questions a retry loop needs answered: is the service
//! throttling us, is the failure worth retrying, and was the request rejected
//! because the client clock is off.

pub mod clock_skew;
pub mod codes;
pub mod details;
pub mod service;

// Re-export main types for convenient access
pub use clock_skew::{ClockSkewPolicy, SkewObservation};
pub use details::{ErrorDetails, ErrorDetailsBuilder};
pub use service::{ServiceErrorKind, ServiceException, ServiceExceptionBuilder};
