//! Service exceptions and their classification.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::clock_skew::{self, ClockSkewPolicy, SkewObservation};
use super::codes;
use super::details::ErrorDetails;
use crate::error::{BuildError, BuildResult};

/// Status code a service uses to ask the client to slow down.
pub const TOO_MANY_REQUESTS: u16 = 429;

/// The broad kind of a service failure, in order of precedence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ServiceErrorKind {
    /// The request was rejected because the client clock is wrong.
    ClockSkew,
    /// The service is rate limiting the caller.
    Throttling,
    /// A server-side condition that may clear up on retry.
    Transient,
    /// Retrying the same request will not help.
    Fatal,
}

impl fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServiceErrorKind::ClockSkew => "clock-skew",
            ServiceErrorKind::Throttling => "throttling",
            ServiceErrorKind::Transient => "transient",
            ServiceErrorKind::Fatal => "fatal",
        };
        f.write_str(name)
    }
}

/// An error response from a remote service.
///
/// Immutable once built. The classification methods are pure functions of the
/// stored fields; only [`ServiceException::is_clock_skew_exception`] reads the
/// local clock, and [`ServiceException::is_clock_skew_exception_at`] takes it as
/// an argument instead.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ServiceException {
    error_details: ErrorDetails,
    status_code: u16,
    request_id: Option<String>,
    extended_request_id: Option<String>,
    clock_skew: Duration,
    clock_skew_policy: ClockSkewPolicy,
}

impl ServiceException {
    /// Creates a builder.
    pub fn builder() -> ServiceExceptionBuilder {
        ServiceExceptionBuilder::default()
    }

    /// Returns the details sent by the service.
    pub fn error_details(&self) -> &ErrorDetails {
        &self.error_details
    }

    /// Returns the HTTP status code.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Returns the request id assigned by the service.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Returns the extended request id, used by some services for support cases.
    pub fn extended_request_id(&self) -> Option<&str> {
        self.extended_request_id.as_deref()
    }

    /// Returns the client's estimated clock offset at the time of the call.
    pub fn clock_skew(&self) -> Duration {
        self.clock_skew
    }

    /// Returns the policy used for clock skew detection.
    pub fn clock_skew_policy(&self) -> &ClockSkewPolicy {
        &self.clock_skew_policy
    }

    /// Returns true if the service is rate limiting the caller.
    pub fn is_throttling_exception(&self) -> bool {
        self.status_code == TOO_MANY_REQUESTS
            || codes::is_throttling_error_code(self.error_details.error_code())
    }

    /// Returns true if sending the request again may succeed.
    ///
    /// Unrecognized codes are retryable only for 5xx responses.
    pub fn retryable(&self) -> bool {
        codes::is_retryable_error_code(self.error_details.error_code())
            || self.is_throttling_exception()
            || self.status_code >= 500
    }

    /// Returns true if the request was rejected because of clock skew,
    /// judged against the current local time.
    pub fn is_clock_skew_exception(&self) -> bool {
        self.is_clock_skew_exception_at(Utc::now())
    }

    /// Returns true if the request was rejected because of clock skew, as seen
    /// from a local clock reading of `now`.
    pub fn is_clock_skew_exception_at(&self, now: DateTime<Utc>) -> bool {
        let observation = SkewObservation {
            error_code: self.error_details.error_code(),
            status_code: self.status_code,
            server_time: self.server_time(),
            now,
            clock_offset: self.clock_skew,
        };
        self.clock_skew_policy.is_skewed(&observation)
    }

    /// Returns the server clock from the response's `Date` header, if any.
    pub fn server_time(&self) -> Option<DateTime<Utc>> {
        self.error_details
            .sdk_http_response()
            .and_then(clock_skew::server_time)
    }

    /// Combines the classification flags into a single kind.
    pub fn classification(&self) -> ServiceErrorKind {
        self.classification_at(Utc::now())
    }

    /// Like [`ServiceException::classification`], with an explicit local clock.
    pub fn classification_at(&self, now: DateTime<Utc>) -> ServiceErrorKind {
        let kind = if self.is_clock_skew_exception_at(now) {
            ServiceErrorKind::ClockSkew
        } else if self.is_throttling_exception() {
            ServiceErrorKind::Throttling
        } else if self.retryable() {
            ServiceErrorKind::Transient
        } else {
            ServiceErrorKind::Fatal
        };
        debug!(
            status_code = self.status_code,
            error_code = self.error_details.error_code(),
            %kind,
            "classified service error"
        );
        kind
    }

    /// Returns the user-facing message.
    ///
    /// `"<message> (Service: <service>, Status Code: <status>, Request ID: <id>,
    /// Extended Request ID: <extended id>)"`, with the request id clauses left
    /// out when those ids are absent.
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Returns a builder seeded with this value's fields.
    pub fn to_builder(&self) -> ServiceExceptionBuilder {
        ServiceExceptionBuilder {
            error_details: Some(self.error_details.clone()),
            status_code: Some(self.status_code),
            request_id: self.request_id.clone(),
            extended_request_id: self.extended_request_id.clone(),
            clock_skew: self.clock_skew,
            clock_skew_policy: self.clock_skew_policy.clone(),
        }
    }
}

impl fmt::Display for ServiceException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Service: {}, Status Code: {}",
            self.error_details.error_message(),
            self.error_details.service_name(),
            self.status_code
        )?;
        if let Some(request_id) = &self.request_id {
            write!(f, ", Request ID: {}", request_id)?;
        }
        if let Some(extended_request_id) = &self.extended_request_id {
            write!(f, ", Extended Request ID: {}", extended_request_id)?;
        }
        f.write_str(")")
    }
}

impl std::error::Error for ServiceException {}

/// Builder for [`ServiceException`].
#[derive(Clone, Debug)]
pub struct ServiceExceptionBuilder {
    error_details: Option<ErrorDetails>,
    status_code: Option<u16>,
    request_id: Option<String>,
    extended_request_id: Option<String>,
    clock_skew: Duration,
    clock_skew_policy: ClockSkewPolicy,
}

impl Default for ServiceExceptionBuilder {
    fn default() -> Self {
        Self {
            error_details: None,
            status_code: None,
            request_id: None,
            extended_request_id: None,
            clock_skew: Duration::zero(),
            clock_skew_policy: ClockSkewPolicy::default(),
        }
    }
}

impl ServiceExceptionBuilder {
    /// Sets the details sent by the service.
    pub fn error_details(mut self, error_details: ErrorDetails) -> Self {
        self.error_details = Some(error_details);
        self
    }

    /// Sets the HTTP status code. Required.
    pub fn status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// Sets the request id.
    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Sets the extended request id.
    pub fn extended_request_id(mut self, extended_request_id: impl Into<String>) -> Self {
        self.extended_request_id = Some(extended_request_id.into());
        self
    }

    /// Sets the client's estimated clock offset (`client - server`).
    pub fn clock_skew(mut self, clock_skew: Duration) -> Self {
        self.clock_skew = clock_skew;
        self
    }

    /// Overrides the clock skew detection policy.
    pub fn clock_skew_policy(mut self, policy: ClockSkewPolicy) -> Self {
        self.clock_skew_policy = policy;
        self
    }

    /// Builds the exception.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::MissingField`] if no status code was set.
    pub fn build(self) -> BuildResult<ServiceException> {
        let status_code = self
            .status_code
            .ok_or(BuildError::MissingField("status_code"))?;
        Ok(ServiceException {
            error_details: self.error_details.unwrap_or_default(),
            status_code,
            request_id: self.request_id,
            extended_request_id: self.extended_request_id,
            clock_skew: self.clock_skew,
            clock_skew_policy: self.clock_skew_policy,
        })
    }
}
