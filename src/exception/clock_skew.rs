//! Clock skew detection.
//!
//! Signed requests carry the client's timestamp, and services reject requests
//! whose timestamp is too far from their own clock. This module decides whether
//! a rejected request was caused by such skew, using the server's `Date`
//! response header and the offset the client currently believes it has.
//!
//! Offsets follow the convention `clock_skew = client_time - server_time`, so a
//! client whose clock runs one hour fast has a skew of `+1h` and estimates the
//! server clock as `now - clock_skew`.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::codes;
use crate::http::{SdkHttpResponse, DATE_HEADER};

/// Skew at or beyond which the client clock is considered wrong.
pub const DEFAULT_SKEW_THRESHOLD_SECS: i64 = 4 * 60;

/// Status codes for which a rejected timestamp is a plausible cause by default.
pub const DEFAULT_SKEW_SENSITIVE_STATUS_CODES: &[u16] = &[401, 403];

const RFC1123_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Formats a timestamp the way HTTP `Date` headers carry it.
pub fn format_rfc1123(time: DateTime<Utc>) -> String {
    time.format(RFC1123_FORMAT).to_string()
}

/// Parses an HTTP `Date` header value.
///
/// Returns `None` for anything that is not a valid RFC 1123 date.
pub fn parse_rfc1123(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|time| time.with_timezone(&Utc))
}

/// Reads the server clock from the response's `Date` header.
pub fn server_time(response: &SdkHttpResponse) -> Option<DateTime<Utc>> {
    let value = response.first_matching_header(DATE_HEADER)?;
    let parsed = parse_rfc1123(value);
    if parsed.is_none() {
        debug!(date = value, "ignoring unparseable Date header");
    }
    parsed
}

/// Returns the offset of the client clock from the server clock.
///
/// Positive when the client is ahead of the server.
pub fn compute_clock_skew(client_time: DateTime<Utc>, server_time: DateTime<Utc>) -> Duration {
    client_time - server_time
}

/// Returns true if the two clocks are at least `threshold` apart.
pub fn is_clock_skewed(
    client_time: DateTime<Utc>,
    server_time: DateTime<Utc>,
    threshold: Duration,
) -> bool {
    compute_clock_skew(client_time, server_time).abs() >= threshold
}

/// The facts about one failed call that bear on clock skew.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkewObservation<'a> {
    /// Service error code, possibly empty.
    pub error_code: &'a str,
    /// HTTP status code of the response.
    pub status_code: u16,
    /// Server clock taken from the `Date` header, if present and valid.
    pub server_time: Option<DateTime<Utc>>,
    /// Local clock when the decision is made.
    pub now: DateTime<Utc>,
    /// The client's current estimate of `client_time - server_time`.
    pub clock_offset: Duration,
}

/// Which responses are checked for clock skew, and how much skew is tolerated.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClockSkewPolicy {
    sensitive_status_codes: Vec<u16>,
    threshold: Duration,
    possible_skew_codes_on_any_status: bool,
}

impl Default for ClockSkewPolicy {
    fn default() -> Self {
        Self {
            sensitive_status_codes: DEFAULT_SKEW_SENSITIVE_STATUS_CODES.to_vec(),
            threshold: Duration::seconds(DEFAULT_SKEW_THRESHOLD_SECS),
            possible_skew_codes_on_any_status: false,
        }
    }
}

impl ClockSkewPolicy {
    /// Creates the default policy: 401/403 responses, four minutes of tolerance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the status codes for which the `Date` header is consulted.
    pub fn with_sensitive_status_codes(mut self, status_codes: impl Into<Vec<u16>>) -> Self {
        self.sensitive_status_codes = status_codes.into();
        self
    }

    /// Sets the tolerated skew.
    pub fn with_threshold(mut self, threshold: Duration) -> Self {
        self.threshold = threshold.abs();
        self
    }

    /// Also consults the `Date` header for possible-skew error codes such as
    /// `SignatureDoesNotMatch`, whatever the status code. Off by default.
    pub fn with_possible_skew_codes_on_any_status(mut self, enabled: bool) -> Self {
        self.possible_skew_codes_on_any_status = enabled;
        self
    }

    /// Returns the status codes for which the `Date` header is consulted.
    pub fn sensitive_status_codes(&self) -> &[u16] {
        &self.sensitive_status_codes
    }

    /// Returns the tolerated skew.
    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Returns true if possible-skew error codes open the timestamp check on
    /// any status code.
    pub fn possible_skew_codes_on_any_status(&self) -> bool {
        self.possible_skew_codes_on_any_status
    }

    /// Returns true if a response with this status may have been rejected
    /// because of its timestamp.
    pub fn is_skew_sensitive_status(&self, status_code: u16) -> bool {
        self.sensitive_status_codes.contains(&status_code)
    }

    /// Decides whether the failure was caused by clock skew.
    ///
    /// A definite skew error code wins outright. Otherwise the server clock is
    /// compared with the client's estimate of it, but only for skew-sensitive
    /// status codes and only when the server clock is known. Other statuses
    /// never reach the timestamp check unless
    /// [`with_possible_skew_codes_on_any_status`](Self::with_possible_skew_codes_on_any_status)
    /// is enabled and the error code is a possible-skew code.
    pub fn is_skewed(&self, observation: &SkewObservation<'_>) -> bool {
        if codes::is_definite_clock_skew_error_code(observation.error_code) {
            return true;
        }

        let possible = self.is_skew_sensitive_status(observation.status_code)
            || (self.possible_skew_codes_on_any_status
                && codes::is_possible_clock_skew_error_code(observation.error_code));
        if !possible {
            return false;
        }

        let Some(server_time) = observation.server_time else {
            return false;
        };

        let estimated_server_time = observation.now - observation.clock_offset;
        let skewed = is_clock_skewed(estimated_server_time, server_time, self.threshold);
        if skewed {
            debug!(
                status_code = observation.status_code,
                error_code = observation.error_code,
                offset_secs = observation.clock_offset.num_seconds(),
                residual_skew_secs =
                    compute_clock_skew(estimated_server_time, server_time).num_seconds(),
                "clock skew detected"
            );
        }
        skewed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const HOUR: i64 = 60 * 60;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 16, 20, 0).unwrap()
    }

    fn observation(
        offset_secs: i64,
        error_code: &str,
        status_code: u16,
        server_time: Option<DateTime<Utc>>,
    ) -> SkewObservation<'_> {
        SkewObservation {
            error_code,
            status_code,
            server_time,
            now: now(),
            clock_offset: Duration::seconds(offset_secs),
        }
    }

    #[test]
    fn test_format_rfc1123() {
        assert_eq!(format_rfc1123(now()), "Sat, 09 Mar 2024 16:20:00 GMT");
    }

    #[test]
    fn test_parse_rfc1123() {
        assert_eq!(parse_rfc1123("Sat, 09 Mar 2024 16:20:00 GMT"), Some(now()));
        assert_eq!(parse_rfc1123("  Sat, 09 Mar 2024 16:20:00 GMT "), Some(now()));
        assert_eq!(parse_rfc1123("yesterday"), None);
        assert_eq!(parse_rfc1123(""), None);
    }

    #[test]
    fn test_server_time_from_header() {
        let response = SdkHttpResponse::builder()
            .status_code(403)
            .put_header("date", format_rfc1123(now()))
            .build()
            .unwrap();
        assert_eq!(server_time(&response), Some(now()));

        let garbled = SdkHttpResponse::builder()
            .status_code(403)
            .put_header("Date", "not a date")
            .build()
            .unwrap();
        assert_eq!(server_time(&garbled), None);
    }

    #[test]
    fn test_compute_clock_skew_sign() {
        let server = now() - Duration::seconds(HOUR);
        assert_eq!(compute_clock_skew(now(), server), Duration::seconds(HOUR));
        assert_eq!(compute_clock_skew(server, now()), Duration::seconds(-HOUR));
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let threshold = Duration::seconds(DEFAULT_SKEW_THRESHOLD_SECS);
        assert!(is_clock_skewed(now(), now() + threshold, threshold));
        assert!(!is_clock_skewed(
            now(),
            now() + threshold - Duration::seconds(1),
            threshold
        ));
    }

    #[test]
    fn test_definite_code_is_skewed_without_date() {
        let policy = ClockSkewPolicy::default();
        assert!(policy.is_skewed(&observation(0, "RequestTimeTooSkewed", 404, None)));
        assert!(policy.is_skewed(&observation(0, "RequestExpired", 400, None)));
    }

    #[test]
    fn test_auth_status_with_skewed_date() {
        let policy = ClockSkewPolicy::default();
        let future = Some(now() + Duration::seconds(HOUR));
        let past = Some(now() - Duration::seconds(HOUR));

        assert!(policy.is_skewed(&observation(0, "", 401, future)));
        assert!(policy.is_skewed(&observation(0, "", 403, past)));
        assert!(!policy.is_skewed(&observation(0, "", 404, future)));
        assert!(!policy.is_skewed(&observation(0, "", 404, past)));
    }

    #[test]
    fn test_known_offset_cancels_skew() {
        let policy = ClockSkewPolicy::default();
        // Client is an hour behind and already knows it.
        let future = Some(now() + Duration::seconds(HOUR));
        assert!(!policy.is_skewed(&observation(-HOUR, "", 403, future)));

        // Client believes it is an hour behind, but the server agrees with it.
        assert!(policy.is_skewed(&observation(-HOUR, "", 403, Some(now()))));
        assert!(policy.is_skewed(&observation(HOUR, "", 401, Some(now()))));
    }

    #[test]
    fn test_missing_date_never_skewed() {
        let policy = ClockSkewPolicy::default();
        assert!(!policy.is_skewed(&observation(HOUR, "", 403, None)));
        assert!(!policy.is_skewed(&observation(HOUR, "SignatureDoesNotMatch", 403, None)));
    }

    #[test]
    fn test_possible_skew_code_does_not_bypass_status() {
        let policy = ClockSkewPolicy::default();
        let future = Some(now() + Duration::seconds(HOUR));
        assert!(!policy.possible_skew_codes_on_any_status());
        assert!(!policy.is_skewed(&observation(0, "SignatureDoesNotMatch", 404, future)));
        assert!(!policy.is_skewed(&observation(0, "InvalidSignatureException", 400, future)));
        assert!(policy.is_skewed(&observation(0, "SignatureDoesNotMatch", 403, future)));
    }

    #[test]
    fn test_possible_skew_codes_on_any_status_when_enabled() {
        let policy = ClockSkewPolicy::new().with_possible_skew_codes_on_any_status(true);
        let future = Some(now() + Duration::seconds(HOUR));
        assert!(policy.is_skewed(&observation(0, "SignatureDoesNotMatch", 404, future)));
        assert!(!policy.is_skewed(&observation(0, "SignatureDoesNotMatch", 404, Some(now()))));
        assert!(!policy.is_skewed(&observation(0, "", 404, future)));
    }

    #[test]
    fn test_custom_policy() {
        let policy = ClockSkewPolicy::new()
            .with_sensitive_status_codes(vec![400])
            .with_threshold(Duration::seconds(-30));
        let future = Some(now() + Duration::seconds(45));

        assert_eq!(policy.threshold(), Duration::seconds(30));
        assert_eq!(policy.sensitive_status_codes(), &[400]);
        assert!(policy.is_skewed(&observation(0, "", 400, future)));
        assert!(!policy.is_skewed(&observation(0, "", 403, future)));
    }
}
