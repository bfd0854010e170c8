//! Well-known service error codes.
//!
//! These tables drive classification of service errors. Every lookup is an
//! exact, case-sensitive match; codes not listed here classify as neither
//! throttling nor retryable.

/// Error codes that unambiguously mean the request timestamp was rejected.
pub const DEFINITE_CLOCK_SKEW_ERROR_CODES: &[&str] =
    &["RequestTimeTooSkewed", "RequestExpired", "RequestInTheFuture"];

/// Error codes that may be caused by clock skew, but may also be a genuine
/// signing or authorization failure.
pub const POSSIBLE_CLOCK_SKEW_ERROR_CODES: &[&str] = &[
    "InvalidSignatureException",
    "SignatureDoesNotMatch",
    "AuthFailure",
];

/// Error codes returned when the service is rate limiting the caller.
pub const THROTTLING_ERROR_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "ThrottledException",
    "RequestThrottledException",
    "TooManyRequestsException",
    "ProvisionedThroughputExceededException",
    "TransactionInProgressException",
    "RequestLimitExceeded",
    "BandwidthLimitExceeded",
    "LimitExceededException",
    "RequestThrottled",
    "SlowDown",
    "EC2ThrottledException",
    "PriorRequestNotComplete",
];

/// Error codes for server-side conditions that usually clear up on their own.
pub const TRANSIENT_ERROR_CODES: &[&str] = &[
    "RequestTimeout",
    "RequestTimeoutException",
    "InternalError",
    "ServiceUnavailable",
];

/// Every error code that is worth another attempt.
///
/// Union of [`THROTTLING_ERROR_CODES`], [`DEFINITE_CLOCK_SKEW_ERROR_CODES`] and
/// [`TRANSIENT_ERROR_CODES`].
pub const RETRYABLE_ERROR_CODES: &[&str] = &[
    // throttling
    "Throttling",
    "ThrottlingException",
    "ThrottledException",
    "RequestThrottledException",
    "TooManyRequestsException",
    "ProvisionedThroughputExceededException",
    "TransactionInProgressException",
    "RequestLimitExceeded",
    "BandwidthLimitExceeded",
    "LimitExceededException",
    "RequestThrottled",
    "SlowDown",
    "EC2ThrottledException",
    "PriorRequestNotComplete",
    // clock skew
    "RequestTimeTooSkewed",
    "RequestExpired",
    "RequestInTheFuture",
    // transient
    "RequestTimeout",
    "RequestTimeoutException",
    "InternalError",
    "ServiceUnavailable",
];

/// Returns true if the code is a throttling error code.
pub fn is_throttling_error_code(error_code: &str) -> bool {
    THROTTLING_ERROR_CODES.contains(&error_code)
}

/// Returns true if the code is a retryable error code.
pub fn is_retryable_error_code(error_code: &str) -> bool {
    RETRYABLE_ERROR_CODES.contains(&error_code)
}

/// Returns true if the code is a transient error code.
pub fn is_transient_error_code(error_code: &str) -> bool {
    TRANSIENT_ERROR_CODES.contains(&error_code)
}

/// Returns true if the code always indicates clock skew.
pub fn is_definite_clock_skew_error_code(error_code: &str) -> bool {
    DEFINITE_CLOCK_SKEW_ERROR_CODES.contains(&error_code)
}

/// Returns true if the code might indicate clock skew.
pub fn is_possible_clock_skew_error_code(error_code: &str) -> bool {
    POSSIBLE_CLOCK_SKEW_ERROR_CODES.contains(&error_code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_retryable_codes_contain_all_throttling_codes() {
        let retryable: HashSet<&str> = RETRYABLE_ERROR_CODES.iter().copied().collect();
        for code in THROTTLING_ERROR_CODES {
            assert!(retryable.contains(code), "{} missing from retryable", code);
        }
    }

    #[test]
    fn test_retryable_codes_are_exactly_the_union() {
        let union: HashSet<&str> = THROTTLING_ERROR_CODES
            .iter()
            .chain(DEFINITE_CLOCK_SKEW_ERROR_CODES)
            .chain(TRANSIENT_ERROR_CODES)
            .copied()
            .collect();
        let retryable: HashSet<&str> = RETRYABLE_ERROR_CODES.iter().copied().collect();

        assert_eq!(union, retryable);
        assert_eq!(retryable.len(), RETRYABLE_ERROR_CODES.len(), "duplicate entry");
    }

    #[test]
    fn test_possible_skew_codes_are_not_retryable() {
        for code in POSSIBLE_CLOCK_SKEW_ERROR_CODES {
            assert!(!is_retryable_error_code(code));
        }
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        assert!(is_throttling_error_code("SlowDown"));
        assert!(!is_throttling_error_code("slowdown"));
        assert!(!is_retryable_error_code("INTERNALERROR"));
    }

    #[test]
    fn test_unknown_and_empty_codes() {
        for code in ["", "NoSuchKey", "AccessDenied"] {
            assert!(!is_throttling_error_code(code));
            assert!(!is_retryable_error_code(code));
            assert!(!is_definite_clock_skew_error_code(code));
            assert!(!is_possible_clock_skew_error_code(code));
        }
    }

    #[test]
    fn test_transient_codes() {
        assert!(is_transient_error_code("InternalError"));
        assert!(!is_transient_error_code("Throttling"));
    }
}
