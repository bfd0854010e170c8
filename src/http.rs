//! Minimal view of an HTTP response.
//!
//! Only the parts needed to classify a failed call are modelled: the status
//! code and the response headers. Header names are matched case-insensitively.

use crate::error::{BuildError, BuildResult};

/// Name of the header carrying the server's clock.
pub const DATE_HEADER: &str = "Date";

/// Status code and headers of a response received from a service.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SdkHttpResponse {
    status_code: u16,
    /// Headers in insertion order; a name may repeat.
    headers: Vec<(String, String)>,
}

impl SdkHttpResponse {
    /// Creates a builder for a response.
    pub fn builder() -> SdkHttpResponseBuilder {
        SdkHttpResponseBuilder::default()
    }

    /// Returns the HTTP status code.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Returns the first value of the named header, ignoring ASCII case.
    pub fn first_matching_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns every value of the named header, ignoring ASCII case.
    pub fn matching_headers<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns all headers in the order they were added.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Returns true for 2xx status codes.
    pub fn is_successful(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Builder for [`SdkHttpResponse`].
#[derive(Clone, Debug, Default)]
pub struct SdkHttpResponseBuilder {
    status_code: Option<u16>,
    headers: Vec<(String, String)>,
}

impl SdkHttpResponseBuilder {
    /// Sets the HTTP status code.
    pub fn status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// Replaces any existing values of the header with a single value.
    pub fn put_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(key, _)| !key.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Adds a header value, keeping values already present under that name.
    pub fn append_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Builds the response.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::MissingField`] if no status code was set.
    pub fn build(self) -> BuildResult<SdkHttpResponse> {
        let status_code = self
            .status_code
            .ok_or(BuildError::MissingField("status_code"))?;
        Ok(SdkHttpResponse {
            status_code,
            headers: self.headers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_ignores_case() {
        let response = SdkHttpResponse::builder()
            .status_code(403)
            .put_header("Date", "Sun, 06 Nov 1994 08:49:37 GMT")
            .build()
            .unwrap();

        assert_eq!(
            response.first_matching_header("date"),
            Some("Sun, 06 Nov 1994 08:49:37 GMT")
        );
        assert_eq!(
            response.first_matching_header("DATE"),
            Some("Sun, 06 Nov 1994 08:49:37 GMT")
        );
        assert_eq!(response.first_matching_header("x-amz-request-id"), None);
    }

    #[test]
    fn test_put_header_replaces_existing_values() {
        let response = SdkHttpResponse::builder()
            .status_code(200)
            .append_header("X-Trace", "a")
            .append_header("x-trace", "b")
            .put_header("X-TRACE", "c")
            .build()
            .unwrap();

        let values: Vec<&str> = response.matching_headers("x-trace").collect();
        assert_eq!(values, vec!["c"]);
    }

    #[test]
    fn test_append_header_keeps_order() {
        let response = SdkHttpResponse::builder()
            .status_code(200)
            .append_header("Via", "1.1 a")
            .append_header("Via", "1.1 b")
            .build()
            .unwrap();

        let values: Vec<&str> = response.matching_headers("via").collect();
        assert_eq!(values, vec!["1.1 a", "1.1 b"]);
        assert_eq!(response.first_matching_header("via"), Some("1.1 a"));
        assert!(response.is_successful());
    }

    #[test]
    fn test_status_code_is_required() {
        let err = SdkHttpResponse::builder().build().unwrap_err();
        assert_eq!(err, BuildError::MissingField("status_code"));
    }
}
