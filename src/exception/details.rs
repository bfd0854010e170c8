//! Error details returned by a service.

use crate::http::SdkHttpResponse;

/// What the service said about a failed call.
///
/// Every string may be empty; services do not always send a code or a message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ErrorDetails {
    error_code: String,
    error_message: String,
    service_name: String,
    sdk_http_response: Option<SdkHttpResponse>,
}

impl ErrorDetails {
    /// Creates a builder with every field empty.
    pub fn builder() -> ErrorDetailsBuilder {
        ErrorDetailsBuilder::default()
    }

    /// Returns the service error code, such as `SlowDown`.
    pub fn error_code(&self) -> &str {
        &self.error_code
    }

    /// Returns the human-readable message sent by the service.
    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    /// Returns the name of the service that produced the error.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Returns the raw response, if one was captured.
    pub fn sdk_http_response(&self) -> Option<&SdkHttpResponse> {
        self.sdk_http_response.as_ref()
    }

    /// Returns a builder seeded with this value's fields.
    pub fn to_builder(&self) -> ErrorDetailsBuilder {
        ErrorDetailsBuilder {
            error_code: self.error_code.clone(),
            error_message: self.error_message.clone(),
            service_name: self.service_name.clone(),
            sdk_http_response: self.sdk_http_response.clone(),
        }
    }
}

/// Builder for [`ErrorDetails`].
#[derive(Clone, Debug, Default)]
pub struct ErrorDetailsBuilder {
    error_code: String,
    error_message: String,
    service_name: String,
    sdk_http_response: Option<SdkHttpResponse>,
}

impl ErrorDetailsBuilder {
    /// Sets the service error code.
    pub fn error_code(mut self, error_code: impl Into<String>) -> Self {
        self.error_code = error_code.into();
        self
    }

    /// Sets the error message.
    pub fn error_message(mut self, error_message: impl Into<String>) -> Self {
        self.error_message = error_message.into();
        self
    }

    /// Sets the service name.
    pub fn service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = service_name.into();
        self
    }

    /// Attaches the raw response.
    pub fn sdk_http_response(mut self, response: SdkHttpResponse) -> Self {
        self.sdk_http_response = Some(response);
        self
    }

    /// Builds the details. Nothing is required.
    pub fn build(self) -> ErrorDetails {
        ErrorDetails {
            error_code: self.error_code,
            error_message: self.error_message,
            service_name: self.service_name,
            sdk_http_response: self.sdk_http_response,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_details_are_empty() {
        let details = ErrorDetails::builder().build();
        assert_eq!(details.error_code(), "");
        assert_eq!(details.error_message(), "");
        assert_eq!(details.service_name(), "");
        assert!(details.sdk_http_response().is_none());
    }

    #[test]
    fn test_to_builder_round_trip() {
        let response = SdkHttpResponse::builder().status_code(503).build().unwrap();
        let details = ErrorDetails::builder()
            .error_code("ServiceUnavailable")
            .error_message("Please reduce your request rate.")
            .service_name("S3")
            .sdk_http_response(response)
            .build();

        let copy = details.to_builder().build();
        assert_eq!(details, copy);

        let changed = details.to_builder().error_code("SlowDown").build();
        assert_eq!(changed.error_code(), "SlowDown");
        assert_eq!(changed.service_name(), "S3");
    }
}
