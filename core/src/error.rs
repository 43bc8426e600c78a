use std::fmt;
use thiserror::Error;

/// The error type for bridge operations
#[derive(Error, Debug)]
#[error("{message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    vendor_code: Option<String>,
    request_id: Option<String>,
    #[source]
    source: Option<anyhow::Error>,
}

/// The kind of error that occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Configuration error (missing fields, malformed keys, unknown region)
    ConfigInvalid,

    /// Caller passed arguments that cannot be used (missing options, bad combinations)
    ArgumentInvalid,

    /// Response is structurally unusable (not JSON/XML, missing required headers)
    ResponseInvalid,

    /// The vendor returned a well-formed error payload
    VendorResponse,

    /// Payload decryption or decoding failed
    DecodeInvalid,

    /// A signature could not be produced
    SignInvalid,

    /// A signature did not verify
    VerifyFailed,

    /// Unexpected errors (network, I/O, etc.)
    Unexpected,
}

impl Error {
    /// Create a new error with the given kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            vendor_code: None,
            request_id: None,
            source: None,
        }
    }

    /// Add a source error
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attach the vendor's own error code.
    pub fn with_vendor_code(mut self, code: impl Into<String>) -> Self {
        self.vendor_code = Some(code.into());
        self
    }

    /// Attach the vendor's request id for support lookups.
    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The vendor error code, if the vendor reported one.
    pub fn vendor_code(&self) -> Option<&str> {
        self.vendor_code.as_deref()
    }

    /// The vendor request id, if the vendor reported one.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }
}

// Convenience constructors
impl Error {
    /// Create a config invalid error
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    /// Create an argument invalid error
    pub fn argument_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ArgumentInvalid, message)
    }

    /// Create a response invalid error
    pub fn response_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ResponseInvalid, message)
    }

    /// Create a vendor response error
    pub fn vendor_response(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::VendorResponse, message)
    }

    /// Create a decode invalid error
    pub fn decode_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DecodeInvalid, message)
    }

    /// Create a sign invalid error
    pub fn sign_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SignInvalid, message)
    }

    /// Create a verify failed error
    pub fn verify_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::VerifyFailed, message)
    }

    /// Create an unexpected error
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::ConfigInvalid => write!(f, "invalid configuration"),
            ErrorKind::ArgumentInvalid => write!(f, "invalid argument"),
            ErrorKind::ResponseInvalid => write!(f, "invalid response"),
            ErrorKind::VendorResponse => write!(f, "vendor reported an error"),
            ErrorKind::DecodeInvalid => write!(f, "decode failed"),
            ErrorKind::SignInvalid => write!(f, "signing failed"),
            ErrorKind::VerifyFailed => write!(f, "signature verification failed"),
            ErrorKind::Unexpected => write!(f, "unexpected error"),
        }
    }
}

/// Convenience type alias for Results
pub type Result<T> = std::result::Result<T, Error>;

// Common From implementations
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(err)
    }
}

impl From<std::fmt::Error> for Error {
    fn from(err: std::fmt::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::Error> for Error {
    fn from(err: http::Error) -> Self {
        Self::argument_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::argument_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::uri::InvalidUri> for Error {
    fn from(err: http::uri::InvalidUri) -> Self {
        Self::argument_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self::decode_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::InvalidHeaderName> for Error {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        Self::argument_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::ToStrError> for Error {
    fn from(err: http::header::ToStrError) -> Self {
        Self::response_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_fields_round_trip() {
        let err = Error::vendor_response("trade not exist")
            .with_vendor_code("ACQ.TRADE_NOT_EXIST")
            .with_request_id("req-123");

        assert_eq!(err.kind(), ErrorKind::VendorResponse);
        assert_eq!(err.vendor_code(), Some("ACQ.TRADE_NOT_EXIST"));
        assert_eq!(err.request_id(), Some("req-123"));
        assert_eq!(err.to_string(), "trade not exist");
    }

    #[test]
    fn test_plain_error_has_no_vendor_fields() {
        let err = Error::config_invalid("Missing Config [ali.payment.app_id]");
        assert_eq!(err.vendor_code(), None);
        assert_eq!(err.request_id(), None);
    }
}
