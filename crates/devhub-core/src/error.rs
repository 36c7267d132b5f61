//! Error types for Devhub registry operations.
//!
//! This module provides the error type hierarchy shared by the Devhub client
//! crates, including the translation table that maps HTTP status codes from
//! the registry service into domain error kinds.

use std::fmt;
use thiserror::Error;

/// Main error type for Devhub registry operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A required argument was empty or absent
    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),

    /// An argument was present but invalid
    #[error("Invalid argument: {0}")]
    ArgumentError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Failed to parse a connection string
    #[error("Invalid connection string: {0}")]
    ConnectionStringParse(String),

    /// Failed to parse or build a shared access signature
    #[error("Invalid shared access signature: {0}")]
    SignatureParse(String),

    /// Failed to parse a response body
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Request timed out before a response was received
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Connection to the service could not be established
    #[error("Connection failed: {0}")]
    ConnectFailed(String),

    /// The service answered with a non-success status
    #[error("{kind} (status {status}): {message}")]
    Api {
        /// Domain error kind derived from the status code
        kind: ApiErrorKind,
        /// Original HTTP status code
        status: u16,
        /// Message extracted from the response body
        message: String,
    },
}

/// Specialized result type for Devhub registry operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Domain error kinds derived from registry HTTP status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// The request was malformed (400)
    ArgumentInvalid,
    /// The credential was rejected (401)
    Unauthorized,
    /// The hub quota has been exceeded (403)
    QuotaExceeded,
    /// The device does not exist (404)
    DeviceNotFound,
    /// A device with this id already exists (409)
    DeviceAlreadyExists,
    /// An `If-Match` precondition failed (412)
    PreconditionFailed,
    /// The payload exceeds the allowed size (413)
    MessageTooLarge,
    /// The caller is being throttled (429)
    Throttled,
    /// The service hit an internal error (500)
    InternalServerError,
    /// The service is temporarily unavailable (503)
    ServiceUnavailable,
    /// Any other non-success status
    Unknown,
}

impl ApiErrorKind {
    /// Derives the error kind from an HTTP status code.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            400 => Self::ArgumentInvalid,
            401 => Self::Unauthorized,
            403 => Self::QuotaExceeded,
            404 => Self::DeviceNotFound,
            409 => Self::DeviceAlreadyExists,
            412 => Self::PreconditionFailed,
            413 => Self::MessageTooLarge,
            429 => Self::Throttled,
            500 => Self::InternalServerError,
            503 => Self::ServiceUnavailable,
            _ => Self::Unknown,
        }
    }

    /// Returns the stable error code for this kind.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ArgumentInvalid => "ARGUMENT_INVALID",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::QuotaExceeded => "QUOTA_EXCEEDED",
            Self::DeviceNotFound => "DEVICE_NOT_FOUND",
            Self::DeviceAlreadyExists => "DEVICE_ALREADY_EXISTS",
            Self::PreconditionFailed => "PRECONDITION_FAILED",
            Self::MessageTooLarge => "MESSAGE_TOO_LARGE",
            Self::Throttled => "THROTTLED",
            Self::InternalServerError => "INTERNAL_SERVER_ERROR",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::ArgumentInvalid => "invalid request",
            Self::Unauthorized => "unauthorized",
            Self::QuotaExceeded => "quota exceeded",
            Self::DeviceNotFound => "device not found",
            Self::DeviceAlreadyExists => "device already exists",
            Self::PreconditionFailed => "precondition failed",
            Self::MessageTooLarge => "message too large",
            Self::Throttled => "throttled",
            Self::InternalServerError => "internal server error",
            Self::ServiceUnavailable => "service unavailable",
            Self::Unknown => "request failed",
        };
        f.write_str(text)
    }
}

/// Translates a non-success registry response into a typed error.
///
/// The human-readable message is taken from the `Message` (or `message`) field
/// of the JSON body when present, otherwise the raw body text is used. Only
/// invoked for statuses >= 300; transport failures without a response never
/// reach this table.
#[must_use]
pub fn translate_error(status: u16, body: &str) -> Error {
    let message = extract_message(body).unwrap_or_else(|| body.to_string());
    Error::Api {
        kind: ApiErrorKind::from_status(status),
        status,
        message,
    }
}

fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let message = value.get("Message").or_else(|| value.get("message"))?;
    message.as_str().map(ToOwned::to_owned)
}

impl Error {
    /// Returns the stable error code for this error.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::MissingArgument(_) => "MISSING_ARGUMENT",
            Self::ArgumentError(_) => "ARGUMENT_ERROR",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::ConnectionStringParse(_) => "CONNECTION_STRING_PARSE_ERROR",
            Self::SignatureParse(_) => "SIGNATURE_PARSE_ERROR",
            Self::ParseError(_) => "PARSE_ERROR",
            Self::HttpError(_) => "HTTP_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::ConnectFailed(_) => "CONNECT_FAILED",
            Self::Api { kind, .. } => kind.code(),
        }
    }

    /// Returns the HTTP status code when the service produced a response.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// Conversions from external error types
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::ConnectFailed(err.to_string())
        } else {
            Self::HttpError(err.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ConfigError(err.to_string())
    }
}
