//! Error types for the Reverse IP/DNS client.
//!
//! # Design
//! Three independent channels can fail a call: the transport, the HTTP status
//! line, and an error envelope embedded in the body. `ApiError` folds them
//! into one taxonomy; each variant's message is stable text that callers match
//! on. `Failure` pairs an `ApiError` with whatever response was received so
//! the bytes are never lost on the error path.

use std::fmt;

use serde_json::error::Category;
use thiserror::Error;

use crate::http::RawResponse;
use crate::types::ErrorEnvelope;

/// A caller-side contract violation, detected before any I/O.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid argument: \"{name}\" {message}")]
pub struct ArgError {
    pub name: String,
    pub message: String,
}

impl ArgError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Everything that can go wrong during a lookup.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    InvalidArgument(#[from] ArgError),

    /// The client configuration could not be used (bad base URL, TLS setup).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The request could not be sent or no response headers arrived.
    #[error("cannot execute request: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("request cancelled")]
    Cancelled,

    /// The body stream broke or exceeded the size ceiling.
    #[error("cannot read response: {reason}")]
    Read {
        reason: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// Non-2xx status on the raw path.
    #[error("API failed with status code: {0}")]
    Status(u16),

    /// The body is not the JSON the service promises.
    #[error("cannot parse response: {0}")]
    Parse(#[source] serde_json::Error),

    /// The service reported a failure inside a well-formed body.
    #[error(transparent)]
    Envelope(#[from] ErrorEnvelope),
}

impl ApiError {
    pub(crate) fn read(reason: impl Into<String>, source: Option<reqwest::Error>) -> Self {
        ApiError::Read {
            reason: reason.into(),
            source,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }

    /// True when the body ended early, either on the wire or mid-JSON.
    pub fn is_eof(&self) -> bool {
        match self {
            ApiError::Parse(err) => err.classify() == Category::Eof,
            ApiError::Read { reason, .. } => reason == UNEXPECTED_EOF,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        // The URL carries the API key.
        ApiError::Transport(err.without_url())
    }
}

pub(crate) const UNEXPECTED_EOF: &str = "unexpected EOF";

/// A failed call together with the response received before it failed.
///
/// Displays exactly as the inner [`ApiError`].
#[derive(Debug)]
pub struct Failure {
    error: ApiError,
    response: Option<RawResponse>,
}

impl Failure {
    pub fn new(error: ApiError) -> Self {
        Self {
            error,
            response: None,
        }
    }

    pub fn with_response(error: ApiError, response: RawResponse) -> Self {
        Self {
            error,
            response: Some(response),
        }
    }

    pub fn error(&self) -> &ApiError {
        &self.error
    }

    /// The response captured before the failure, if any bytes arrived.
    pub fn response(&self) -> Option<&RawResponse> {
        self.response.as_ref()
    }

    pub fn into_parts(self) -> (ApiError, Option<RawResponse>) {
        (self.error, self.response)
    }

    pub fn is_cancelled(&self) -> bool {
        self.error.is_cancelled()
    }
}

impl From<ApiError> for Failure {
    fn from(error: ApiError) -> Self {
        Failure::new(error)
    }
}

impl From<ArgError> for Failure {
    fn from(error: ArgError) -> Self {
        Failure::new(error.into())
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.error)
    }
}
