//! HTTP exchange types and status classification.
//!
//! # Design
//! `HttpRequest` is plain data built by the client; `RawResponse` is an owned
//! snapshot of what came back. The body is copied out of the connection, so a
//! `RawResponse` outlives the exchange and can be handed to callers alongside
//! an error for diagnostics.

use reqwest::Url;

use crate::error::ApiError;

/// A GET request described as plain data.
///
/// Built by `ReverseIpClient::build_request` and executed by
/// [`crate::transport::Transport`].
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: Url,
    pub headers: Vec<(String, String)>,
}

/// An owned snapshot of an HTTP response.
///
/// Always populated with whatever was received, even when the surrounding
/// call failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    /// First value of header `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The body decoded as UTF-8, with invalid sequences replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Classify the status line. Anything outside 2xx is an error; the body is
/// not looked at.
pub fn check_status(response: &RawResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    Err(ApiError::Status(response.status))
}
