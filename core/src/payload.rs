//! Decoding of response bodies.
//!
//! The service sends either a page of results or an error envelope, with no
//! tag saying which. The body is decoded once into [`Envelope`], which holds
//! the fields of both shapes, and then split by [`Envelope::into_payload`]:
//! a non-empty `messages` or a non-zero `code` means error, anything else is
//! a result page. A result body that happens to carry a non-zero `code` key
//! is therefore read as an error.

use serde::Deserialize;

use crate::error::ApiError;
use crate::types::{ErrorEnvelope, LookupResponse, LookupResult};

/// Every field of both response shapes, all defaulted.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Envelope {
    result: Vec<LookupResult>,
    current_page: String,
    size: usize,
    code: i64,
    messages: String,
}

/// The disambiguated body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Lookup(LookupResponse),
    Error(ErrorEnvelope),
}

impl Envelope {
    pub fn is_error(&self) -> bool {
        !self.messages.is_empty() || self.code != 0
    }

    /// Split into one shape, discarding the fields of the other.
    pub fn into_payload(self) -> Payload {
        if self.is_error() {
            return Payload::Error(ErrorEnvelope {
                code: self.code,
                message: self.messages,
            });
        }
        Payload::Lookup(LookupResponse {
            results: self.result,
            current_page: self.current_page,
            size: self.size,
        })
    }
}

/// Decode the first JSON value of `raw`. Anything after it is ignored.
pub fn parse(raw: &[u8]) -> Result<Envelope, ApiError> {
    let mut values = serde_json::Deserializer::from_slice(raw).into_iter::<Envelope>();
    match values.next() {
        Some(value) => value.map_err(ApiError::Parse),
        // Empty or whitespace-only body; decoding it again yields the EOF error.
        None => serde_json::from_slice(raw).map_err(ApiError::Parse),
    }
}
