//! Client core for the Reverse IP/DNS lookup service.
//!
//! # Overview
//! Given an IP address, the service returns the domain names historically
//! hosted on it, one page at a time. [`ReverseIpClient::get`] decodes a page
//! into [`LookupResponse`]; [`ReverseIpClient::get_raw`] hands back the bytes
//! as received.
//!
//! # Design
//! - `ReverseIpClient` is immutable after construction and safe to share.
//! - Each call makes exactly one attempt. Paging, retries and caching are the
//!   caller's business.
//! - Failures come back as [`Failure`], which keeps any response received
//!   before the failure next to the [`ApiError`].
//! - Cancellation is cooperative through a [`CancellationToken`].

pub mod client;
pub mod error;
pub mod http;
pub mod options;
pub mod payload;
pub mod transport;
pub mod types;

pub use client::{ClientParams, ReverseIpClient};
pub use error::{ApiError, ArgError, Failure};
pub use http::{HttpRequest, RawResponse};
pub use options::{QueryOption, QueryParams};
pub use tokio_util::sync::CancellationToken;
pub use types::{ErrorEnvelope, LookupResponse, LookupResult, DEFAULT_PAGE_LIMIT};
