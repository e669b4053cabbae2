//! Uniform request/response contract over an asynchronous HTTP transport.
//!
//! # Overview
//! Callers issue GET/POST/PUT/PATCH/DELETE requests through [`HttpService`]
//! and get back a [`DispatchHandle`]: a future for the decoded body plus an
//! abort trigger. The service merges process-wide defaults with per-call
//! options, encodes the payload, dispatches through a [`Transport`],
//! optionally retries, validates, and decodes.
//!
//! # Design
//! - The network exchange sits behind the [`Transport`] trait.
//!   [`ReqwestTransport`] is the default implementation; tests script their
//!   own.
//! - Policy hooks (retry check, validity check, decoder, error message
//!   extractors) are plain functions in [`Policies`], resolved call-site
//!   first, then service-level, then built-in.
//! - Responses are buffered. Hooks receive duplicates so the original body
//!   is consumed exactly once, by the decoder.
//! - Failures are [`HttpError`]: `Network` when the transport failed,
//!   `Response` (with the envelope attached) when the response was rejected.

pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod http;
pub mod query;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

pub use client::{AbortTrigger, DispatchHandle, HttpService};
pub use config::{Defaults, Headers, Policies, RequestOptions};
pub use error::HttpError;
pub use executor::{
    decode_response, default_check_response, default_process_error, default_process_network_error,
};
pub use http::{FormData, FormPart, HttpMethod, HttpRequest, RequestBody, Response};
pub use query::{query_string, QueryValue, Scalar};
pub use transport::{Transport, TransportError};
#[cfg(feature = "reqwest")]
pub use transport::{ReqwestTransport, TransportConfig};
pub use types::{Decoded, Payload, ResponseType};

pub use tokio_util::sync::CancellationToken;
