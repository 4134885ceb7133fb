//! # httpc
//!
//! A configurable HTTP client wrapper around [`reqwest`] with a JSON REST layer.
//!
//! This crate provides:
//!  - A [`Client`] bound to a base URL and a pluggable [`Transport`]
//!  - A builder ([`ClientBuilder`]) for the namespace, log dumps and HTTP/2
//!  - Composable, reusable [`RequestOption`]s (headers, query, bodies, timeout,
//!    pre-request hook, header casing, auth)
//!  - Content-type driven body encoding for JSON and URL-encoded forms
//!  - A [`RestRequest`] builder that adds a correlation id and decodes JSON
//!  - Optional OpenTelemetry instrumentation and a process-wide transport
//!    override, see [`instrumentation`]
//!
//! ## Example
//! ```rust,no_run
//! use color_eyre::Result;
//! use httpc::{ClientBuilder, Context, RequestOption};
//! use std::time::Duration;
//!
//! #[derive(serde::Deserialize)]
//! struct State {
//!     status: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = ClientBuilder::new("https://management.example.org")
//!         .with_namespace("orb-manager")
//!         .build()?;
//!
//!     let ctx = Context::background().with_timeout(Duration::from_secs(30));
//!     let mut state: Option<State> = None;
//!     client
//!         .rest(httpc::Method::GET, "/api/v1/orbs/{id}/state")
//!         .with_path_param("id", "some_orb_id")
//!         .add_option(RequestOption::bearer_auth("some_bearer_token"))
//!         .execute(&ctx, Some(&mut state))
//!         .await?;
//!
//!     println!("status: {:?}", state.map(|s| s.status));
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]

mod body;
mod builder;
mod client;
mod context;
mod dump;
mod error;
mod form;
pub mod instrumentation;
mod options;
mod request;
mod rest;
#[cfg(test)]
mod test_logs;
mod transport;

pub use body::{Body, JsonPayload};
pub use builder::{ClientBuilder, ClientOptions};
pub use client::Client;
pub use context::Context;
pub use error::{BoxError, EncodingError, Error, TransportError, UsageError};
pub use form::Form;
pub use http::{Method, StatusCode, Version};
pub use instrumentation::{Instrumentation, TracedTransport};
pub use options::{DEFAULT_TIMEOUT_MS, PreRequestHook, RequestOption, RequestOptions};
pub use request::{Headers, Request, Response, canonical_header_name};
pub use rest::RestRequest;
pub use transport::{BodyStream, ReqwestTransport, Transport, TransportResponse};

/// Name of the header that selects how a request body is encoded.
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
/// Sent by [`RestRequest`] to ask for a JSON response.
pub const HEADER_ACCEPT: &str = "Accept";
/// Content type of JSON bodies.
pub const MIME_TYPE_JSON: &str = "application/json";
/// Content type of URL-encoded form bodies.
pub const MIME_TYPE_URL_ENCODED_FORM: &str = "application/x-www-form-urlencoded";
