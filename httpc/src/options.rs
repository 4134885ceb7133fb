//! Per-request options and how they are folded together.

use std::{fmt, sync::Arc, time::Duration};

use base64::Engine as _;
use serde::Serialize;

use crate::{
    HEADER_CONTENT_TYPE, MIME_TYPE_JSON, MIME_TYPE_URL_ENCODED_FORM,
    body::Body,
    error::UsageError,
    form::Form,
    request::{Headers, Request, canonical_header_name},
};

/// Timeout applied to a request unless overridden with [`RequestOption::timeout`].
pub const DEFAULT_TIMEOUT_MS: i64 = 10_000;

/// Hook called with the fully built request and its encoded body right before it
/// is sent.
pub type PreRequestHook = Arc<dyn Fn(&mut Request, &[u8]) + Send + Sync>;

/// Resolved options of a single request.
#[derive(Clone)]
pub struct RequestOptions {
    headers: Headers,
    query: Form,
    body: Option<Body>,
    timeout_ms: i64,
    pre_request: Option<PreRequestHook>,
    canonical_header: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            headers: Headers::new(),
            query: Form::new(),
            body: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            pre_request: None,
            canonical_header: true,
        }
    }
}

impl RequestOptions {
    /// Applies `options` in order on top of the defaults.
    pub fn evaluate(options: &[RequestOption]) -> Self {
        let mut resolved = Self::default();
        for option in options {
            option.apply(&mut resolved);
        }
        resolved
    }

    /// Headers in the order and spelling they were set.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// The `Content-Type` value the request is sent with.
    ///
    /// Resolved the way headers are written: in canonical mode the last entry
    /// whose canonical name is `Content-Type` wins, otherwise only the exact
    /// `Content-Type` spelling counts.
    pub fn content_type(&self) -> Option<&str> {
        let canonical = self.canonical_header;
        self.headers
            .iter()
            .filter(|(name, _)| {
                if canonical {
                    canonical_header_name(name) == HEADER_CONTENT_TYPE
                } else {
                    *name == HEADER_CONTENT_TYPE
                }
            })
            .map(|(_, value)| value)
            .last()
    }

    /// Accumulated query parameters.
    pub fn query(&self) -> &Form {
        &self.query
    }

    /// The last body set, if any.
    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// Raw timeout as set, in milliseconds.
    pub fn timeout_ms(&self) -> i64 {
        self.timeout_ms
    }

    /// The explicit timeout, or `None` if the caller's deadline applies alone.
    pub fn timeout(&self) -> Option<Duration> {
        u64::try_from(self.timeout_ms)
            .ok()
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// The last hook set with [`RequestOption::pre_request_hook`].
    pub fn pre_request(&self) -> Option<&PreRequestHook> {
        self.pre_request.as_ref()
    }

    /// Whether header names are canonicalized before sending.
    pub fn canonical_header(&self) -> bool {
        self.canonical_header
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("headers", &self.headers)
            .field("query", &self.query)
            .field("body", &self.body)
            .field("timeout_ms", &self.timeout_ms)
            .field("pre_request", &self.pre_request.is_some())
            .field("canonical_header", &self.canonical_header)
            .finish()
    }
}

/// One modification of [`RequestOptions`].
///
/// Options are reusable: the same option can be applied to any number of
/// requests.
#[derive(Clone)]
pub struct RequestOption(Arc<dyn Fn(&mut RequestOptions) + Send + Sync>);

impl RequestOption {
    /// Wraps an arbitrary modification.
    pub fn new(f: impl Fn(&mut RequestOptions) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Applies the modification to `options`.
    pub fn apply(&self, options: &mut RequestOptions) {
        (self.0)(options)
    }

    /// Sets headers from a flat `name, value, name, value, ..` list. Later values
    /// overwrite earlier ones with the same name.
    pub fn add_header(args: &[&str]) -> Result<Self, UsageError> {
        let pairs = tag_value_pairs(args).ok_or(UsageError::AddHeaderArgs(args.len()))?;
        Ok(Self::new(move |o| {
            for (name, value) in &pairs {
                o.headers.set(name.as_str(), value.as_str());
            }
        }))
    }

    /// Sets a single header.
    pub fn header(name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        Self::new(move |o| o.headers.set(name.as_str(), value.as_str()))
    }

    /// Appends query parameters from a flat `key, value, key, value, ..` list.
    pub fn add_query(args: &[&str]) -> Result<Self, UsageError> {
        let pairs = tag_value_pairs(args).ok_or(UsageError::AddQueryArgs(args.len()))?;
        Ok(Self::new(move |o| {
            for (key, value) in &pairs {
                o.query.add(key.as_str(), value.as_str());
            }
        }))
    }

    /// Sets the body without touching the content type.
    pub fn set_body(body: impl Into<Body>) -> Self {
        let body = body.into();
        Self::new(move |o| o.body = Some(body.clone()))
    }

    /// Sets a JSON body and `Content-Type: application/json`.
    pub fn set_json_body<T>(value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        let body = Body::json(value);
        Self::new(move |o| {
            o.headers.set(HEADER_CONTENT_TYPE, MIME_TYPE_JSON);
            o.body = Some(body.clone());
        })
    }

    /// Sets a pre-serialized JSON body and `Content-Type: application/json`.
    /// The document is validated when the request is dispatched.
    pub fn set_raw_json_body(document: impl Into<String>) -> Self {
        let body = Body::raw_json(document);
        Self::new(move |o| {
            o.headers.set(HEADER_CONTENT_TYPE, MIME_TYPE_JSON);
            o.body = Some(body.clone());
        })
    }

    /// Sets a form body and `Content-Type: application/x-www-form-urlencoded`.
    pub fn set_url_encoded_form_body(form: Form) -> Self {
        Self::new(move |o| {
            o.headers.set(HEADER_CONTENT_TYPE, MIME_TYPE_URL_ENCODED_FORM);
            o.body = Some(Body::Form(form.clone()));
        })
    }

    /// Request timeout in milliseconds. Zero or negative disables it, leaving
    /// only the caller's context deadline.
    pub fn timeout(ms: i64) -> Self {
        Self::new(move |o| o.timeout_ms = ms)
    }

    /// Calls `hook` with the built request and its encoded body right before
    /// sending. Mutations to the request are sent.
    pub fn pre_request_hook(
        hook: impl Fn(&mut Request, &[u8]) + Send + Sync + 'static,
    ) -> Self {
        let hook: PreRequestHook = Arc::new(hook);
        Self::new(move |o| o.pre_request = Some(Arc::clone(&hook)))
    }

    /// Sends header names exactly as written instead of canonicalizing them.
    pub fn disable_canonical_header() -> Self {
        Self::new(|o| o.canonical_header = false)
    }

    /// `Authorization: Bearer <token>`.
    pub fn bearer_auth(token: &str) -> Self {
        Self::header("Authorization", format!("Bearer {token}"))
    }

    /// `Authorization: Basic <base64(username:password)>`.
    pub fn basic_auth(username: &str, password: &str) -> Self {
        let credentials = base64::engine::general_purpose::STANDARD
            .encode(format!("{username}:{password}"));
        Self::header("Authorization", format!("Basic {credentials}"))
    }
}

impl fmt::Debug for RequestOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RequestOption(..)")
    }
}

/// Splits a flat tag/value list into pairs. `None` if the list is empty or odd.
fn tag_value_pairs(args: &[&str]) -> Option<Vec<(String, String)>> {
    if args.is_empty() || args.len() % 2 == 1 {
        return None;
    }
    Some(
        args.chunks_exact(2)
            .map(|pair| (pair[0].to_owned(), pair[1].to_owned()))
            .collect(),
    )
}
