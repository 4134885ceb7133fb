use http::Method;
use url::Url;

/// Boxed error produced by a [`crate::Transport`] implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Everything that can go wrong while building or dispatching a request.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// See [`UsageError`].
    #[error(transparent)]
    Usage(#[from] UsageError),
    /// No [`crate::Context`] was passed. Nothing was sent.
    #[error("httpc: ctx is required")]
    MissingContext,
    /// Base URL, path and query do not parse as a URL.
    #[error("httpc: invalid request url {url:?}")]
    InvalidUrl {
        /// The concatenated URL.
        url: String,
        /// Why it did not parse.
        #[source]
        source: url::ParseError,
    },
    /// See [`EncodingError`].
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    /// See [`TransportError`].
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The REST layer could not parse the response body into the destination.
    #[error(transparent)]
    Decode(serde_json::Error),
    /// The default transport could not be constructed.
    #[error("httpc: failed to build transport")]
    Build(#[source] BoxError),
}

/// A tag/value list passed to a header or query option was malformed.
///
/// This is always a programming mistake at the call site.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    /// Odd or empty list given to [`crate::RequestOption::add_header`].
    #[error("httpc: invalid add_header() args count {0}, must be >= 2 and even")]
    AddHeaderArgs(usize),
    /// Odd or empty list given to [`crate::RequestOption::add_query`].
    #[error("httpc: invalid add_query() args count {0}, must be >= 2 and even")]
    AddQueryArgs(usize),
}

/// The request body could not be encoded for its declared content type.
#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    /// JSON serialization of the body failed.
    #[error(
        "httpc: failed to compose request body. ContentType = {content_type}, Error = {source}"
    )]
    Json {
        /// Content type the body was encoded for, as written.
        content_type: String,
        /// The serializer's error.
        #[source]
        source: serde_json::Error,
    },
    /// A form content type was set but the body is not a [`crate::Form`].
    #[error(
        "httpc: unable to compose URL-encoded form, body is not a form. Type = {actual}"
    )]
    FormType {
        /// Type name of the body that was set.
        actual: &'static str,
    },
}

/// A failure of the network exchange itself. Never retried.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The context deadline or request timeout elapsed.
    #[error("{method} \"{url}\": context deadline exceeded")]
    DeadlineExceeded {
        /// Method of the aborted request.
        method: Method,
        /// URL of the aborted request.
        url: Url,
    },
    /// The context was cancelled.
    #[error("{method} \"{url}\": context canceled")]
    Canceled {
        /// Method of the aborted request.
        method: Method,
        /// URL of the aborted request.
        url: Url,
    },
    /// The transport failed before a response head arrived.
    #[error("{method} \"{url}\": {source}")]
    Send {
        /// Method of the failed request.
        method: Method,
        /// URL of the failed request.
        url: Url,
        /// The transport's error.
        #[source]
        source: BoxError,
    },
    /// Reading the response body failed.
    #[error("failed to read response body: {0}")]
    Body(#[source] BoxError),
}

impl TransportError {
    /// True if the exchange was aborted because a deadline elapsed.
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Self::DeadlineExceeded { .. })
    }

    /// True if the exchange was aborted because the context was cancelled.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled { .. })
    }
}
