use std::{fmt, sync::Arc};

use tracing::debug;

use crate::{
    client::Client,
    error::Error,
    instrumentation::{self, Instrumentation, TracedTransport},
    transport::{ReqwestTransport, Transport},
};

/// Client-wide settings accumulated by a [`ClientBuilder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Logging namespace recorded on every event of the client.
    pub namespace: String,
    /// Dump raw request and response frames at debug level.
    pub log_dump: bool,
    /// Speak HTTP/1.1 only.
    pub disable_http2: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            namespace: "httpc".to_owned(),
            log_dump: false,
            disable_http2: false,
        }
    }
}

/// A builder for configuring and constructing a [`Client`].
///
/// # Example
/// ```rust
/// use httpc::ClientBuilder;
///
/// # fn main() -> Result<(), httpc::Error> {
/// let client = ClientBuilder::new("https://example.org")
///     .with_namespace("my-service")
///     .with_log_dump(true)
///     .build()?;
/// assert_eq!(client.namespace(), "my-service");
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    base_url: String,
    options: ClientOptions,
    transport: Option<Arc<dyn Transport>>,
    instrumentation: Option<Instrumentation>,
}

impl ClientBuilder {
    /// Starts a builder for requests relative to `base_url`. Paths are appended
    /// to it verbatim, so it should not end with a slash.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            options: ClientOptions::default(),
            transport: None,
            instrumentation: None,
        }
    }

    /// Logging namespace recorded on every request span.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.options.namespace = namespace.into();
        self
    }

    /// Dumps raw request and response frames at debug level.
    pub fn with_log_dump(mut self, log_dump: bool) -> Self {
        self.options.log_dump = log_dump;
        self
    }

    /// Restricts the default transport to HTTP/1.1. Has no effect on a
    /// transport passed to [`ClientBuilder::with_transport`].
    pub fn with_http2_disabled(mut self, disable_http2: bool) -> Self {
        self.options.disable_http2 = disable_http2;
        self
    }

    /// Uses `transport` instead of building a [`ReqwestTransport`].
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Overrides the process-wide [`Instrumentation`] for this client.
    pub fn with_instrumentation(mut self, instrumentation: Instrumentation) -> Self {
        self.instrumentation = Some(instrumentation);
        self
    }

    /// Settings accumulated so far.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Builds the [`Client`].
    ///
    /// The global transporter overrider, if one is installed, is applied to the
    /// base transport before it gets instrumented.
    ///
    /// # Errors
    /// [`Error::Build`] if the default reqwest client cannot be built.
    pub fn build(self) -> Result<Client, Error> {
        let mut transport = match self.transport {
            Some(transport) => transport,
            None => {
                if self.options.disable_http2 {
                    debug!(namespace = %self.options.namespace, "HTTP/2 automatic switch is disabled");
                }
                let transport = ReqwestTransport::new(self.options.disable_http2)
                    .map_err(|e| Error::Build(e.into()))?;
                Arc::new(transport) as Arc<dyn Transport>
            }
        };
        if let Some(overrider) = instrumentation::global_transporter_overrider() {
            transport = overrider(transport);
        }

        let instrumentation = self
            .instrumentation
            .unwrap_or_else(instrumentation::instrumentation);
        if instrumentation == Instrumentation::OpenTelemetry {
            transport = Arc::new(TracedTransport::new(transport));
        }

        Ok(Client::new(self.base_url, transport, self.options))
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("base_url", &self.base_url)
            .field("options", &self.options)
            .field("transport", &self.transport.is_some())
            .field("instrumentation", &self.instrumentation)
            .finish()
    }
}
