use std::{fmt, sync::Arc, time::Instant};

use bytes::{Bytes, BytesMut};
use futures::TryStreamExt as _;
use http::Method;
use tracing::{Instrument as _, debug, debug_span, error};
use url::Url;

use crate::{
    body,
    builder::ClientOptions,
    context::{Context, Interrupted},
    dump,
    error::{Error, TransportError},
    instrumentation::sanitize_url,
    options::{RequestOption, RequestOptions},
    request::{Request, Response, canonical_header_name},
    rest::RestRequest,
    transport::{Transport, TransportResponse},
};

/// An HTTP client bound to a base URL and a [`Transport`].
///
/// Cheap to clone; clones share the transport and its connection pool.
#[derive(Clone)]
pub struct Client {
    base_url: String,
    transport: Arc<dyn Transport>,
    namespace: String,
    log_dump: bool,
}

impl Client {
    pub(crate) fn new(base_url: String, transport: Arc<dyn Transport>, options: ClientOptions) -> Self {
        Self {
            base_url,
            transport,
            namespace: options.namespace,
            log_dump: options.log_dump,
        }
    }

    /// Prefix every request path is appended to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Recorded on the span of every request.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Whether raw frames are dumped at debug level.
    pub fn log_dump(&self) -> bool {
        self.log_dump
    }

    /// The transport requests are sent through, after any global override and
    /// instrumentation were applied.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Starts a [`RestRequest`] for `path`, relative to the base URL.
    pub fn rest(&self, method: Method, path: impl Into<String>) -> RestRequest {
        RestRequest::new(self.clone(), method, path)
    }

    /// [`Client::do_request`] with `GET`.
    pub async fn get<'a>(
        &self,
        ctx: impl Into<Option<&'a Context>>,
        path: &str,
        options: &[RequestOption],
    ) -> Result<(Response, Bytes), Error> {
        self.do_request(ctx, Method::GET, path, options).await
    }

    /// [`Client::do_request`] with `POST`.
    pub async fn post<'a>(
        &self,
        ctx: impl Into<Option<&'a Context>>,
        path: &str,
        options: &[RequestOption],
    ) -> Result<(Response, Bytes), Error> {
        self.do_request(ctx, Method::POST, path, options).await
    }

    /// [`Client::do_request`] with `PUT`.
    pub async fn put<'a>(
        &self,
        ctx: impl Into<Option<&'a Context>>,
        path: &str,
        options: &[RequestOption],
    ) -> Result<(Response, Bytes), Error> {
        self.do_request(ctx, Method::PUT, path, options).await
    }

    /// [`Client::do_request`] with `PATCH`.
    pub async fn patch<'a>(
        &self,
        ctx: impl Into<Option<&'a Context>>,
        path: &str,
        options: &[RequestOption],
    ) -> Result<(Response, Bytes), Error> {
        self.do_request(ctx, Method::PATCH, path, options).await
    }

    /// [`Client::do_request`] with `DELETE`.
    pub async fn delete<'a>(
        &self,
        ctx: impl Into<Option<&'a Context>>,
        path: &str,
        options: &[RequestOption],
    ) -> Result<(Response, Bytes), Error> {
        self.do_request(ctx, Method::DELETE, path, options).await
    }

    /// Sends one request and reads the whole response body.
    ///
    /// `path` is appended verbatim to the base URL. The exchange is bounded by
    /// the context's deadline and cancellation token, further shortened by the
    /// request timeout when it is positive. Failures are returned as is and
    /// never retried.
    ///
    /// # Errors
    /// - [`Error::MissingContext`] if `ctx` is `None`. Nothing is sent.
    /// - [`Error::InvalidUrl`] if base URL, path and query do not form a URL.
    /// - [`Error::Encoding`] if the body cannot be encoded.
    /// - [`Error::Transport`] if sending or reading the body fails or is
    ///   interrupted.
    pub async fn do_request<'a>(
        &self,
        ctx: impl Into<Option<&'a Context>>,
        method: Method,
        path: &str,
        options: &[RequestOption],
    ) -> Result<(Response, Bytes), Error> {
        let span = debug_span!("httpc", namespace = %self.namespace);
        self.dispatch(ctx.into(), method, path, options)
            .instrument(span)
            .await
    }

    async fn dispatch(
        &self,
        ctx: Option<&Context>,
        method: Method,
        path: &str,
        options: &[RequestOption],
    ) -> Result<(Response, Bytes), Error> {
        let ctx = ctx.ok_or(Error::MissingContext)?;
        let options = RequestOptions::evaluate(options);

        let mut raw_url = format!("{}{path}", self.base_url);
        if !options.query().is_empty() {
            raw_url.push('?');
            raw_url.push_str(&options.query().encode());
        }
        let url = Url::parse(&raw_url).map_err(|source| Error::InvalidUrl {
            url: raw_url,
            source,
        })?;

        let body = body::compose(&method, &options)?;

        // The derived scope ends with this call, whichever way it returns.
        let (ctx, _scope) = match options.timeout() {
            Some(timeout) => {
                let child = ctx.with_timeout(timeout);
                let guard = child.cancel_on_drop();
                (child, Some(guard))
            }
            None => (ctx.clone(), None),
        };

        let mut request = Request::new(method.clone(), url.clone(), body.clone());
        for (name, value) in options.headers().iter() {
            if options.canonical_header() {
                request.headers_mut().set(canonical_header_name(name), value);
            } else {
                request.headers_mut().set(name, value);
            }
        }
        let request_id = ctx
            .request_id()
            .map(str::to_owned)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        request.set_request_id(request_id.clone());
        if let Some(hook) = options.pre_request() {
            hook(&mut request, body.as_ref());
        }

        if self.log_dump {
            dump::log_request(&request);
        }

        let start = Instant::now();
        let response = match ctx.run(self.transport.round_trip(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(source)) => {
                let err = TransportError::Send {
                    method,
                    url,
                    source,
                };
                error!(request_id = %request_id, error = %err, "HTTP request failed");
                return Err(err.into());
            }
            Err(interrupted) => {
                let err = interrupted_error(interrupted, method, url);
                error!(request_id = %request_id, error = %err, "HTTP request failed");
                return Err(err.into());
            }
        };

        let TransportResponse { head, body } = response;
        let read = body.try_fold(BytesMut::new(), |mut buf, chunk| async move {
            buf.extend_from_slice(&chunk);
            Ok(buf)
        });
        let body = match ctx.run(read).await {
            Ok(Ok(buf)) => buf.freeze(),
            Ok(Err(source)) => {
                let err = TransportError::Body(source);
                error!(request_id = %request_id, error = %err, "failed to read response body");
                return Err(err.into());
            }
            Err(interrupted) => {
                let err = interrupted_error(interrupted, method, url);
                error!(request_id = %request_id, error = %err, "failed to read response body");
                return Err(err.into());
            }
        };

        if self.log_dump {
            dump::log_response(&head, &body, &request_id);
        }
        debug!(
            request_id = %request_id,
            method = %method,
            url = %sanitize_url(&url),
            status = head.status().as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "HTTP request completed"
        );

        Ok((head, body))
    }
}

fn interrupted_error(interrupted: Interrupted, method: Method, url: Url) -> TransportError {
    match interrupted {
        Interrupted::DeadlineExceeded => TransportError::DeadlineExceeded { method, url },
        Interrupted::Canceled => TransportError::Canceled { method, url },
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("namespace", &self.namespace)
            .field("log_dump", &self.log_dump)
            .finish_non_exhaustive()
    }
}
