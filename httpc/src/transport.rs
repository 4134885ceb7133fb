//! The seam between request composition and the network.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt as _, TryStreamExt as _, stream::BoxStream};
use reqwest::header::{HeaderName, HeaderValue};

use crate::{
    error::BoxError,
    request::{Request, Response},
};

/// Stream of response body chunks. Dropping it closes the body.
pub type BodyStream = BoxStream<'static, Result<Bytes, BoxError>>;

/// A response whose body has not been read yet.
pub struct TransportResponse {
    /// Status line and headers.
    pub head: Response,
    /// The unread body.
    pub body: BodyStream,
}

impl TransportResponse {
    /// A response with an in-memory body, mostly useful for custom transports.
    pub fn from_bytes(head: Response, body: impl Into<Bytes>) -> Self {
        let body: Bytes = body.into();
        Self {
            head,
            body: futures::stream::once(async move { Ok(body) }).boxed(),
        }
    }
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("head", &self.head)
            .finish_non_exhaustive()
    }
}

/// Performs a single HTTP exchange.
///
/// Implementations must be safe to share between concurrent requests. They
/// should not retry: a failed attempt is reported as is.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` and returns once the response head arrived.
    async fn round_trip(&self, request: Request) -> Result<TransportResponse, BoxError>;
}

/// Default [`Transport`] backed by a pooled [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds the default client. With `disable_http2` only HTTP/1.1 is spoken.
    /// HTTP/1 header names are written title-cased.
    pub fn new(disable_http2: bool) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder().http1_title_case_headers();
        if disable_http2 {
            builder = builder.http1_only();
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Wraps an already configured client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn round_trip(&self, request: Request) -> Result<TransportResponse, BoxError> {
        let mut builder = self
            .client
            .request(request.method().clone(), request.url().clone());
        for (name, value) in request.headers().iter() {
            builder = builder.header(
                HeaderName::from_bytes(name.as_bytes())?,
                HeaderValue::from_str(value)?,
            );
        }
        if !request.body().is_empty() {
            builder = builder.body(request.body().clone());
        }

        let response = builder.send().await?;
        let head = Response::new(
            response.status(),
            response.version(),
            response.headers().clone(),
            response.url().clone(),
        );
        let body = response.bytes_stream().map_err(BoxError::from).boxed();
        Ok(TransportResponse { head, body })
    }
}
