use std::fmt;

use bytes::Bytes;
use http::Method;
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    HEADER_ACCEPT, MIME_TYPE_JSON,
    client::Client,
    context::Context,
    error::{Error, UsageError},
    options::RequestOption,
    request::{Request, Response},
};

/// A JSON request against a [`Client`], built up fluently and executed any
/// number of times.
///
/// Every execution carries the same correlation id, generated when the builder
/// is created.
///
/// # Example
/// ```rust,no_run
/// # use httpc::{ClientBuilder, Context, Method};
/// # async fn run() -> Result<(), httpc::Error> {
/// let client = ClientBuilder::new("https://example.org").build()?;
/// let mut created = serde_json::Value::Null;
/// client
///     .rest(Method::POST, "/api/v1/items")
///     .add_header(&["X-Tenant", "acme"])?
///     .body(serde_json::json!({ "name": "thing" }))
///     .execute(&Context::background(), Some(&mut created))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RestRequest {
    request_id: String,
    client: Client,
    method: Method,
    path: String,
    options: Vec<RequestOption>,
}

impl RestRequest {
    pub(crate) fn new(client: Client, method: Method, path: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            client,
            method,
            path: path.into(),
            options: Vec::new(),
        }
    }

    /// Correlation id shared by every execution.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path with placeholders substituted so far.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Appends `option`. Options apply in the order they were added.
    pub fn add_option(mut self, option: RequestOption) -> Self {
        self.options.push(option);
        self
    }

    /// Appends every option of `options`.
    pub fn add_options(mut self, options: impl IntoIterator<Item = RequestOption>) -> Self {
        self.options.extend(options);
        self
    }

    /// See [`RequestOption::add_header`].
    pub fn add_header(self, args: &[&str]) -> Result<Self, UsageError> {
        Ok(self.add_option(RequestOption::add_header(args)?))
    }

    /// See [`RequestOption::add_query`].
    pub fn add_query(self, args: &[&str]) -> Result<Self, UsageError> {
        Ok(self.add_option(RequestOption::add_query(args)?))
    }

    /// Sends `value` as the JSON body.
    pub fn body<T>(self, value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        self.add_option(RequestOption::set_json_body(value))
    }

    /// See [`RequestOption::pre_request_hook`].
    pub fn pre_request(self, hook: impl Fn(&mut Request, &[u8]) + Send + Sync + 'static) -> Self {
        self.add_option(RequestOption::pre_request_hook(hook))
    }

    /// Replaces every `{name}` placeholder in the path with `value`.
    pub fn with_path_param(mut self, name: &str, value: &str) -> Self {
        self.path = self.path.replace(&format!("{{{name}}}"), value);
        self
    }

    /// See [`RequestOption::bearer_auth`].
    pub fn with_bearer_auth(self, token: &str) -> Self {
        self.add_option(RequestOption::bearer_auth(token))
    }

    /// See [`RequestOption::basic_auth`].
    pub fn with_basic_auth(self, username: &str, password: &str) -> Self {
        self.add_option(RequestOption::basic_auth(username, password))
    }

    /// Sends the request with `Accept: application/json` and decodes a
    /// non-empty response body into `dst`.
    ///
    /// The response status is not interpreted: error bodies are decoded the
    /// same way as successful ones.
    ///
    /// # Errors
    /// Everything [`Client::do_request`] returns, plus [`Error::Decode`] if the
    /// body is not valid JSON for `T`. `dst` is left untouched on error.
    pub async fn execute<'a, T>(
        &self,
        ctx: impl Into<Option<&'a Context>>,
        dst: Option<&mut T>,
    ) -> Result<(Response, Bytes), Error>
    where
        T: DeserializeOwned,
    {
        let ctx = ctx
            .into()
            .map(|ctx| ctx.with_request_id(self.request_id.as_str()));

        let mut options = self.options.clone();
        options.push(RequestOption::header(HEADER_ACCEPT, MIME_TYPE_JSON));

        let (response, body) = self
            .client
            .do_request(ctx.as_ref(), self.method.clone(), &self.path, &options)
            .await?;

        if let Some(dst) = dst
            && !body.is_empty()
        {
            *dst = serde_json::from_slice(&body).map_err(Error::Decode)?;
        }
        Ok((response, body))
    }

    /// [`RestRequest::execute`] without decoding the body.
    pub async fn send<'a>(
        &self,
        ctx: impl Into<Option<&'a Context>>,
    ) -> Result<(Response, Bytes), Error> {
        self.execute::<serde::de::IgnoredAny>(ctx, None).await
    }
}

impl fmt::Debug for RestRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestRequest")
            .field("request_id", &self.request_id)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("options", &self.options.len())
            .finish_non_exhaustive()
    }
}
