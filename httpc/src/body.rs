//! Request bodies and their content-type driven encoding.

use std::{fmt, sync::Arc};

use bytes::Bytes;
use http::Method;
use serde::{Serialize, de::IgnoredAny};
use tracing::warn;

use crate::{
    MIME_TYPE_JSON, MIME_TYPE_URL_ENCODED_FORM, error::EncodingError, form::Form,
    options::RequestOptions,
};

type EncodeFn = dyn Fn() -> serde_json::Result<Vec<u8>> + Send + Sync;

/// A request body, fixed to one shape when the option is set.
#[derive(Clone)]
pub enum Body {
    /// Already encoded. Sent as is whatever the content type says.
    Bytes(Bytes),
    /// A value serialized as JSON when the request is dispatched.
    Json(JsonPayload),
    /// A multi-valued form, URL-encoded when the request is dispatched.
    Form(Form),
}

impl Body {
    /// A value serialized with `serde_json` when the request is dispatched.
    pub fn json<T>(value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Self::Json(JsonPayload::new(value))
    }

    /// A pre-serialized JSON document, sent as is once it parsed successfully.
    pub fn raw_json(document: impl Into<String>) -> Self {
        Self::Json(JsonPayload::raw(document))
    }

    /// Rust type name of the value this body was built from.
    pub fn type_name(&self) -> &'static str {
        match self {
            Body::Bytes(_) => std::any::type_name::<Bytes>(),
            Body::Json(payload) => payload.type_name,
            Body::Form(_) => std::any::type_name::<Form>(),
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Bytes(b) => f.debug_tuple("Bytes").field(b).finish(),
            Body::Json(p) => f.debug_tuple("Json").field(p).finish(),
            Body::Form(form) => f.debug_tuple("Form").field(form).finish(),
        }
    }
}

impl From<Bytes> for Body {
    fn from(value: Bytes) -> Self {
        Self::Bytes(value)
    }
}

impl From<Vec<u8>> for Body {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value.into())
    }
}

impl From<&'static [u8]> for Body {
    fn from(value: &'static [u8]) -> Self {
        Self::Bytes(Bytes::from_static(value))
    }
}

impl From<Form> for Body {
    fn from(value: Form) -> Self {
        Self::Form(value)
    }
}

/// A type-erased serializable value.
#[derive(Clone)]
pub struct JsonPayload {
    type_name: &'static str,
    encode: Arc<EncodeFn>,
}

impl JsonPayload {
    /// Captures `value`, which is serialized lazily.
    pub fn new<T>(value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Self {
            type_name: std::any::type_name::<T>(),
            encode: Arc::new(move || serde_json::to_vec(&value)),
        }
    }

    /// A pre-serialized document. Encoding fails if it is not valid JSON.
    pub fn raw(document: impl Into<String>) -> Self {
        let document: String = document.into();
        Self {
            type_name: "raw JSON",
            encode: Arc::new(move || {
                serde_json::from_str::<IgnoredAny>(&document)?;
                Ok(document.clone().into_bytes())
            }),
        }
    }

    /// Encodes the payload.
    pub fn to_vec(&self) -> serde_json::Result<Vec<u8>> {
        (self.encode)()
    }
}

impl fmt::Debug for JsonPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonPayload")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Mime essence of a content-type value: `"Application/JSON; charset=utf-8"`
/// becomes `"application/json"`.
fn mime_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Produces the bytes sent on the wire for `options`' body.
pub(crate) fn compose(
    method: &Method,
    options: &RequestOptions,
) -> Result<Bytes, EncodingError> {
    let Some(body) = options.body() else {
        return Ok(Bytes::new());
    };
    if *method == Method::GET {
        return Ok(Bytes::new());
    }

    let content_type = options.content_type().unwrap_or_default();
    let json_error = |source: serde_json::Error| EncodingError::Json {
        content_type: content_type.to_owned(),
        source,
    };
    match (mime_essence(content_type).as_str(), body) {
        (_, Body::Bytes(raw)) => Ok(raw.clone()),
        (MIME_TYPE_JSON, Body::Json(payload)) => {
            payload.to_vec().map(Bytes::from).map_err(json_error)
        }
        (MIME_TYPE_JSON, Body::Form(form)) => {
            serde_json::to_vec(form).map(Bytes::from).map_err(json_error)
        }
        (MIME_TYPE_URL_ENCODED_FORM, Body::Form(form)) => Ok(Bytes::from(form.encode())),
        (MIME_TYPE_URL_ENCODED_FORM, other) => Err(EncodingError::FormType {
            actual: other.type_name(),
        }),
        _ => {
            warn!(
                content_type,
                "unsupported Content-Type in request body, sending no body"
            );
            Ok(Bytes::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde::Serializer;
    use serde_json::json;

    use super::*;
    use crate::{HEADER_CONTENT_TYPE, options::RequestOption};

    fn compose_with(method: Method, opts: &[RequestOption]) -> Result<Bytes, EncodingError> {
        compose(&method, &RequestOptions::evaluate(opts))
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("unexpected end of JSON input"))
        }
    }

    #[test]
    fn test_json_body_is_canonical_serialization() {
        let value = json!({ "message": "hello", "n": [1, 2, 3] });
        let body = compose_with(
            Method::POST,
            &[RequestOption::set_json_body(value.clone())],
        )
        .unwrap();
        assert_eq!(body, serde_json::to_vec(&value).unwrap());
    }

    #[test]
    fn test_no_body_is_empty() {
        for method in [Method::GET, Method::POST, Method::PUT, Method::DELETE] {
            assert!(compose_with(method, &[]).unwrap().is_empty());
        }
    }

    #[test]
    fn test_get_ignores_body() {
        let body = compose_with(
            Method::GET,
            &[RequestOption::set_json_body(Unserializable)],
        )
        .unwrap();
        assert!(body.is_empty());
    }

    #[test]
    fn test_raw_bytes_pass_through() {
        let body = compose_with(
            Method::POST,
            &[
                RequestOption::header(HEADER_CONTENT_TYPE, MIME_TYPE_JSON),
                RequestOption::set_body(b"hello".as_slice()),
            ],
        )
        .unwrap();
        assert_eq!(body, "hello");
    }

    #[test]
    fn test_unserializable_json_fails() {
        let err = compose_with(
            Method::POST,
            &[RequestOption::set_json_body(Unserializable)],
        )
        .unwrap_err();
        assert!(matches!(&err, EncodingError::Json { content_type, .. } if content_type == MIME_TYPE_JSON));
        assert!(err.to_string().contains("ContentType = application/json"));
    }

    #[test]
    fn test_malformed_raw_json_fails() {
        let err = compose_with(Method::POST, &[RequestOption::set_raw_json_body("{")])
            .unwrap_err();
        assert!(
            err.to_string()
                .starts_with("httpc: failed to compose request body. ContentType = application/json, Error = EOF"),
            "{err}"
        );

        let body = compose_with(
            Method::POST,
            &[RequestOption::set_raw_json_body(r#"{ "a" : 1 }"#)],
        )
        .unwrap();
        assert_eq!(body, r#"{ "a" : 1 }"#);
    }

    #[test]
    fn test_non_string_map_keys_fail() {
        let mut value = HashMap::new();
        value.insert((1, 2), "tuple keys are not JSON");
        let err = compose_with(Method::POST, &[RequestOption::set_json_body(value)])
            .unwrap_err();
        assert!(matches!(err, EncodingError::Json { .. }));
    }

    #[test]
    fn test_form_body_is_url_encoded() {
        let form: Form = [("message", "hello world"), ("a", "1")].into_iter().collect();
        let body = compose_with(
            Method::POST,
            &[RequestOption::set_url_encoded_form_body(form)],
        )
        .unwrap();
        assert_eq!(body, "a=1&message=hello+world");
    }

    #[test]
    fn test_form_content_type_requires_form_body() {
        let err = compose_with(
            Method::POST,
            &[
                RequestOption::header(HEADER_CONTENT_TYPE, MIME_TYPE_URL_ENCODED_FORM),
                RequestOption::set_body(Body::json("invalid form body")),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, EncodingError::FormType { actual: "&str" }));
        assert_eq!(
            err.to_string(),
            "httpc: unable to compose URL-encoded form, body is not a form. Type = &str"
        );
    }

    #[test]
    fn test_unsupported_content_type_sends_nothing() {
        let body = compose_with(
            Method::POST,
            &[
                RequestOption::header(HEADER_CONTENT_TYPE, "application/octet-stream"),
                RequestOption::set_body(Body::json(json!({ "message": "hello" }))),
            ],
        )
        .unwrap();
        assert!(body.is_empty());
    }

    #[test]
    fn test_content_type_matches_essence() {
        let body = compose_with(
            Method::PATCH,
            &[
                RequestOption::set_body(Body::json(json!({ "a": 1 }))),
                RequestOption::header("content-type", "Application/JSON; charset=utf-8"),
            ],
        )
        .unwrap();
        assert_eq!(body, r#"{"a":1}"#);
    }

    #[test]
    fn test_last_content_type_spelling_decides_encoding() {
        let body = compose_with(
            Method::POST,
            &[
                RequestOption::header("content-type", "text/plain"),
                RequestOption::set_json_body(json!({ "a": 1 })),
            ],
        )
        .unwrap();
        assert_eq!(body, r#"{"a":1}"#);

        let body = compose_with(
            Method::POST,
            &[
                RequestOption::set_json_body(json!({ "a": 1 })),
                RequestOption::header("CONTENT-TYPE", "text/plain"),
            ],
        )
        .unwrap();
        assert!(body.is_empty());
    }

    #[test]
    fn test_verbatim_mode_reads_exact_content_type() {
        let body = compose_with(
            Method::POST,
            &[
                RequestOption::disable_canonical_header(),
                RequestOption::header("content-type", MIME_TYPE_URL_ENCODED_FORM),
                RequestOption::set_json_body(json!({ "a": 1 })),
            ],
        )
        .unwrap();
        assert_eq!(body, r#"{"a":1}"#);

        let body = compose_with(
            Method::POST,
            &[
                RequestOption::disable_canonical_header(),
                RequestOption::header("content-type", MIME_TYPE_JSON),
                RequestOption::set_body(Body::json(json!({ "a": 1 }))),
            ],
        )
        .unwrap();
        assert!(body.is_empty());
    }

    #[test]
    fn test_form_as_json() {
        let form: Form = [("k", "v")].into_iter().collect();
        let body = compose_with(
            Method::POST,
            &[
                RequestOption::header(HEADER_CONTENT_TYPE, MIME_TYPE_JSON),
                RequestOption::set_body(form),
            ],
        )
        .unwrap();
        assert_eq!(body, r#"{"k":["v"]}"#);
    }
}
