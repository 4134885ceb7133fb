//! Raw request/response frame rendering for log dumps.

use std::fmt::Write as _;

use http::Version;
use tracing::{debug, warn};

use crate::request::{Request, Response};

#[derive(Debug, thiserror::Error)]
pub(crate) enum DumpError {
    #[error("header {name} has a value that is not visible ASCII")]
    HeaderValue { name: String },
}

fn version_str(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "HTTP/1.1",
    }
}

/// Renders `request` the way it would look as an HTTP/1.1 frame.
pub(crate) fn render_request(request: &Request) -> String {
    let url = request.url();
    let mut target = url.path().to_owned();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }

    let mut out = format!("{} {target} HTTP/1.1\r\n", request.method());
    if let Some(host) = url.host_str() {
        match url.port() {
            Some(port) => {
                let _ = write!(out, "Host: {host}:{port}\r\n");
            }
            None => {
                let _ = write!(out, "Host: {host}\r\n");
            }
        }
    }
    for (name, value) in request.headers().iter() {
        let _ = write!(out, "{name}: {value}\r\n");
    }
    out.push_str("\r\n");
    out.push_str(&String::from_utf8_lossy(request.body()));
    out
}

pub(crate) fn render_response(response: &Response, body: &[u8]) -> Result<String, DumpError> {
    let mut out = format!("{} {}\r\n", version_str(response.version()), response.status());
    for (name, value) in response.headers() {
        let value = value.to_str().map_err(|_| DumpError::HeaderValue {
            name: name.to_string(),
        })?;
        let _ = write!(out, "{name}: {value}\r\n");
    }
    out.push_str("\r\n");
    out.push_str(&String::from_utf8_lossy(body));
    Ok(out)
}

pub(crate) fn log_request(request: &Request) {
    debug!(
        request_id = request.request_id(),
        "\n---------- HTTP Request Dump -----------\n(RequestId={})\n{}\n----------------------------------------",
        request.request_id(),
        render_request(request),
    );
}

pub(crate) fn log_response(response: &Response, body: &[u8], request_id: &str) {
    match render_response(response, body) {
        Ok(dump) => debug!(
            request_id,
            "\n---------- HTTP Response Dump ----------\n(RequestId={request_id})\n{dump}\n----------------------------------------",
        ),
        Err(err) => warn!(request_id, error = %err, "unable to dump response"),
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::{HeaderMap, HeaderValue, Method, StatusCode};
    use url::Url;

    use super::*;
    use crate::test_logs::CapturedLogs;

    fn response_with(headers: HeaderMap) -> Response {
        Response::new(
            StatusCode::OK,
            Version::HTTP_11,
            headers,
            Url::parse("https://example.org/").unwrap(),
        )
    }

    #[test]
    fn test_render_request_keeps_header_spelling() {
        let url = Url::parse("http://localhost:8080/anything?message=hello").unwrap();
        let mut request = Request::new(Method::POST, url, Bytes::from_static(b"{\"a\":1}"));
        request.headers_mut().set("MESSAGE", "hello");
        request.headers_mut().set("Content-Type", "application/json");

        assert_eq!(
            render_request(&request),
            "POST /anything?message=hello HTTP/1.1\r\n\
             Host: localhost:8080\r\n\
             MESSAGE: hello\r\n\
             Content-Type: application/json\r\n\
             \r\n\
             {\"a\":1}"
        );
    }

    #[test]
    fn test_render_response() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("text/plain"));
        let response = Response::new(
            StatusCode::OK,
            Version::HTTP_11,
            headers,
            Url::parse("https://example.org/").unwrap(),
        );
        assert_eq!(
            render_response(&response, b"hi").unwrap(),
            "HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\n\r\nhi"
        );
    }

    #[test]
    fn test_render_response_rejects_opaque_header_values() {
        let mut headers = HeaderMap::new();
        headers.insert("x-bin", HeaderValue::from_bytes(&[0xfa, 0xfb]).unwrap());
        let response = Response::new(
            StatusCode::OK,
            Version::HTTP_11,
            headers,
            Url::parse("https://example.org/").unwrap(),
        );
        assert!(matches!(
            render_response(&response, b""),
            Err(DumpError::HeaderValue { name }) if name == "x-bin"
        ));
    }

    #[test]
    fn test_unrenderable_response_logs_a_warning() {
        let mut headers = HeaderMap::new();
        headers.insert("x-bin", HeaderValue::from_bytes(&[0xfa, 0xfb]).unwrap());
        let (logs, _guard) = CapturedLogs::install();

        log_response(&response_with(headers), b"secret", "req-1");

        let out = logs.contents();
        assert!(out.contains("WARN"), "{out}");
        assert!(out.contains("unable to dump response"), "{out}");
        assert!(out.contains("req-1"), "{out}");
        assert!(out.contains("x-bin"), "{out}");
        assert!(!out.contains("HTTP Response Dump"), "{out}");
    }

    #[test]
    fn test_response_dump_is_framed() {
        let (logs, _guard) = CapturedLogs::install();

        log_response(&response_with(HeaderMap::new()), b"hi", "req-2");

        let out = logs.contents();
        assert!(out.contains("DEBUG"), "{out}");
        assert!(out.contains("---------- HTTP Response Dump ----------"), "{out}");
        assert!(out.contains("(RequestId=req-2)"), "{out}");
        assert!(out.contains("HTTP/1.1 200 OK"), "{out}");
        assert!(!out.contains("unable to dump response"), "{out}");
    }
}
