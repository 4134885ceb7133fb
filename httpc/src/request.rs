use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode, Version};
use url::Url;

/// Ordered header list that keeps every name exactly as it was written.
///
/// Lookups are case-insensitive, writes are not: `set("X-Id", ..)` and
/// `set("x-id", ..)` produce two entries. Some servers match header names
/// case-sensitively, which is why the spelling is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    /// An empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `value`, replacing any entry spelled exactly the same.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter().position(|(n, _)| *n == name) {
            Some(idx) => {
                self.0[idx].1 = value;
                // Drop any later duplicates appended with the same spelling.
                let mut seen = false;
                self.0.retain(|(n, _)| {
                    if *n != name {
                        return true;
                    }
                    let keep = !seen;
                    seen = true;
                    keep
                });
            }
            None => self.0.push((name, value)),
        }
    }

    /// Appends an entry without touching existing ones.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// First value whose name matches `name` ignoring ASCII case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// True if [`Headers::get`] would find a value.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Removes every entry whose name matches `name` ignoring ASCII case.
    pub fn remove(&mut self, name: &str) {
        self.0.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    /// Entries in insertion order, spelled as written.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of entries, duplicates included.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Returns the canonical spelling of a header name: the first letter and every
/// letter following a dash upper case, the rest lower case.
///
/// Names containing characters that are not valid in a header token are
/// returned unchanged.
pub fn canonical_header_name(name: &str) -> String {
    if name.is_empty() || !name.bytes().all(is_token_byte) {
        return name.to_owned();
    }
    let mut upper = true;
    name.chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

/// An outgoing request, after options were applied and the body encoded.
///
/// This is what a pre-request hook mutates and what a [`crate::Transport`]
/// sends.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    headers: Headers,
    body: Bytes,
    request_id: String,
}

impl Request {
    /// A request without headers or correlation id.
    pub fn new(method: Method, url: Url, body: Bytes) -> Self {
        Self {
            method,
            url,
            headers: Headers::new(),
            body,
            request_id: String::new(),
        }
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Full URL, query included.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Mutable access for hooks, e.g. to sign the query.
    pub fn url_mut(&mut self) -> &mut Url {
        &mut self.url
    }

    /// Headers as they will be sent.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Mutable access to the headers.
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Encoded body. Empty if there is none.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Replaces the encoded body.
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    /// Correlation id of the dispatch this request belongs to.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub(crate) fn set_request_id(&mut self, request_id: String) {
        self.request_id = request_id;
    }
}

/// Head of a received response. The body is returned separately, fully read.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    url: Url,
}

impl Response {
    /// Assembles a response head, mostly useful for custom transports.
    pub fn new(status: StatusCode, version: Version, headers: HeaderMap, url: Url) -> Self {
        Self {
            status,
            version,
            headers,
            url,
        }
    }

    /// Status code, returned as is for every status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Protocol version the response was received with.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Final URL of the response.
    pub fn url(&self) -> &Url {
        &self.url
    }
}
