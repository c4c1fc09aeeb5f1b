use std::collections::HashMap;

/// A parsed HTTP request from a client.
///
/// Header names are lower-cased and values left-trimmed during parsing;
/// when the same name appears twice, the last value wins. Instances are
/// immutable once constructed and live for a single connection.
#[derive(Debug, Clone)]
pub struct Request {
    /// The HTTP method token, verbatim from the request line.
    pub method: String,
    /// The request path (target up to the first `?`).
    pub path: String,
    /// The query string (target after the first `?`), empty if absent.
    pub query: String,
    /// HTTP version (typically "HTTP/1.1").
    pub version: String,
    /// Request headers, lower-cased name to trimmed value.
    pub headers: HashMap<String, String>,
    /// Request body, already de-framed (fixed-length or chunked).
    pub body: Vec<u8>,
}

impl Request {
    /// Retrieves a header value by its lower-cased name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|v| v.as_str())
    }
}
