//! The application call contract.
//!
//! An [`Application`] is invoked exactly once per request with a read-only
//! [`Environ`] and a [`ResponseProtocol`] bound to the connection. It
//! declares a status and headers, then returns its body as a lazy finite
//! chunk sequence which the server drives to the wire.

use std::collections::{HashMap, VecDeque};
use std::io::Cursor;

use bytes::Bytes;

use crate::http::request::Request;
use crate::http::response::ResponseProtocol;

/// The standardized call environment for one request.
///
/// String variables follow the CGI convention: `REQUEST_METHOD`,
/// `SCRIPT_NAME`, `PATH_INFO`, `QUERY_STRING`, `SERVER_NAME`,
/// `SERVER_PORT`, `SERVER_PROTOCOL`, `CONTENT_TYPE`/`CONTENT_LENGTH` when
/// the request carried them, and one `HTTP_<NAME>` entry per remaining
/// header. Read-only for the duration of one application call.
pub struct Environ {
    vars: HashMap<String, String>,
    body: Bytes,
    scheme: String,
}

impl Environ {
    /// Looks up a string variable.
    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(|v| v.as_str())
    }

    /// All string variables.
    pub fn vars(&self) -> &HashMap<String, String> {
        &self.vars
    }

    /// Input stream positioned at the start of the request body.
    pub fn input(&self) -> Cursor<&[u8]> {
        Cursor::new(self.body.as_ref())
    }

    /// Error sink for application diagnostics.
    pub fn errors(&self) -> std::io::Stderr {
        std::io::stderr()
    }

    /// URL scheme the request arrived over ("http" or "https").
    pub fn url_scheme(&self) -> &str {
        &self.scheme
    }

    /// Whether the application may be called from concurrent tasks within
    /// one worker. Always true for this server.
    pub fn multithread(&self) -> bool {
        true
    }

    /// Whether the application runs in multiple worker processes at once.
    /// Always true for this server.
    pub fn multiprocess(&self) -> bool {
        true
    }

    /// Whether the hosting process will only invoke the application once.
    /// Always false for this server.
    pub fn run_once(&self) -> bool {
        false
    }
}

/// Builds the call environment from a request and the server identity.
///
/// `content-type` and `content-length` are consumed into dedicated keys;
/// every other header becomes an upper-cased `HTTP_<NAME>` entry with `-`
/// replaced by `_`.
pub fn build_environ(request: &Request, host: &str, port: u16, scheme: &str) -> Environ {
    let mut vars = HashMap::new();

    vars.insert("REQUEST_METHOD".to_string(), request.method.clone());
    vars.insert("SCRIPT_NAME".to_string(), String::new());
    vars.insert("PATH_INFO".to_string(), request.path.clone());
    vars.insert("QUERY_STRING".to_string(), request.query.clone());
    vars.insert("SERVER_NAME".to_string(), host.to_string());
    vars.insert("SERVER_PORT".to_string(), port.to_string());
    vars.insert("SERVER_PROTOCOL".to_string(), request.version.clone());

    for (name, value) in &request.headers {
        match name.as_str() {
            "content-type" => {
                vars.insert("CONTENT_TYPE".to_string(), value.clone());
            }
            "content-length" => {
                vars.insert("CONTENT_LENGTH".to_string(), value.clone());
            }
            _ => {
                let name = format!("HTTP_{}", name.to_uppercase().replace('-', "_"));
                vars.insert(name, value.clone());
            }
        }
    }

    Environ {
        vars,
        body: Bytes::copy_from_slice(&request.body),
        scheme: scheme.to_string(),
    }
}

/// A lazy, finite, non-restartable sequence of response body chunks.
///
/// The server calls [`close`](Self::close) exactly once after driving the
/// sequence, whether production finished normally or failed mid-stream.
pub trait ResponseBody: Send {
    /// Produces the next chunk, or `None` once exhausted.
    fn next_chunk(&mut self) -> Option<anyhow::Result<Bytes>>;

    /// Release hook for resources backing the sequence.
    fn close(&mut self) {}
}

/// A body made of pre-computed chunks.
pub struct BodyChunks {
    chunks: VecDeque<Bytes>,
}

impl BodyChunks {
    pub fn new<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
        }
    }

    pub fn empty() -> Self {
        Self {
            chunks: VecDeque::new(),
        }
    }
}

impl ResponseBody for BodyChunks {
    fn next_chunk(&mut self) -> Option<anyhow::Result<Bytes>> {
        self.chunks.pop_front().map(Ok)
    }
}

/// A request handler, resolved once per worker and shared by all of its
/// connection tasks.
pub trait Application: Send + Sync + 'static {
    /// Handles one request. Must `declare` before writing; the returned
    /// chunks are written in order by the server.
    fn call(
        &self,
        environ: &Environ,
        protocol: &mut ResponseProtocol,
    ) -> anyhow::Result<Box<dyn ResponseBody>>;
}
