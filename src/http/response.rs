use bytes::{Bytes, BytesMut};
use thiserror::Error;

/// HTTP status codes emitted by applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 201 Created
    Created,
    /// 204 No Content
    NoContent,
    /// 400 Bad Request
    BadRequest,
    /// 404 Not Found
    NotFound,
    /// 405 Method Not Allowed
    MethodNotAllowed,
    /// 500 Internal Server Error
    InternalServerError,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use porter::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::Created => 201,
            StatusCode::NoContent => 204,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
            StatusCode::InternalServerError => 500,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use porter::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    /// assert_eq!(StatusCode::NotFound.reason_phrase(), "Not Found");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::NoContent => "No Content",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }
}

/// Violations of the declare/write contract.
///
/// These indicate an application programming defect and surface inside the
/// application's own call, never as a server fault.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("write() before declare()")]
    WriteBeforeDeclare,

    #[error("response already declared")]
    AlreadyDeclared,

    #[error("response closed")]
    Closed,
}

enum State {
    Unstarted,
    HeadersPending {
        status: StatusCode,
        headers: Vec<(String, String)>,
    },
    HeadersSent,
}

const RESPONSE_VERSION: &str = "HTTP/1.1";

/// The declare-then-write response state machine for one exchange.
///
/// An application first declares a status and headers, then writes body
/// bytes. The status/header block is serialized exactly once, lazily, on
/// the first write (or an explicit [`flush_headers`](Self::flush_headers)).
/// Until that flush the declaration can be replaced by a `declare` carrying
/// an error; after it, such a declare propagates the error unchanged,
/// since the headers have already reached the client and the error can no
/// longer be hidden.
///
/// Wire bytes accumulate in an internal buffer; the connection task drains
/// it with [`take_wire`](Self::take_wire) after each write, keeping the
/// application call synchronous while socket I/O stays async.
pub struct ResponseProtocol {
    state: State,
    closed: bool,
    wire: BytesMut,
}

impl ResponseProtocol {
    pub fn new() -> Self {
        Self {
            state: State::Unstarted,
            closed: false,
            wire: BytesMut::new(),
        }
    }

    /// Declares the response status and headers.
    ///
    /// With `error`: if headers were already sent, the error is returned
    /// unchanged; otherwise the pending declaration is unconditionally
    /// replaced. Without `error`: declaring twice is a [`ProtocolError`].
    pub fn declare(
        &mut self,
        status: StatusCode,
        headers: Vec<(String, String)>,
        error: Option<anyhow::Error>,
    ) -> anyhow::Result<()> {
        match error {
            Some(err) => {
                if matches!(self.state, State::HeadersSent) {
                    return Err(err);
                }
            }
            None => {
                if !matches!(self.state, State::Unstarted) {
                    return Err(ProtocolError::AlreadyDeclared.into());
                }
            }
        }

        self.state = State::HeadersPending { status, headers };
        Ok(())
    }

    /// Writes body bytes, flushing the declared status/header block first
    /// if it has not gone out yet. A zero-length write is legal and still
    /// forces the header flush.
    pub fn write(&mut self, data: &[u8]) -> Result<(), ProtocolError> {
        if self.closed {
            return Err(ProtocolError::Closed);
        }
        match self.state {
            State::Unstarted => return Err(ProtocolError::WriteBeforeDeclare),
            State::HeadersPending { .. } => self.send_headers(),
            State::HeadersSent => {}
        }
        self.wire.extend_from_slice(data);
        Ok(())
    }

    /// Forces the header flush without writing body bytes. A no-op when
    /// nothing is pending.
    pub fn flush_headers(&mut self) -> Result<(), ProtocolError> {
        if self.closed {
            return Err(ProtocolError::Closed);
        }
        if matches!(self.state, State::HeadersPending { .. }) {
            self.send_headers();
        }
        Ok(())
    }

    fn send_headers(&mut self) {
        let State::HeadersPending { status, headers } =
            std::mem::replace(&mut self.state, State::HeadersSent)
        else {
            return;
        };

        tracing::debug!("Send headers {} {:?}", status.as_u16(), headers);

        self.wire.extend_from_slice(RESPONSE_VERSION.as_bytes());
        self.wire.extend_from_slice(b" ");
        self.wire
            .extend_from_slice(status.as_u16().to_string().as_bytes());
        self.wire.extend_from_slice(b" ");
        self.wire.extend_from_slice(status.reason_phrase().as_bytes());
        self.wire.extend_from_slice(b"\r\n");

        for (name, value) in &headers {
            self.wire.extend_from_slice(name.as_bytes());
            self.wire.extend_from_slice(b": ");
            self.wire.extend_from_slice(value.as_bytes());
            self.wire.extend_from_slice(b"\r\n");
        }

        self.wire.extend_from_slice(b"\r\n");
    }

    /// Drains the wire bytes produced so far.
    pub fn take_wire(&mut self) -> Bytes {
        self.wire.split().freeze()
    }

    pub fn headers_sent(&self) -> bool {
        matches!(self.state, State::HeadersSent)
    }

    /// Marks the exchange finished. Monotonic; later writes fail.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Default for ResponseProtocol {
    fn default() -> Self {
        Self::new()
    }
}
