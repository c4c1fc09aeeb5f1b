use std::collections::HashMap;

use thiserror::Error;
use tokio::io::AsyncRead;

use crate::http::reader::ReadBuffer;
use crate::http::request::Request;

/// Errors raised while parsing a request from the wire.
///
/// Any of these closes the connection without a response; malformed input
/// never reaches the application.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("empty request line")]
    EmptyRequestLine,

    #[error("malformed request line: {0:?}")]
    InvalidRequestLine(String),

    #[error("malformed header line: {0:?}")]
    InvalidHeader(String),

    #[error("invalid content-length: {0:?}")]
    InvalidContentLength(String),

    #[error("connection closed before declared body length")]
    UnexpectedEof,

    #[error("invalid chunk size line: {0:?}")]
    InvalidChunkSize(String),

    #[error("unsupported transfer-encoding: {0:?}")]
    UnsupportedTransferEncoding(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reads the request line and splits it into (method, path, query, version).
///
/// The request-target is split on the first `?`; the query is empty when
/// no `?` is present.
pub async fn read_request_line<R: AsyncRead + Unpin>(
    reader: &mut ReadBuffer<R>,
) -> Result<(String, String, String, String), ParseError> {
    let line = reader.read_line().await?;
    if line.is_empty() {
        return Err(ParseError::EmptyRequestLine);
    }

    let line = String::from_utf8_lossy(&line).into_owned();
    let mut parts = line.split_whitespace();
    let (method, target, version) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(m), Some(t), Some(v), None) => (m, t, v),
        _ => return Err(ParseError::InvalidRequestLine(line.clone())),
    };

    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, query),
        None => (target, ""),
    };

    Ok((
        method.to_string(),
        path.to_string(),
        query.to_string(),
        version.to_string(),
    ))
}

/// Reads header lines until the blank separator line.
///
/// Names are lower-cased, values stripped of leading whitespace. A
/// duplicated name overwrites the earlier value.
pub async fn read_headers<R: AsyncRead + Unpin>(
    reader: &mut ReadBuffer<R>,
) -> Result<HashMap<String, String>, ParseError> {
    let mut headers = HashMap::new();

    loop {
        let line = reader.read_line().await?;
        if line.is_empty() {
            break;
        }

        let line = String::from_utf8_lossy(&line).into_owned();
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| ParseError::InvalidHeader(line.clone()))?;

        headers.insert(name.to_lowercase(), value.trim_start().to_string());
    }

    Ok(headers)
}

/// Reads the request body according to its framing headers.
///
/// `content-length` wins a fixed-size read; `transfer-encoding: chunked`
/// is decoded chunk by chunk; with neither header the body is empty.
pub async fn read_body<R: AsyncRead + Unpin>(
    reader: &mut ReadBuffer<R>,
    headers: &HashMap<String, String>,
) -> Result<Vec<u8>, ParseError> {
    if let Some(value) = headers.get("content-length") {
        let length: usize = value
            .trim()
            .parse()
            .map_err(|_| ParseError::InvalidContentLength(value.clone()))?;
        return read_sized_body(reader, length).await;
    }

    if let Some(value) = headers.get("transfer-encoding") {
        if !value.trim().eq_ignore_ascii_case("chunked") {
            return Err(ParseError::UnsupportedTransferEncoding(value.clone()));
        }
        return read_chunked_body(reader).await;
    }

    Ok(Vec::new())
}

async fn read_sized_body<R: AsyncRead + Unpin>(
    reader: &mut ReadBuffer<R>,
    length: usize,
) -> Result<Vec<u8>, ParseError> {
    if length == 0 {
        return Ok(Vec::new());
    }
    let body = reader.read(length).await?;
    if body.len() < length {
        return Err(ParseError::UnexpectedEof);
    }
    Ok(body.to_vec())
}

async fn read_chunked_body<R: AsyncRead + Unpin>(
    reader: &mut ReadBuffer<R>,
) -> Result<Vec<u8>, ParseError> {
    let mut body = Vec::new();

    loop {
        let size_line = reader.read_line().await?;
        let size_str = String::from_utf8_lossy(&size_line).trim().to_string();
        let size = usize::from_str_radix(&size_str, 16)
            .map_err(|_| ParseError::InvalidChunkSize(size_str.clone()))?;

        if size == 0 {
            break;
        }

        let chunk = reader.read(size).await?;
        if chunk.len() < size {
            return Err(ParseError::UnexpectedEof);
        }
        body.extend_from_slice(&chunk);

        // Consume the terminator that follows every chunk payload.
        reader.read_line().await?;
    }

    // Trailer lines are discarded up to the final blank line.
    loop {
        let trailer = reader.read_line().await?;
        if trailer.is_empty() {
            break;
        }
    }

    Ok(body)
}

/// Parses one full request: request line, headers, then body.
pub async fn parse_request<R: AsyncRead + Unpin>(
    reader: &mut ReadBuffer<R>,
) -> Result<Request, ParseError> {
    let (method, path, query, version) = read_request_line(reader).await?;
    tracing::debug!("Received request {} {} {}", method, path, version);

    let headers = read_headers(reader).await?;
    let body = read_body(reader, &headers).await?;

    Ok(Request {
        method,
        path,
        query,
        version,
        headers,
        body,
    })
}
