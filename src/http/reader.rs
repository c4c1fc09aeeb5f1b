use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Default fetch size for the underlying stream.
const BLOCK_SIZE: usize = 4096;

/// Buffered byte source over a connection.
///
/// Accumulates fixed-size reads into an internal buffer and serves line-
/// and length-bounded requests from it. Once the underlying stream yields
/// zero bytes, `read` and `read_line` return an empty result instead of
/// retrying, so a half-finished request can never busy-loop the parser.
pub struct ReadBuffer<R> {
    reader: R,
    block_size: usize,
    buffer: BytesMut,
}

impl<R: AsyncRead + Unpin> ReadBuffer<R> {
    pub fn new(reader: R) -> Self {
        Self::with_block_size(reader, BLOCK_SIZE)
    }

    pub fn with_block_size(reader: R, block_size: usize) -> Self {
        Self {
            reader,
            block_size,
            buffer: BytesMut::with_capacity(block_size),
        }
    }

    /// Pulls one block from the stream into the buffer. Returns the number
    /// of bytes fetched; zero means end-of-stream.
    async fn fetch(&mut self) -> std::io::Result<usize> {
        let mut block = vec![0u8; self.block_size];
        let n = self.reader.read(&mut block).await?;
        self.buffer.extend_from_slice(&block[..n]);
        Ok(n)
    }

    /// Reads exactly `size` bytes, or an empty result if the stream ends
    /// before that many bytes arrive.
    pub async fn read(&mut self, size: usize) -> std::io::Result<Bytes> {
        while self.buffer.len() < size {
            if self.fetch().await? == 0 {
                return Ok(Bytes::new());
            }
        }
        Ok(self.buffer.split_to(size).freeze())
    }

    /// Reads one line, without its terminator. Lines end at LF; a CR
    /// immediately before the LF is stripped. Returns an empty result if
    /// the stream ends before a terminator arrives.
    pub async fn read_line(&mut self) -> std::io::Result<Bytes> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                let mut line = self.buffer.split_to(pos + 1);
                line.truncate(pos);
                if line.last() == Some(&b'\r') {
                    line.truncate(line.len() - 1);
                }
                return Ok(line.freeze());
            }
            if self.fetch().await? == 0 {
                return Ok(Bytes::new());
            }
        }
    }
}
