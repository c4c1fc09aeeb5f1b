use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Writes wire bytes to the client side of a connection.
pub struct ResponseWriter<W> {
    stream: W,
}

impl<W: AsyncWrite + Unpin> ResponseWriter<W> {
    pub fn new(stream: W) -> Self {
        Self { stream }
    }

    /// Writes the whole buffer, flushing afterwards so each response chunk
    /// reaches the client before the next one is produced.
    pub async fn send(&mut self, buf: &[u8]) -> anyhow::Result<()> {
        let mut written = 0;
        while written < buf.len() {
            let n = self.stream.write(&buf[written..]).await?;
            if n == 0 {
                return Err(anyhow::anyhow!("connection closed while writing"));
            }
            written += n;
        }
        self.stream.flush().await?;
        Ok(())
    }

    pub async fn shutdown(&mut self) -> anyhow::Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}
