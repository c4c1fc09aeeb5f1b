use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};

use crate::app::{Application, ResponseBody, build_environ};
use crate::http::parser::parse_request;
use crate::http::reader::ReadBuffer;
use crate::http::response::ResponseProtocol;
use crate::http::writer::ResponseWriter;

/// Drives one accepted connection end-to-end.
///
/// Parse the request, build the call environment, invoke the application
/// exactly once, then push its body chunks to the wire. The connection is
/// closed afterwards in every case; a malformed request closes it without
/// the application ever running.
pub struct Connection<S> {
    reader: ReadBuffer<ReadHalf<S>>,
    writer: ResponseWriter<WriteHalf<S>>,
    app: Arc<dyn Application>,
    host: String,
    port: u16,
    scheme: String,
}

impl<S: AsyncRead + AsyncWrite + Send + Unpin> Connection<S> {
    pub fn new(
        stream: S,
        app: Arc<dyn Application>,
        host: impl Into<String>,
        port: u16,
        scheme: impl Into<String>,
    ) -> Self {
        let (read_half, write_half) = tokio::io::split(stream);
        Self {
            reader: ReadBuffer::new(read_half),
            writer: ResponseWriter::new(write_half),
            app,
            host: host.into(),
            port,
            scheme: scheme.into(),
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        let request = match parse_request(&mut self.reader).await {
            Ok(request) => request,
            Err(e) => {
                // Malformed input never reaches the application; the
                // client sees the connection close with no response.
                tracing::debug!("Dropping connection: {}", e);
                return Ok(());
            }
        };

        let environ = build_environ(&request, &self.host, self.port, &self.scheme);
        let mut protocol = ResponseProtocol::new();

        tracing::debug!("Calling into application");
        match self.app.call(&environ, &mut protocol) {
            Ok(body) => {
                // Bytes the application pushed through write() during the
                // call go out before the body is driven.
                let wire = protocol.take_wire();
                self.writer.send(&wire).await?;
                self.drive_body(&mut protocol, body).await?;
            }
            Err(e) => {
                tracing::error!("Application aborted: {}", e);
                let wire = protocol.take_wire();
                self.writer.send(&wire).await?;
            }
        }

        protocol.close();
        tracing::debug!("Closing connection");
        self.writer.shutdown().await.ok();
        Ok(())
    }

    /// Writes every produced chunk in order. The body's release hook runs
    /// exactly once, whether production finishes or fails mid-stream.
    async fn drive_body(
        &mut self,
        protocol: &mut ResponseProtocol,
        mut body: Box<dyn ResponseBody>,
    ) -> anyhow::Result<()> {
        let mut app_error = None;
        let mut io_error = None;

        loop {
            match body.next_chunk() {
                Some(Ok(chunk)) => {
                    if let Err(e) = protocol.write(&chunk) {
                        app_error = Some(anyhow::Error::from(e));
                        break;
                    }
                    let wire = protocol.take_wire();
                    if let Err(e) = self.writer.send(&wire).await {
                        io_error = Some(e);
                        break;
                    }
                }
                Some(Err(e)) => {
                    app_error = Some(e);
                    break;
                }
                None => {
                    // A declared response with an empty body still gets
                    // its status and headers.
                    if let Err(e) = protocol.flush_headers() {
                        app_error = Some(anyhow::Error::from(e));
                        break;
                    }
                    let wire = protocol.take_wire();
                    if let Err(e) = self.writer.send(&wire).await {
                        io_error = Some(e);
                    }
                    break;
                }
            }
        }

        body.close();

        if let Some(e) = app_error {
            tracing::error!("Application aborted: {}", e);
        }
        match io_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
