//! Connection handler for individual controller connections.
//!
//! Each connection gets its own `ConnectionHandler` that:
//! - Reads one request frame per line
//! - Dispatches the request to its endpoint on the blocking pool
//! - Writes one response frame per request, in request order
//!
//! Transport failures close this connection only.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::task;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use red_protocol::{parse_request, ErrorCode, Method, Response, RpcError};

use crate::config::ServerConfig;
use crate::endpoints::EndpointRegistry;

/// Connection handler for a single controller.
pub struct ConnectionHandler {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
    endpoints: Arc<EndpointRegistry>,
    cancel_token: CancellationToken,
    read_timeout: Duration,
    write_timeout: Duration,
    max_frame_size: usize,
    connection_number: u64,
}

impl ConnectionHandler {
    pub fn new(
        reader: OwnedReadHalf,
        writer: OwnedWriteHalf,
        endpoints: Arc<EndpointRegistry>,
        config: &ServerConfig,
        cancel_token: CancellationToken,
        connection_number: u64,
    ) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer: BufWriter::new(writer),
            endpoints,
            cancel_token,
            read_timeout: config.read_timeout,
            write_timeout: config.write_timeout,
            max_frame_size: config.max_frame_size,
            connection_number,
        }
    }

    /// Serves requests until the peer disconnects, the connection fails or
    /// the server shuts down. A request already being served completes first.
    pub async fn run(mut self) {
        debug!(connection = self.connection_number, "Controller connected");

        if let Err(e) = self.process_frames().await {
            debug!(
                connection = self.connection_number,
                error = %e,
                "Connection closed"
            );
        }

        debug!(connection = self.connection_number, "Controller disconnected");
    }

    async fn process_frames(&mut self) -> Result<(), ConnectionError> {
        let cancel_token = self.cancel_token.clone();
        let read_timeout = self.read_timeout;

        loop {
            let read = tokio::select! {
                _ = cancel_token.cancelled() => return Ok(()),
                result = timeout(read_timeout, self.read_frame()) => result,
            };

            let frame = match read {
                Ok(Ok(frame)) => frame,
                Ok(Err(ConnectionError::Eof)) => return Ok(()),
                Ok(Err(ConnectionError::FrameTooLarge { size, max })) => {
                    let response = Response::error(
                        serde_json::Value::Null,
                        RpcError::new(
                            ErrorCode::InvalidRequest,
                            format!("frame too large: more than {max} bytes"),
                        ),
                    );
                    let _ = self.send_response(&response).await;
                    return Err(ConnectionError::FrameTooLarge { size, max });
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => return Err(ConnectionError::Timeout),
            };

            if frame.trim().is_empty() {
                continue;
            }

            let response = self.dispatch(&frame).await;
            self.send_response(&response).await?;
        }
    }

    /// Turns one request frame into its response frame.
    async fn dispatch(&self, frame: &str) -> Response {
        let request = match parse_request(frame) {
            Ok(request) => request,
            Err(e) => {
                warn!(connection = self.connection_number, error = %e, "Rejected request frame");
                return e.to_response();
            }
        };

        let endpoint =
            Method::from_wire_name(&request.method).and_then(|method| self.endpoints.get(method));
        let Some(endpoint) = endpoint else {
            warn!(method = %request.method, "Unknown method requested");
            return Response::error(request.id, RpcError::method_not_found(&request.method));
        };

        let params = request.params;
        let envelope = match task::spawn_blocking(move || endpoint(&params)).await {
            Ok(envelope) => envelope,
            Err(e) => {
                error!(method = %request.method, error = %e, "Endpoint task failed");
                return Response::error(
                    request.id,
                    RpcError::new(ErrorCode::InternalError, format!("endpoint task failed: {e}")),
                );
            }
        };

        match serde_json::to_value(&envelope) {
            Ok(result) => Response::result(request.id, result),
            Err(e) => {
                error!(method = %request.method, error = %e, "Result cannot be marshalled");
                Response::error(
                    request.id,
                    RpcError::new(ErrorCode::InternalError, format!("cannot marshal result: {e}")),
                )
            }
        }
    }

    /// Reads one newline-terminated frame, bounded by the maximum frame size.
    async fn read_frame(&mut self) -> Result<String, ConnectionError> {
        let mut line = String::new();
        let limit = self.max_frame_size as u64 + 1;

        let bytes_read = (&mut self.reader)
            .take(limit)
            .read_line(&mut line)
            .await
            .map_err(|e| ConnectionError::Io(e.to_string()))?;

        if bytes_read == 0 {
            return Err(ConnectionError::Eof);
        }

        if line.trim_end_matches(['\r', '\n']).len() > self.max_frame_size {
            return Err(ConnectionError::FrameTooLarge {
                size: line.len(),
                max: self.max_frame_size,
            });
        }

        Ok(line)
    }

    async fn send_response(&mut self, response: &Response) -> Result<(), ConnectionError> {
        let json = serde_json::to_string(response)
            .map_err(|e| ConnectionError::Encode(e.to_string()))?;

        let writer = &mut self.writer;
        match timeout(self.write_timeout, async {
            writer.write_all(json.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
            Ok::<(), std::io::Error>(())
        })
        .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ConnectionError::Io(e.to_string())),
            Err(_) => Err(ConnectionError::WriteTimeout),
        }
    }
}

/// Errors that can occur during connection handling.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Cannot encode response: {0}")]
    Encode(String),

    #[error("Connection closed")]
    Eof,

    #[error("Read timeout")]
    Timeout,

    #[error("Write timeout")]
    WriteTimeout,

    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge { size: usize, max: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_size_error() {
        let err = ConnectionError::FrameTooLarge {
            size: 2_000_000,
            max: 1_048_576,
        };
        assert!(err.to_string().contains("2000000"));
        assert!(err.to_string().contains("1048576"));
    }
}
