//! Connection handling
//!
//! Manages individual client connections, parsing RESP commands
//! and sending responses.

use crate::dispatch::Dispatcher;
use crate::protocol::{RespEncoder, RespParser, RespValue};
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

/// Connection handler
pub struct Connection<S> {
    /// Client stream
    stream: S,

    /// Read buffer
    read_buffer: BytesMut,

    /// Write buffer
    write_buffer: BytesMut,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Connection<S> {
    /// Create a new connection handler
    pub fn new(stream: S) -> Self {
        Connection {
            stream,
            read_buffer: BytesMut::with_capacity(4096),
            write_buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Handle the connection
    ///
    /// Reads commands from the client, dispatches them, and sends responses.
    /// Pipelined requests are answered in order, with one flush per read.
    pub async fn handle(&mut self, dispatcher: &Dispatcher) -> anyhow::Result<()> {
        loop {
            // Read data from the socket
            let n = self.stream.read_buf(&mut self.read_buffer).await?;

            // Connection closed
            if n == 0 {
                if self.read_buffer.is_empty() {
                    return Ok(());
                } else {
                    anyhow::bail!("connection reset by peer");
                }
            }

            debug!("Read {} bytes", n);

            // Try to parse commands from the buffer
            self.write_buffer.clear();
            loop {
                match RespParser::parse(&mut self.read_buffer) {
                    Ok(Some(value)) => {
                        let response = dispatcher.dispatch(value);
                        RespEncoder::encode_to(&mut self.write_buffer, &response);
                    }
                    Ok(None) => {
                        // Need more data
                        break;
                    }
                    Err(e) => {
                        // Protocol error: reply, then drop the unparsable input
                        warn!("Protocol error: {}", e);
                        let response = RespValue::error(format!("ERR protocol error: {}", e));
                        RespEncoder::encode_to(&mut self.write_buffer, &response);
                        self.read_buffer.clear();
                        break;
                    }
                }
            }

            if !self.write_buffer.is_empty() {
                self.stream.write_all(&self.write_buffer).await?;
                self.stream.flush().await?;
            }
        }
    }
}
