//! Connection management for individual clients
//!
//! Each client is served by one task that feeds socket reads into a
//! [`RespParser`], runs every complete request through the executor and
//! writes the replies back. Replies to pipelined requests are buffered and
//! flushed once the parser runs dry.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tracing::debug;

use crate::error::{FerrokvError, Result};
use crate::protocol::{serialize_to_vec, RespFrame, RespParser};
use crate::storage::commands::CommandExecutor;

/// Size of a single socket read
const READ_CHUNK: usize = 16 * 1024;

/// Represents a client connection
pub struct Connection {
    /// Unique connection ID
    pub id: u64,

    /// Client address
    pub addr: SocketAddr,

    stream: TcpStream,

    /// RESP protocol parser
    parser: RespParser,

    executor: CommandExecutor,
}

impl Connection {
    /// Create a new connection
    pub fn new(id: u64, stream: TcpStream, addr: SocketAddr, executor: CommandExecutor) -> Self {
        // Replies are small; send them without waiting to coalesce
        let _ = stream.set_nodelay(true);

        Connection {
            id,
            addr,
            stream,
            parser: RespParser::new(),
            executor,
        }
    }

    /// Serve the client until it disconnects, sends QUIT, breaks the
    /// protocol or `shutdown` fires
    ///
    /// Shutdown is only observed between reads, so a request that has been
    /// received completely is always answered.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let (mut reader, writer) = self.stream.split();
        let mut writer = BufWriter::new(writer);
        let mut buf = vec![0u8; READ_CHUNK];

        loop {
            while let Some(frame) = next_frame(&mut self.parser, &mut writer).await? {
                let reply = match self.executor.handle(frame) {
                    Ok(reply) => reply,
                    Err(err) => {
                        debug!(id = self.id, error = %err, "closing connection");
                        write_frame(&mut writer, &RespFrame::error(err.to_string())).await?;
                        writer.flush().await?;
                        return Ok(());
                    }
                };

                write_frame(&mut writer, &reply.frame).await?;
                if reply.close {
                    writer.flush().await?;
                    return Ok(());
                }
            }
            writer.flush().await?;

            if *shutdown.borrow() {
                return Ok(());
            }

            let read = tokio::select! {
                read = reader.read(&mut buf) => read?,
                _ = shutdown.changed() => {
                    debug!(id = self.id, "shutting down connection");
                    return Ok(());
                }
            };

            if read == 0 {
                debug!(id = self.id, addr = %self.addr, "client disconnected");
                return Ok(());
            }
            self.parser.feed(&buf[..read]);
        }
    }
}

/// Next complete request, answering framing errors before giving up
async fn next_frame<W>(parser: &mut RespParser, writer: &mut W) -> Result<Option<RespFrame>>
where
    W: AsyncWrite + Unpin,
{
    match parser.parse() {
        Ok(frame) => Ok(frame),
        Err(err @ FerrokvError::Protocol(_)) => {
            write_frame(writer, &RespFrame::error(err.to_string())).await?;
            writer.flush().await?;
            Err(err)
        }
        Err(err) => Err(err),
    }
}

async fn write_frame<W>(writer: &mut W, frame: &RespFrame) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let bytes = serialize_to_vec(frame)?;
    writer.write_all(&bytes).await?;
    Ok(())
}
