//! Async byte transport and frame-level I/O.
//!
//! [`ByteTransport`] is the seam between the client and the network: the real
//! implementation wraps a TCP stream, tests substitute a scripted in-memory
//! one. [`FrameConn`] layers envelope framing on top and tracks framing
//! health, refusing further use of a connection whose byte position can no
//! longer be trusted.

use std::net::ToSocketAddrs;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use dubhe_core::error::{DubheError, ProtocolError, Result};
use dubhe_core::protocol::{Envelope, EnvelopeHeader, HEADER_LEN};

/// Cap on a declared payload length when the config does not override it.
pub const DEFAULT_MAX_PAYLOAD: usize = 8 * 1024 * 1024;

/// Byte-stream endpoint the client reads frames from and writes frames to.
#[async_trait]
pub trait ByteTransport: Send {
    /// Write the whole buffer.
    async fn write_all(&mut self, buf: &[u8]) -> Result<()>;

    /// Read exactly `n` bytes. A peer that closes mid-read is an error, not
    /// a short read.
    async fn read_exact(&mut self, n: usize) -> Result<Bytes>;
}

/// TCP-backed transport with Nagle disabled.
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// Resolve `addr` and connect, trying each resolved address in turn
    /// under the given per-attempt timeout.
    pub async fn connect(addr: &str, timeout: Duration) -> Result<TcpTransport> {
        let resolved = addr
            .to_socket_addrs()
            .map_err(|e| DubheError::Connection(format!("cannot resolve '{addr}': {e}")))?;

        let mut last_err = None;
        for socket_addr in resolved {
            match tokio::time::timeout(timeout, TcpStream::connect(socket_addr)).await {
                Ok(Ok(stream)) => {
                    stream.set_nodelay(true).map_err(DubheError::Io)?;
                    tracing::debug!(peer = %socket_addr, "connected");
                    return Ok(TcpTransport { stream });
                }
                Ok(Err(e)) => {
                    last_err = Some(DubheError::Connection(format!(
                        "connect to {socket_addr} failed: {e}"
                    )));
                }
                Err(_) => {
                    let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                    last_err = Some(DubheError::Timeout(millis));
                }
            }
        }
        Err(last_err
            .unwrap_or_else(|| DubheError::Connection(format!("'{addr}' resolved to no addresses"))))
    }
}

/// Classify stream errors: losses of the peer become `Connection`, everything
/// else stays `Io`.
fn map_io_error(err: std::io::Error, context: &str) -> DubheError {
    match err.kind() {
        std::io::ErrorKind::UnexpectedEof
        | std::io::ErrorKind::ConnectionReset
        | std::io::ErrorKind::ConnectionAborted
        | std::io::ErrorKind::BrokenPipe
        | std::io::ErrorKind::NotConnected => {
            DubheError::Connection(format!("{context}: connection lost ({err})"))
        }
        _ => DubheError::Io(err),
    }
}

#[async_trait]
impl ByteTransport for TcpTransport {
    async fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.stream
            .write_all(buf)
            .await
            .map_err(|e| map_io_error(e, "writing frame"))?;
        self.stream
            .flush()
            .await
            .map_err(|e| map_io_error(e, "flushing frame"))
    }

    async fn read_exact(&mut self, n: usize) -> Result<Bytes> {
        let mut buf = vec![0u8; n];
        self.stream
            .read_exact(&mut buf)
            .await
            .map_err(|e| map_io_error(e, "reading frame"))?;
        Ok(Bytes::from(buf))
    }
}

/// Envelope framing over a [`ByteTransport`].
///
/// Once a receive fails in a way that loses the frame boundary (bad magic,
/// a transport error mid-frame, an oversized declared payload that was never
/// consumed, a wait abandoned with the reply still in flight) the connection
/// is poisoned and every later call short-circuits.
pub struct FrameConn<T> {
    transport: T,
    max_payload: usize,
    poisoned: bool,
}

impl<T: ByteTransport> FrameConn<T> {
    pub fn new(transport: T) -> FrameConn<T> {
        FrameConn::with_max_payload(transport, DEFAULT_MAX_PAYLOAD)
    }

    pub fn with_max_payload(transport: T, max_payload: usize) -> FrameConn<T> {
        FrameConn {
            transport,
            max_payload,
            poisoned: false,
        }
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Mark the stream unusable. For failures the connection itself never
    /// sees, like a caller giving up on a receive that is still pending.
    pub fn poison(&mut self) {
        self.poisoned = true;
    }

    /// Send one already-encoded frame.
    pub async fn send_frame(&mut self, frame: &[u8]) -> Result<()> {
        self.check_usable()?;
        self.transport.write_all(frame).await
    }

    /// Receive one frame: exactly [`HEADER_LEN`] header bytes, then exactly
    /// the declared payload. The status byte is checked here, so a non-OK
    /// response surfaces as [`RemoteError`] before anyone looks at the
    /// payload.
    ///
    /// [`RemoteError`]: dubhe_core::error::RemoteError
    pub async fn recv_frame(&mut self) -> Result<Envelope> {
        self.check_usable()?;
        match self.recv_frame_inner().await {
            Ok(envelope) => Ok(envelope),
            Err(e) => {
                if e.framing_lost()
                    || matches!(
                        e,
                        DubheError::Protocol(ProtocolError::PayloadTooLarge { .. })
                    )
                {
                    self.poisoned = true;
                }
                Err(e)
            }
        }
    }

    async fn recv_frame_inner(&mut self) -> Result<Envelope> {
        let header_bytes = self.transport.read_exact(HEADER_LEN).await?;
        let header = EnvelopeHeader::parse(&header_bytes)?;

        // Checked before the payload buffer exists, so a hostile length
        // never reaches the allocator.
        let declared = header.payload_len();
        if declared > self.max_payload {
            return Err(ProtocolError::PayloadTooLarge {
                size: declared,
                max: self.max_payload,
            }
            .into());
        }

        let payload = self.transport.read_exact(declared).await?;
        let envelope = Envelope::from_parts(header, payload)?;
        envelope.header.check_status()?;
        Ok(envelope)
    }

    /// Receive the next non-event frame, silently draining heartbeats.
    pub async fn recv_data_frame(&mut self) -> Result<Envelope> {
        loop {
            let envelope = self.recv_frame().await?;
            if envelope.is_event() {
                tracing::debug!(request_id = envelope.request_id(), "skipping event frame");
                continue;
            }
            return Ok(envelope);
        }
    }

    fn check_usable(&self) -> Result<()> {
        if self.poisoned {
            return Err(DubheError::Connection(
                "frame boundary lost; connection must be reopened".to_owned(),
            ));
        }
        Ok(())
    }
}
