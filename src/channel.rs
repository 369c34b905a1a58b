//! The framed bidirectional byte pipe to the parent process (spec §4.1).
//!
//! `Channel` is the abstraction the rest of the core depends on: three
//! callbacks (`on_connected`, `on_data`, `on_disconnected`) and two methods
//! (`send`, `shutdown`). The actual OS transport — a Windows named pipe or
//! inherited stdio handles — is out of scope per spec §1; `RawTransport` is
//! the seam where a real platform binding would plug in. This crate ships
//! two `RawTransport` impls: stdio (backed by `tokio::io::{stdin,stdout}`)
//! and an in-process loopback standing in for the named-pipe socket.

use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, warn};

/// Handshake magic exchanged by the named-pipe transport before either side
/// trusts the connection (spec §4.1).
pub const HANDSHAKE_MAGIC: u32 = 0xDEADBEEF;
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("transport closed")]
    Closed,
    #[error("handshake with parent process timed out")]
    HandshakeTimeout,
    #[error("handshake magic mismatch: expected {expected:#x}, got {got:#x}")]
    HandshakeMismatch { expected: u32, got: u32 },
    #[error("io error: {0}")]
    Io(String),
}

/// Raw byte transport a `Channel` rides on. The core never reads/writes
/// bytes directly — this is the only seam OS-specific glue touches.
#[async_trait::async_trait]
pub trait RawTransport: Send {
    async fn read_exact_into(&mut self, buf: &mut [u8]) -> Result<(), ChannelError>;
    async fn write_all(&mut self, buf: &[u8]) -> Result<(), ChannelError>;
}

/// Inherited stdio handles from the parent process (spec §6 CLI surface:
/// absence of `--channel` selects this transport). No handshake.
pub struct StdioTransport {
    stdin: tokio::io::Stdin,
    stdout: tokio::io::Stdout,
}

impl StdioTransport {
    pub fn new() -> Self {
        Self {
            stdin: tokio::io::stdin(),
            stdout: tokio::io::stdout(),
        }
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RawTransport for StdioTransport {
    async fn read_exact_into(&mut self, buf: &mut [u8]) -> Result<(), ChannelError> {
        self.stdin
            .read_exact(buf)
            .await
            .map_err(|e| ChannelError::Io(e.to_string()))?;
        Ok(())
    }

    async fn write_all(&mut self, buf: &[u8]) -> Result<(), ChannelError> {
        self.stdout
            .write_all(buf)
            .await
            .map_err(|e| ChannelError::Io(e.to_string()))?;
        self.stdout
            .flush()
            .await
            .map_err(|e| ChannelError::Io(e.to_string()))
    }
}

/// In-process stand-in for a Windows named pipe, keyed by channel name
/// (spec §6 `--channel=<id>`). A real platform binding would open
/// `\\.\pipe\<id>` and implement the same trait; this loopback lets the
/// master/slave handshake state machine below run in tests without OS
/// named-pipe access.
pub struct LoopbackTransport {
    rx: UnboundedReceiver<Vec<u8>>,
    tx: UnboundedSender<Vec<u8>>,
    pending: Vec<u8>,
}

impl LoopbackTransport {
    pub fn pair() -> (Self, Self) {
        let (tx_a, rx_b) = tokio::sync::mpsc::unbounded_channel();
        let (tx_b, rx_a) = tokio::sync::mpsc::unbounded_channel();
        (
            Self { rx: rx_a, tx: tx_a, pending: Vec::new() },
            Self { rx: rx_b, tx: tx_b, pending: Vec::new() },
        )
    }
}

#[async_trait::async_trait]
impl RawTransport for LoopbackTransport {
    async fn read_exact_into(&mut self, buf: &mut [u8]) -> Result<(), ChannelError> {
        while self.pending.len() < buf.len() {
            match self.rx.recv().await {
                Some(chunk) => self.pending.extend_from_slice(&chunk),
                None => return Err(ChannelError::Closed),
            }
        }
        let rest = self.pending.split_off(buf.len());
        buf.copy_from_slice(&self.pending);
        self.pending = rest;
        Ok(())
    }

    async fn write_all(&mut self, buf: &[u8]) -> Result<(), ChannelError> {
        self.tx.send(buf.to_vec()).map_err(|_| ChannelError::Closed)
    }
}

/// Stand-in for a real Windows named-pipe transport (spec §1: the
/// underlying IPC transport is OS-specific glue and out of scope). Reading
/// or writing always fails, so a parent that actually points `--channel` at
/// this build gets a loud, immediate handshake failure instead of a silent
/// hang; a real platform binding implements `RawTransport` the same way
/// `LoopbackTransport` does for tests.
pub struct NamedPipeTransport {
    channel_name: String,
}

impl NamedPipeTransport {
    pub fn new(channel_name: String) -> Self {
        Self { channel_name }
    }
}

#[async_trait::async_trait]
impl RawTransport for NamedPipeTransport {
    async fn read_exact_into(&mut self, _buf: &mut [u8]) -> Result<(), ChannelError> {
        Err(ChannelError::Io(format!(
            "named-pipe transport '{}' not implemented: OS-specific transport plumbing is out of scope (spec §1)",
            self.channel_name
        )))
    }

    async fn write_all(&mut self, _buf: &[u8]) -> Result<(), ChannelError> {
        Err(ChannelError::Io(format!(
            "named-pipe transport '{}' not implemented: OS-specific transport plumbing is out of scope (spec §1)",
            self.channel_name
        )))
    }
}

/// One complete frame as delivered to `on_data`.
pub type Frame = Vec<u8>;

/// Writes one length-prefixed frame directly to an async writer. Used by
/// callers (e.g. `main.rs`) that need to send outbound events from a task
/// other than the one driving `Channel::run`'s read loop — stdin and
/// stdout are already independent OS handles, so the two directions don't
/// need to share a single `Channel` value.
pub async fn write_framed<W>(writer: &mut W, frame: &[u8]) -> Result<(), ChannelError>
where
    W: tokio::io::AsyncWrite + Unpin,
{
    let len = (frame.len() as u32).to_le_bytes();
    writer
        .write_all(&len)
        .await
        .map_err(|e| ChannelError::Io(e.to_string()))?;
    writer
        .write_all(frame)
        .await
        .map_err(|e| ChannelError::Io(e.to_string()))?;
    writer.flush().await.map_err(|e| ChannelError::Io(e.to_string()))
}

/// Drives one transport: performs the named-pipe handshake if requested,
/// then loops reading 4-byte length-prefixed frames and forwarding them to
/// `on_data`, until disconnection.
pub struct Channel<T: RawTransport> {
    transport: T,
    require_handshake: bool,
}

impl<T: RawTransport> Channel<T> {
    pub fn new(transport: T, require_handshake: bool) -> Self {
        Self { transport, require_handshake }
    }

    /// Performs the master/slave magic exchange with a 10s timeout (spec
    /// §4.1). The subprocess is always the slave side.
    async fn handshake(&mut self) -> Result<(), ChannelError> {
        let fut = async {
            let mut buf = [0u8; 4];
            self.transport.read_exact_into(&mut buf).await?;
            let got = u32::from_le_bytes(buf);
            if got != HANDSHAKE_MAGIC {
                return Err(ChannelError::HandshakeMismatch {
                    expected: HANDSHAKE_MAGIC,
                    got,
                });
            }
            self.transport.write_all(&HANDSHAKE_MAGIC.to_le_bytes()).await
        };
        tokio::time::timeout(HANDSHAKE_TIMEOUT, fut)
            .await
            .map_err(|_| ChannelError::HandshakeTimeout)?
    }

    async fn read_frame(&mut self) -> Result<Frame, ChannelError> {
        let mut len_buf = [0u8; 4];
        self.transport.read_exact_into(&mut len_buf).await?;
        let len = u32::from_le_bytes(len_buf) as usize;
        let mut body = vec![0u8; len];
        self.transport.read_exact_into(&mut body).await?;
        Ok(body)
    }

    pub async fn send(&mut self, frame: &[u8]) -> Result<(), ChannelError> {
        let len = (frame.len() as u32).to_le_bytes();
        self.transport.write_all(&len).await?;
        self.transport.write_all(frame).await
    }

    /// Runs the connect → read-loop → disconnect lifecycle, invoking the
    /// three callbacks at the right points (spec §4.1). `on_data` and
    /// `on_disconnected` run inline; callers that need single-writer
    /// discipline re-post onto their own command worker inside the closure.
    pub async fn run(
        mut self,
        mut on_data: impl FnMut(Frame) + Send,
        on_connected: impl FnOnce() + Send,
        on_disconnected: impl FnOnce() + Send,
    ) {
        if self.require_handshake {
            if let Err(e) = self.handshake().await {
                warn!(error = %e, "channel handshake failed, disconnecting");
                on_disconnected();
                return;
            }
        }
        debug!("channel connected");
        on_connected();

        loop {
            match self.read_frame().await {
                Ok(frame) => on_data(frame),
                Err(ChannelError::Closed) => {
                    debug!("channel closed by peer");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "channel read error");
                    break;
                }
            }
        }
        on_disconnected();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loopback_round_trips_a_frame() {
        let (a, b) = LoopbackTransport::pair();
        let mut chan_a = Channel::new(a, false);
        let mut chan_b = Channel::new(b, false);

        chan_a.send(b"hello").await.unwrap();
        let frame = chan_b.read_frame().await.unwrap();
        assert_eq!(frame, b"hello");
    }

    #[tokio::test]
    async fn handshake_succeeds_when_magic_matches() {
        let (mut a, mut b) = LoopbackTransport::pair();
        a.write_all(&HANDSHAKE_MAGIC.to_le_bytes()).await.unwrap();
        let mut chan_b = Channel::new(b, true);
        chan_b.handshake().await.unwrap();
        let mut ack = [0u8; 4];
        a.read_exact_into(&mut ack).await.unwrap();
        assert_eq!(u32::from_le_bytes(ack), HANDSHAKE_MAGIC);
    }

    #[tokio::test]
    async fn handshake_fails_on_magic_mismatch() {
        let (mut a, b) = LoopbackTransport::pair();
        a.write_all(&0x1234_5678u32.to_le_bytes()).await.unwrap();
        let mut chan_b = Channel::new(b, true);
        let err = chan_b.handshake().await.unwrap_err();
        assert!(matches!(err, ChannelError::HandshakeMismatch { .. }));
    }
}
