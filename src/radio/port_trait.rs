//! Trait abstraction for radio bridge I/O to enable testing

use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Air-side I/O of a radio bridge
///
/// The bridge moves whole MSB-first air bursts in both directions; radio
/// register setup and RX/TX switching stay on the bridge.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RadioPort: Send {
    /// Transmit one burst
    async fn transmit(&mut self, air: &[u8]) -> io::Result<()>;

    /// Wait for the next capture, `None` once the port is closed
    async fn receive(&mut self) -> io::Result<Option<Vec<u8>>>;
}

/// [`RadioPort`] over any tokio byte stream (serial device, file, pipe)
pub struct StreamPort<T> {
    stream: T,
    capture_len: usize,
}

impl<T> StreamPort<T> {
    /// Wrap `stream`, reading at most `capture_len` bytes per capture
    pub fn new(stream: T, capture_len: usize) -> Self {
        Self {
            stream,
            capture_len: capture_len.max(1),
        }
    }

    pub fn into_inner(self) -> T {
        self.stream
    }
}

impl<T> std::fmt::Debug for StreamPort<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamPort")
            .field("capture_len", &self.capture_len)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<T> RadioPort for StreamPort<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn transmit(&mut self, air: &[u8]) -> io::Result<()> {
        self.stream.write_all(air).await?;
        self.stream.flush().await
    }

    async fn receive(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut capture = vec![0u8; self.capture_len];
        let n = self.stream.read(&mut capture).await?;
        if n == 0 {
            return Ok(None);
        }
        capture.truncate(n);
        Ok(Some(capture))
    }
}
