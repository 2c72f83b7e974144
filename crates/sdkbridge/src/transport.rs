//! # Transport Abstraction
//!
//! A minimal, async interface for moving bytes between the host and the guest.
//!
//! ## Philosophy
//!
//! - **Byte-Oriented**: The Transport knows nothing about frames or values.
//!   It moves opaque buffers.
//! - **Ordered**: Buffers arrive in the order they were sent. The bridge relies on
//!   this to keep a `Register` ahead of the matching `Disconnect`.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::sync::mpsc;

/// Errors that occur at the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The other side went away.
    ConnectionLost(String),
    /// Generic I/O error or internal transport failure.
    Io(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectionLost(msg) => write!(f, "Connection lost: {}", msg),
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// A bidirectional, ordered byte channel.
///
/// This trait is designed to be object-safe (`Arc<dyn Transport>`).
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Sends one buffer to the other side.
    async fn send(&self, payload: &[u8]) -> Result<()>;

    /// Waits for the next buffer. `Ok(None)` means the other side closed cleanly.
    async fn recv(&self) -> Result<Option<Vec<u8>>>;
}

/// An in-process duplex channel built on tokio mpsc channels.
///
/// Messages sent on one end appear on the other end's `recv`, in order.
pub struct DuplexChannelTransport {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>,
}

impl DuplexChannelTransport {
    /// Creates a pair of transports connected to each other.
    pub fn pair() -> (Self, Self) {
        let (tx_a, rx_a) = mpsc::unbounded_channel();
        let (tx_b, rx_b) = mpsc::unbounded_channel();

        let a = Self { tx: tx_a, rx: Arc::new(Mutex::new(rx_b)) };
        let b = Self { tx: tx_b, rx: Arc::new(Mutex::new(rx_a)) };

        (a, b)
    }
}

#[async_trait::async_trait]
impl Transport for DuplexChannelTransport {
    async fn send(&self, payload: &[u8]) -> Result<()> {
        self.tx
            .send(payload.to_vec())
            .map_err(|_| Error::ConnectionLost("Channel closed".into()))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>> {
        let mut rx = self.rx.lock().await;
        Ok(rx.recv().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pair_preserves_order() {
        let (a, b) = DuplexChannelTransport::pair();
        a.send(b"one").await.unwrap();
        a.send(b"two").await.unwrap();

        assert_eq!(b.recv().await.unwrap().as_deref(), Some(&b"one"[..]));
        assert_eq!(b.recv().await.unwrap().as_deref(), Some(&b"two"[..]));
    }

    #[tokio::test]
    async fn test_dropped_peer_closes_channel() {
        let (a, b) = DuplexChannelTransport::pair();
        drop(b);

        assert!(matches!(a.send(b"lost").await, Err(Error::ConnectionLost(_))));
        assert_eq!(a.recv().await.unwrap(), None);
    }
}
