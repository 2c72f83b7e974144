//! # Outbox
//!
//! A single writer task per side of the bridge.
//!
//! Frames are queued synchronously and written to the transport in queue order.
//! Code that cannot await (native event listeners, `CallbackHandle::disconnect`)
//! can still send, and two frames queued one after the other never swap places.

use std::sync::Arc;

use tokio::sync::mpsc;
use wirerpc::Frame;

use crate::transport::Transport;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The frame could not be encoded.
    Encode(wirerpc::Error),
    /// The writer task has stopped; the transport is gone.
    Closed,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encode(e) => write!(f, "Encode error: {}", e),
            Self::Closed => write!(f, "Outbox closed"),
        }
    }
}

impl std::error::Error for Error {}

impl From<wirerpc::Error> for Error {
    fn from(e: wirerpc::Error) -> Self {
        Self::Encode(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Cloneable sending half of a writer task.
#[derive(Clone, Debug)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl Outbox {
    /// Spawns the writer task for `transport`. Must be called inside a tokio runtime.
    ///
    /// `side` names the owner in log output.
    pub fn spawn(side: &'static str, transport: Arc<dyn Transport>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();

        tokio::spawn(async move {
            while let Some(bytes) = rx.recv().await {
                if let Err(e) = transport.send(&bytes).await {
                    tracing::warn!(side, error = %e, "transport rejected frame, stopping writer");
                    break;
                }
            }
            tracing::debug!(side, "writer stopped");
        });

        Self { tx }
    }

    /// Queues a frame for sending.
    pub fn push(&self, frame: &Frame) -> Result<()> {
        let bytes = frame.to_bytes()?;
        self.tx.send(bytes).map_err(|_| Error::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::transport::DuplexChannelTransport;

    #[tokio::test]
    async fn test_frames_arrive_in_queue_order() {
        let (a, b) = DuplexChannelTransport::pair();
        let outbox = Outbox::spawn("test", Arc::new(a));

        outbox.push(&Frame::Disconnect { id: 1 }).unwrap();
        outbox.push(&Frame::Disconnect { id: 2 }).unwrap();

        for expected in [1, 2] {
            let bytes = b.recv().await.unwrap().unwrap();
            assert_eq!(Frame::from_bytes(&bytes).unwrap(), Frame::Disconnect { id: expected });
        }
    }

    #[tokio::test]
    async fn test_push_fails_once_writer_stops() {
        let (a, b) = DuplexChannelTransport::pair();
        drop(b);
        let outbox = Outbox::spawn("test", Arc::new(a));

        // The first push makes the writer hit the dead transport.
        outbox.push(&Frame::Disconnect { id: 1 }).unwrap();
        while !outbox.is_closed() {
            tokio::task::yield_now().await;
        }
        assert_eq!(outbox.push(&Frame::Disconnect { id: 2 }), Err(Error::Closed));
    }
}
