//! # Guest peer with async pump
//!
//! Sends requests through the outbox and correlates replies by sequence number.
//! A background pump reads everything the host pushes: replies go to the waiting
//! caller, `Fired` frames to the callback registry, `Console` frames to the console.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use dashmap::DashMap;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use wirepack::Value;
use wirerpc::CallFrame;
use wirerpc::Fault;
use wirerpc::Frame;
use wirerpc::decode_seq;

use crate::guest::console::Console;
use crate::guest::registry::CallbackRegistry;
use crate::outbox;
use crate::outbox::Outbox;
use crate::transport;
use crate::transport::Transport;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Transport(transport::Error),
    Wire(wirerpc::Error),
    Outbox(outbox::Error),
    /// The host rejected the request.
    Remote(Fault),
    ChannelClosed,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "Transport error: {}", e),
            Self::Wire(e) => write!(f, "Wire error: {}", e),
            Self::Outbox(e) => write!(f, "{}", e),
            // Shown to guest code as-is.
            Self::Remote(fault) => write!(f, "{}", fault),
            Self::ChannelClosed => write!(f, "Response channel closed"),
        }
    }
}

impl std::error::Error for Error {}

impl From<transport::Error> for Error {
    fn from(e: transport::Error) -> Self {
        Self::Transport(e)
    }
}

impl From<wirerpc::Error> for Error {
    fn from(e: wirerpc::Error) -> Self {
        Self::Wire(e)
    }
}

impl From<outbox::Error> for Error {
    fn from(e: outbox::Error) -> Self {
        Self::Outbox(e)
    }
}

impl Error {
    /// The host fault, when the host answered with one.
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            Self::Remote(fault) => Some(fault),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Strips framing that an intermediate ipc layer wraps around remote error text:
/// `Error invoking remote method '<op>': Error: <message>`.
pub fn strip_transport_prefix(message: &str) -> &str {
    const HEAD: &str = "Error invoking remote method '";
    const TAIL: &str = "': Error: ";

    message
        .strip_prefix(HEAD)
        .and_then(|rest| rest.find(TAIL).map(|at| &rest[at + TAIL.len()..]))
        .unwrap_or(message)
}

type Pending = DashMap<u64, oneshot::Sender<Result<Value>>>;

/// A reply that has not arrived yet.
pub struct PendingReply {
    rx: oneshot::Receiver<Result<Value>>,
}

impl PendingReply {
    /// Waits for the reply. There is no timeout: a request runs to completion on the host.
    pub async fn wait(self) -> Result<Value> {
        self.rx.await.unwrap_or(Err(Error::ChannelClosed))
    }
}

/// Closes the peer when the pump stops, whether it returns, panics or is aborted.
struct PumpExit {
    pending: Arc<Pending>,
    closed: Arc<AtomicBool>,
    error: Error,
}

impl Drop for PumpExit {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        Peer::notify_all_pending(&self.pending, self.error.clone());
    }
}

pub struct Peer {
    outbox: Outbox,
    pending: Arc<Pending>,
    seq_gen: AtomicU64,
    closed: Arc<AtomicBool>,
    pump: JoinHandle<()>,
}

impl Peer {
    /// Spawns the outbox writer and the pump for `transport`. Must be called inside a tokio runtime.
    pub fn new(
        transport: Arc<dyn Transport>,
        registry: Arc<CallbackRegistry>,
        console: Arc<dyn Console>,
    ) -> Self {
        let outbox = Outbox::spawn("guest", transport.clone());
        let pending: Arc<Pending> = Arc::new(DashMap::new());
        let closed = Arc::new(AtomicBool::new(false));

        let mut exit = PumpExit {
            pending: pending.clone(),
            closed: closed.clone(),
            error: Error::Transport(transport::Error::ConnectionLost("Pump stopped".into())),
        };

        let pump = tokio::spawn(async move {
            exit.error = loop {
                match transport.recv().await {
                    Ok(Some(msg)) => Self::handle_message(&msg, &exit.pending, &registry, console.as_ref()),
                    Ok(None) => {
                        break Error::Transport(transport::Error::ConnectionLost("Stream closed".into()));
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "transport error in guest pump");
                        break Error::Transport(e);
                    }
                }
            };
        });

        Self {
            outbox,
            pending,
            seq_gen: AtomicU64::new(1),
            closed,
            pump,
        }
    }

    fn notify_all_pending(pending: &Pending, error: Error) {
        let keys: Vec<u64> = pending.iter().map(|e| *e.key()).collect();
        for key in keys {
            if let Some((_, tx)) = pending.remove(&key) {
                let _ = tx.send(Err(error.clone()));
            }
        }
    }

    fn handle_message(msg: &[u8], pending: &Pending, registry: &CallbackRegistry, console: &dyn Console) {
        let frame = match Frame::from_bytes(msg) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "malformed frame from host");
                // Still fail the caller if we can tell who it was.
                if let Some((_, tx)) = decode_seq(msg).ok().and_then(|seq| pending.remove(&seq)) {
                    let _ = tx.send(Err(Error::Wire(e)));
                }
                return;
            }
        };

        match frame {
            Frame::Reply(reply) => {
                let Some((_, tx)) = pending.remove(&reply.seq) else {
                    tracing::debug!(seq = reply.seq, "reply for unknown request");
                    return;
                };
                let outcome = reply.outcome.map_err(|fault| {
                    let message = strip_transport_prefix(&fault.message).to_string();
                    Error::Remote(Fault { message, ..fault })
                });
                let _ = tx.send(outcome);
            }
            Frame::Fired(fired) => {
                registry.dispatch(fired.id, &fired.args);
            }
            Frame::Console(line) => console.log(line.level, &line.message),
            Frame::Call(_) | Frame::Register(_) | Frame::Disconnect { .. } | Frame::Reflect(_) => {
                tracing::warn!("host sent a guest-only frame, ignoring");
            }
        }
    }

    /// Queues a request built by `build` around a fresh sequence number.
    ///
    /// The frame is queued before this returns, so two requests issued one after the
    /// other reach the host in that order even if neither is awaited yet.
    pub fn request(&self, build: impl FnOnce(u64) -> Frame) -> PendingReply {
        let seq = self.seq_gen.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.insert(seq, tx);

        let failure = if self.closed.load(Ordering::SeqCst) {
            Some(Error::Transport(transport::Error::ConnectionLost("Stream closed".into())))
        } else {
            self.outbox.push(&build(seq)).err().map(Error::from)
        };

        if let Some(error) = failure {
            if let Some((_, tx)) = self.pending.remove(&seq) {
                let _ = tx.send(Err(error));
            }
        }

        PendingReply { rx }
    }

    /// Calls `interface.method(args)` on the host and waits for the result.
    pub async fn call(&self, interface: &str, method: &str, args: Vec<Value>) -> Result<Value> {
        self.request(|seq| {
            Frame::Call(CallFrame {
                seq,
                interface: interface.to_string(),
                method: method.to_string(),
                args,
            })
        })
        .wait()
        .await
    }

    /// Queues a frame that expects no reply.
    pub fn send(&self, frame: &Frame) -> Result<()> {
        Ok(self.outbox.push(frame)?)
    }

    /// Whether the host side has gone away.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for Peer {
    // The pump holds the transport open; stopping it lets the host see the close.
    fn drop(&mut self) {
        self.pump.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use wirerpc::ConsoleFrame;
    use wirerpc::FaultKind;
    use wirerpc::FiredFrame;
    use wirerpc::LogLevel;
    use wirerpc::ReplyFrame;

    use crate::guest::console::MemoryConsole;
    use crate::transport::DuplexChannelTransport;

    fn peer() -> (Peer, DuplexChannelTransport, Arc<CallbackRegistry>, MemoryConsole) {
        let (guest_side, host_side) = DuplexChannelTransport::pair();
        let registry = Arc::new(CallbackRegistry::new());
        let console = MemoryConsole::new();
        let peer = Peer::new(Arc::new(guest_side), registry.clone(), Arc::new(console.clone()));
        (peer, host_side, registry, console)
    }

    async fn answer(host: &DuplexChannelTransport, outcome: std::result::Result<Value, Fault>) {
        let bytes = host.recv().await.unwrap().unwrap();
        let seq = Frame::from_bytes(&bytes).unwrap().seq().unwrap();
        let reply = Frame::Reply(ReplyFrame { seq, outcome });
        host.send(&reply.to_bytes().unwrap()).await.unwrap();
    }

    #[test]
    fn test_strip_transport_prefix() {
        assert_eq!(
            strip_transport_prefix("Error invoking remote method 'steamworksCall': Error: boom"),
            "boom"
        );
        assert_eq!(strip_transport_prefix("plain message"), "plain message");
        assert_eq!(
            strip_transport_prefix("Error invoking remote method 'x' without tail"),
            "Error invoking remote method 'x' without tail"
        );
    }

    #[tokio::test]
    async fn test_call_resolves_with_reply() {
        let (peer, host, _, _) = peer();
        let (result, ()) = tokio::join!(
            peer.call("Utils", "getAppId", vec![]),
            answer(&host, Ok(Value::Int(480)))
        );
        assert_eq!(result, Ok(Value::Int(480)));
    }

    #[tokio::test]
    async fn test_fault_message_is_clean() {
        let (peer, host, _, _) = peer();
        let fault = Fault::new(
            FaultKind::Invocation,
            "Error invoking remote method 'steamworksCall': Error: Achievement 'X' does not exist",
        );
        let (result, ()) = tokio::join!(peer.call("Achievement", "activate", vec!["X".into()]), answer(&host, Err(fault)));

        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "Achievement 'X' does not exist");
        assert_eq!(err.fault().map(|f| f.kind), Some(FaultKind::Invocation));
    }

    #[tokio::test]
    async fn test_closed_transport_fails_pending() {
        let (peer, host, _, _) = peer();
        let pending = peer.request(|seq| Frame::Call(CallFrame {
            seq,
            interface: "Utils".into(),
            method: "getAppId".into(),
            args: vec![],
        }));
        drop(host);

        assert!(matches!(pending.wait().await, Err(Error::Transport(_))));
        assert!(peer.is_closed());

        // Requests issued afterwards fail immediately instead of hanging.
        assert!(peer.call("Utils", "getAppId", vec![]).await.is_err());
    }

    struct PanickingConsole;

    impl Console for PanickingConsole {
        fn log(&self, _level: LogLevel, _message: &str) {
            panic!("console sink failed");
        }
    }

    #[tokio::test]
    async fn test_pump_panic_fails_pending() {
        let (guest_side, host) = DuplexChannelTransport::pair();
        let peer = Peer::new(Arc::new(guest_side), Arc::new(CallbackRegistry::new()), Arc::new(PanickingConsole));
        let pending = peer.request(|seq| Frame::Call(CallFrame {
            seq,
            interface: "Utils".into(),
            method: "getAppId".into(),
            args: vec![],
        }));

        let line = Frame::Console(ConsoleFrame { level: LogLevel::Log, message: "hi".into() });
        host.send(&line.to_bytes().unwrap()).await.unwrap();

        assert!(matches!(pending.wait().await, Err(Error::Transport(_))));
        assert!(peer.is_closed());
        assert!(peer.call("Utils", "getAppId", vec![]).await.is_err());
    }

    #[tokio::test]
    async fn test_panicking_handler_keeps_pump_alive() {
        let (peer, host, registry, _) = peer();
        let bad = registry.insert(Arc::new(|_args: &[Value]| panic!("handler failed")));

        let fired = Frame::Fired(FiredFrame { id: bad, args: vec![] });
        host.send(&fired.to_bytes().unwrap()).await.unwrap();

        let (result, ()) = tokio::join!(
            peer.call("Utils", "getAppId", vec![]),
            answer(&host, Ok(Value::Int(480)))
        );
        assert_eq!(result, Ok(Value::Int(480)));
        assert!(!peer.is_closed());
    }

    #[tokio::test]
    async fn test_pushes_reach_registry_and_console() {
        let (peer, host, registry, console) = peer();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let id = registry.insert(Arc::new(move |args: &[Value]| {
            let _ = tx.send(args.to_vec());
        }));

        let fired = Frame::Fired(FiredFrame { id, args: vec![Value::Int(7)] });
        let line = Frame::Console(ConsoleFrame { level: LogLevel::Log, message: "hi".into() });
        host.send(&line.to_bytes().unwrap()).await.unwrap();
        host.send(&fired.to_bytes().unwrap()).await.unwrap();

        assert_eq!(rx.recv().await, Some(vec![Value::Int(7)]));
        // The console frame was sent first, so it has been handled by now.
        assert_eq!(console.lines(), vec![(LogLevel::Log, "hi".to_string())]);
        assert!(!peer.is_closed());
    }
}
