//! # Mirrored sdk surface
//!
//! The guest-side stand-in for the sdk object graph. Nothing here holds a reference
//! to the real client: a mirror is just the names the host resolves on every request.
//!
//! ```text
//! Surface ──interface("Utils")──▶ InterfaceMirror ──method("getAppId")──▶ Method ──call──▶ Call frame
//!    └────callback()──▶ CallbackMirror ──register(name, handler)──▶ CallbackHandle
//! ```
//!
//! Interface mirrors are built on first access and memoized by name, so two lookups of
//! the same interface return the same `Arc`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use dashmap::DashMap;
use tokio::sync::OnceCell;
use tokio::sync::watch;
use wirepack::Value;
use wirerpc::Fault;
use wirerpc::FaultKind;
use wirerpc::Frame;
use wirerpc::RegisterFrame;

use crate::guest::peer;
use crate::guest::peer::Peer;
use crate::guest::reflector::Reflector;
use crate::guest::registry::CallbackRegistry;
use crate::ledger;
use crate::ledger::InterfaceSchema;

/// Root of the mirrored surface.
pub struct Surface {
    peer: Arc<Peer>,
    registry: Arc<CallbackRegistry>,
    reflector: Option<Arc<Reflector>>,
    interfaces: DashMap<&'static str, Arc<InterfaceMirror>>,
    callback: OnceLock<Arc<CallbackMirror>>,
}

impl Surface {
    pub(crate) fn new(
        peer: Arc<Peer>,
        registry: Arc<CallbackRegistry>,
        reflector: Option<Arc<Reflector>>,
    ) -> Self {
        Self {
            peer,
            registry,
            reflector,
            interfaces: DashMap::new(),
            callback: OnceLock::new(),
        }
    }

    /// The mirror for interface `name`, or `None` if the ledger does not expose it.
    pub fn interface(&self, name: &str) -> Option<Arc<InterfaceMirror>> {
        let schema = ledger::interface(name)?;
        let mirror = self
            .interfaces
            .entry(schema.name)
            .or_insert_with(|| {
                Arc::new(InterfaceMirror {
                    schema,
                    peer: self.peer.clone(),
                })
            })
            .value()
            .clone();
        Some(mirror)
    }

    /// The event subscription interface.
    pub fn callback(&self) -> Arc<CallbackMirror> {
        self.callback
            .get_or_init(|| {
                Arc::new(CallbackMirror {
                    peer: self.peer.clone(),
                    registry: self.registry.clone(),
                    reflector: self.reflector.clone(),
                    types: OnceCell::new(),
                })
            })
            .clone()
    }

    /// Names of every callable interface.
    pub fn interface_names(&self) -> impl Iterator<Item = &'static str> {
        ledger::INTERFACES.iter().map(|schema| schema.name)
    }
}

/// Mirror of one sdk interface.
pub struct InterfaceMirror {
    schema: &'static InterfaceSchema,
    peer: Arc<Peer>,
}

impl InterfaceMirror {
    pub fn name(&self) -> &'static str {
        self.schema.name
    }

    pub fn methods(&self) -> &'static [&'static str] {
        self.schema.methods
    }

    /// A call wrapper bound to `name`, if the interface has such a method.
    pub fn method(&self, name: &str) -> Option<Method> {
        let method = self.schema.methods.iter().copied().find(|m| *m == name)?;
        Some(Method {
            interface: self.schema.name,
            name: method,
            peer: self.peer.clone(),
        })
    }

    /// Calls `method` on the host. Unknown methods fail without a round trip.
    pub async fn call(&self, method: &str, args: Vec<Value>) -> peer::Result<Value> {
        match self.method(method) {
            Some(bound) => bound.call(args).await,
            None => Err(peer::Error::Remote(Fault::new(
                FaultKind::NoSuchMember,
                format!("{}.{} is not a function", self.schema.name, method),
            ))),
        }
    }
}

/// A method bound to its interface.
#[derive(Clone)]
pub struct Method {
    interface: &'static str,
    name: &'static str,
    peer: Arc<Peer>,
}

impl Method {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub async fn call(&self, args: Vec<Value>) -> peer::Result<Value> {
        self.peer.call(self.interface, self.name, args).await
    }
}

pub type Handle = CallbackHandle;

/// The event subscription interface.
pub struct CallbackMirror {
    peer: Arc<Peer>,
    registry: Arc<CallbackRegistry>,
    reflector: Option<Arc<Reflector>>,
    types: OnceCell<BTreeMap<String, String>>,
}

impl CallbackMirror {
    /// Symbolic callback type names, each mapped to itself.
    ///
    /// Fetched through reflection once and memoized. Without debug mode the table is
    /// opaque and this is empty; `register` still accepts any name the host knows.
    pub async fn callback_types(&self) -> BTreeMap<String, String> {
        let Some(reflector) = &self.reflector else {
            return BTreeMap::new();
        };
        let path = [ledger::CALLBACK_INTERFACE, ledger::CALLBACK_TABLE];
        let fetch = || async move {
            let names = reflector.members(&path).await?;
            Ok::<_, peer::Error>(names.into_iter().map(|name| (name.clone(), name)).collect())
        };
        match self.types.get_or_try_init(fetch).await {
            Ok(types) => types.clone(),
            Err(e) => {
                tracing::warn!(error = %e, "could not list callback types");
                BTreeMap::new()
            }
        }
    }

    /// Subscribes `handler` to the native event `callback_type`.
    ///
    /// Returns immediately, before the host has answered. The handle can be
    /// disconnected right away; `CallbackHandle::confirmed` reports the host's answer.
    /// A rejected registration removes the handler again. Must be called inside a
    /// tokio runtime.
    pub fn register<F>(&self, callback_type: &str, handler: F) -> CallbackHandle
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        let id = self.registry.insert(Arc::new(handler));
        let reply = self.peer.request(|seq| {
            Frame::Register(RegisterFrame {
                seq,
                callback_type: callback_type.to_string(),
                id,
            })
        });

        let (ack_tx, ack_rx) = watch::channel(None);
        let registry = self.registry.clone();
        let callback_type = callback_type.to_string();
        tokio::spawn(async move {
            let outcome = reply.wait().await.map(|_| ());
            if let Err(e) = &outcome {
                tracing::warn!(id, %callback_type, error = %e, "callback registration failed");
                registry.remove(id);
            }
            let _ = ack_tx.send(Some(outcome));
        });

        CallbackHandle {
            id,
            state: Arc::new(HandleState {
                disconnected: AtomicBool::new(false),
                registry: self.registry.clone(),
                peer: self.peer.clone(),
            }),
            ack: ack_rx,
        }
    }
}

struct HandleState {
    disconnected: AtomicBool,
    registry: Arc<CallbackRegistry>,
    peer: Arc<Peer>,
}

/// A live callback subscription.
///
/// Dropping the handle does not disconnect it.
#[derive(Clone)]
pub struct CallbackHandle {
    id: u64,
    state: Arc<HandleState>,
    ack: watch::Receiver<Option<peer::Result<()>>>,
}

impl CallbackHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stops delivery and tears the subscription down. Safe to call more than once.
    ///
    /// The local handler is removed before the teardown frame is queued, so events
    /// already in flight are dropped on arrival.
    pub fn disconnect(&self) {
        if self.state.disconnected.swap(true, Ordering::SeqCst) {
            return;
        }
        self.state.registry.remove(self.id);
        if let Err(e) = self.state.peer.send(&Frame::Disconnect { id: self.id }) {
            tracing::debug!(id = self.id, error = %e, "disconnect not delivered");
        }
    }

    pub fn is_disconnected(&self) -> bool {
        self.state.disconnected.load(Ordering::SeqCst)
    }

    /// Waits for the host's answer to the registration.
    pub async fn confirmed(&self) -> peer::Result<()> {
        let mut ack = self.ack.clone();
        let outcome = ack
            .wait_for(Option::is_some)
            .await
            .map_err(|_| peer::Error::ChannelClosed)?;
        outcome.clone().unwrap_or(Err(peer::Error::ChannelClosed))
    }
}

impl std::fmt::Debug for CallbackHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackHandle")
            .field("id", &self.id)
            .field("disconnected", &self.is_disconnected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicUsize;

    use crate::guest::console::MemoryConsole;
    use crate::host::Availability;
    use crate::host::HostBridge;
    use crate::ledger::CallbackType;
    use crate::sdk::MemorySdk;
    use crate::transport::DuplexChannelTransport;

    struct Harness {
        sdk: Arc<MemorySdk>,
        host: Arc<HostBridge>,
        registry: Arc<CallbackRegistry>,
        surface: Surface,
    }

    fn harness(debug: bool) -> Harness {
        let sdk = Arc::new(MemorySdk::new(480, "Gordon"));
        let (host_side, guest_side) = DuplexChannelTransport::pair();
        let host = Arc::new(HostBridge::new(&Availability::from_client(sdk.clone()), debug, Arc::new(host_side)));
        let serving = host.clone();
        tokio::spawn(async move { serving.serve().await });

        let registry = Arc::new(CallbackRegistry::new());
        let peer = Arc::new(Peer::new(Arc::new(guest_side), registry.clone(), Arc::new(MemoryConsole::new())));
        let reflector = debug.then(|| Arc::new(Reflector::new(peer.clone())));
        let surface = Surface::new(peer, registry.clone(), reflector);
        Harness { sdk, host, registry, surface }
    }

    impl Harness {
        /// Everything the host pushed before answering has been dispatched once this returns.
        async fn sync(&self) {
            let utils = self.surface.interface("Utils").unwrap();
            utils.call("getAppId", vec![]).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_interface_mirror_is_memoized() {
        let h = harness(false);
        let a = h.surface.interface("Cloud").unwrap();
        let b = h.surface.interface("Cloud").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&h.surface.callback(), &h.surface.callback()));
        assert!(h.surface.interface("cloud").is_none());
    }

    #[tokio::test]
    async fn test_unknown_method_needs_no_host() {
        // Nobody answers on the other end: a round trip would never finish.
        let (guest_side, _host_side) = DuplexChannelTransport::pair();
        let registry = Arc::new(CallbackRegistry::new());
        let peer = Arc::new(Peer::new(Arc::new(guest_side), registry.clone(), Arc::new(MemoryConsole::new())));
        let surface = Surface::new(peer, registry, None);

        let utils = surface.interface("Utils").unwrap();
        let err = utils.call("constructor", vec![]).await.unwrap_err();
        assert_eq!(err.fault().map(|f| f.kind), Some(FaultKind::NoSuchMember));
        assert_eq!(err.to_string(), "Utils.constructor is not a function");
    }

    #[tokio::test]
    async fn test_cloned_handle_shares_state() {
        let h = harness(false);
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = hits.clone();
        let handle = h.surface.callback().register("GameLobbyJoinRequested", move |_: &[Value]| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        let copy = handle.clone();
        assert_eq!(copy.id(), handle.id());

        assert_eq!(copy.confirmed().await, Ok(()));
        assert_eq!(handle.confirmed().await, Ok(()));

        h.sdk.fire(CallbackType::GameLobbyJoinRequested, vec![Value::Bool(true)]);
        h.sync().await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        copy.disconnect();
        assert!(handle.is_disconnected());
        assert!(!h.registry.contains(handle.id()));
        handle.disconnect();

        h.sdk.fire(CallbackType::GameLobbyJoinRequested, vec![Value::Bool(false)]);
        h.sync().await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(h.sdk.listener_count(), 0);
        assert!(h.host.relay().is_empty());
    }

    #[tokio::test]
    async fn test_callback_types_map_names_to_themselves() {
        let release = harness(false);
        assert!(release.surface.callback().callback_types().await.is_empty());

        let debug = harness(true);
        let types = debug.surface.callback().callback_types().await;
        assert_eq!(types.len(), CallbackType::ALL.len());
        for callback in CallbackType::ALL {
            assert_eq!(types.get(callback.name()).map(String::as_str), Some(callback.name()));
        }
    }
}
