//! # Guest context
//!
//! The low-trust side. It holds names and handles only; every sdk access becomes a
//! frame to the host.

pub mod console;
pub mod gate;
pub mod mirror;
pub mod peer;
pub mod reflector;
pub mod registry;

pub use console::Console;
pub use console::MemoryConsole;
pub use console::TracingConsole;
pub use gate::AvailabilityGate;
pub use mirror::CallbackHandle;
pub use mirror::CallbackMirror;
pub use mirror::InterfaceMirror;
pub use mirror::Method;
pub use mirror::Surface;
pub use peer::Error;
pub use peer::Peer;
pub use peer::Result;
pub use reflector::Reflector;
pub use registry::CallbackRegistry;

use std::sync::Arc;

use wirerpc::Frame;

use crate::handoff::StartupHandoff;
use crate::transport::Transport;

/// Everything the guest context can reach, built from the startup handoff.
pub struct GuestBridge {
    handoff: StartupHandoff,
    peer: Arc<Peer>,
    registry: Arc<CallbackRegistry>,
    reflector: Option<Arc<Reflector>>,
    surface: Arc<Surface>,
    gate: AvailabilityGate,
}

impl GuestBridge {
    /// Connects to the host over `transport`. Must be called inside a tokio runtime.
    pub fn connect(handoff: StartupHandoff, transport: Arc<dyn Transport>, console: Arc<dyn Console>) -> Self {
        let registry = Arc::new(CallbackRegistry::new());
        let peer = Arc::new(Peer::new(transport, registry.clone(), console.clone()));
        let reflector = handoff.debug.then(|| Arc::new(Reflector::new(peer.clone())));
        let surface = Arc::new(Surface::new(peer.clone(), registry.clone(), reflector.clone()));
        let gate = AvailabilityGate::new(handoff.availability_warning.clone(), console);

        Self {
            handoff,
            peer,
            registry,
            reflector,
            surface,
            gate,
        }
    }

    /// The mirrored sdk surface, or `None` when the sdk is unavailable.
    ///
    /// The first refused access logs the availability warning; later ones are silent.
    pub fn sdk(&self) -> Option<Arc<Surface>> {
        self.gate.admit().then(|| self.surface.clone())
    }

    /// Member listing, present only in debug mode.
    pub fn reflector(&self) -> Option<&Reflector> {
        self.reflector.as_deref()
    }

    pub fn debug(&self) -> bool {
        self.handoff.debug
    }

    pub fn gate(&self) -> &AvailabilityGate {
        &self.gate
    }

    pub fn registry(&self) -> &CallbackRegistry {
        &self.registry
    }

    /// Drops every local handler and asks the host to tear down their subscriptions.
    pub fn shutdown(&self) {
        let ids = self.registry.clear();
        tracing::debug!(count = ids.len(), "guest bridge shutting down");
        for id in ids {
            if let Err(e) = self.peer.send(&Frame::Disconnect { id }) {
                tracing::debug!(id, error = %e, "disconnect not delivered");
            }
        }
    }
}
