//! # Sdk collaborator interface
//!
//! The bridge never links the vendor library directly. The host is handed an
//! `SdkInit` at startup and, if initialization succeeds, talks to the resulting
//! `SdkClient` through these traits only.

pub mod memory;

use std::sync::Arc;

use wirepack::Value;

use crate::ledger::CallbackType;

pub use memory::MemoryLaunch;
pub use memory::MemorySdk;

/// Native event listener. Receives the event arguments in firing order.
pub type Listener = Box<dyn Fn(Vec<Value>) + Send + Sync>;

/// A live native event subscription.
pub trait NativeSubscription: Send + Sync {
    /// Unsubscribes from the native event source.
    fn disconnect(self: Box<Self>);
}

/// One named interface of the sdk client.
#[async_trait::async_trait]
pub trait SdkInterface: Send + Sync {
    /// Invokes `method`. The error is the raw vendor message.
    async fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value, String>;
}

/// An initialized sdk client.
pub trait SdkClient: Send + Sync {
    fn interface(&self, name: &str) -> Option<&dyn SdkInterface>;

    fn subscribe(&self, callback: CallbackType, listener: Listener) -> Box<dyn NativeSubscription>;
}

/// Why sdk initialization failed.
#[derive(Debug)]
pub enum InitError {
    /// The vendor library reported a failure. Carries its message text.
    Vendor(String),
    /// Anything else. Startup must not continue.
    Fatal(anyhow::Error),
}

impl std::fmt::Display for InitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vendor(msg) => write!(f, "sdk init failed: {}", msg),
            Self::Fatal(e) => write!(f, "sdk init crashed: {:#}", e),
        }
    }
}

impl std::error::Error for InitError {}

/// Entry point of the vendor sdk.
pub trait SdkInit {
    fn init(&self, app_id: Option<u32>) -> Result<Arc<dyn SdkClient>, InitError>;
}
