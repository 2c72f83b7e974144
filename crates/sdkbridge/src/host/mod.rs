//! # Privileged host
//!
//! Everything that touches the real sdk client lives here. The guest only ever
//! reaches these components through frames handled by `HostBridge`.

pub mod availability;
pub mod dispatcher;
pub mod reflect;
pub mod relay;
pub mod server;

pub use availability::Availability;
pub use availability::AvailabilityState;
pub use availability::StartupFatal;
pub use dispatcher::Dispatcher;
pub use reflect::Reflection;
pub use relay::CallbackRelay;
pub use server::HostBridge;

use wirerpc::Fault;
use wirerpc::FaultKind;

/// Text of the `NotInitialized` failure.
pub const NOT_INITIALIZED: &str = "Steamworks sdk is not initialized";

/// Failures returned to a single guest request. None of them stop the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    NotInitialized,
    UnknownInterface(String),
    NoSuchMember { interface: String, method: String },
    UnknownCallbackType(String),
    /// The sdk method failed. Carries the vendor message verbatim.
    Invocation(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotInitialized => f.write_str(NOT_INITIALIZED),
            Self::UnknownInterface(name) => write!(f, "{} is not a known interface", name),
            Self::NoSuchMember { interface, method } => {
                write!(f, "{}.{} is not a function", interface, method)
            }
            Self::UnknownCallbackType(name) => write!(f, "{} is not a valid callback type", name),
            Self::Invocation(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    pub fn kind(&self) -> FaultKind {
        match self {
            Self::NotInitialized => FaultKind::NotInitialized,
            Self::UnknownInterface(_) => FaultKind::UnknownInterface,
            Self::NoSuchMember { .. } => FaultKind::NoSuchMember,
            Self::UnknownCallbackType(_) => FaultKind::UnknownCallbackType,
            Self::Invocation(_) => FaultKind::Invocation,
        }
    }

    /// The wire form sent back in a `Reply`.
    pub fn to_fault(&self) -> Fault {
        Fault::new(self.kind(), self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
