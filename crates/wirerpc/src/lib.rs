//! # Wirerpc
//!
//! The message vocabulary of the sdk bridge, written over `wirepack`.
//!
//! ## Frames
//!
//! Guest to host:
//! - `Call`: invoke `interface.method(args)`; answered by a `Reply`.
//! - `Register`: subscribe callback id to a callback type; answered by a `Reply`.
//! - `Disconnect`: drop a subscription; never answered.
//! - `Reflect`: list member names at a path; answered by a `Reply`. Debug hosts only.
//!
//! Host to guest:
//! - `Reply`: the outcome of one request, correlated by `seq`.
//! - `Fired`: a native event for one subscription id.
//! - `Console`: a message for the guest's console.
//!
//! ## Invariants
//! - **Panic Safety**: Decoding never panics on foreign bytes.
//! - **Forward Compatibility**: Unknown fields inside a frame are skipped.

mod error;
mod frame;

#[cfg(test)]
mod tests;

pub use error::Error;
pub use error::Fault;
pub use error::FaultKind;
pub use error::Result;
pub use frame::CallFrame;
pub use frame::ConsoleFrame;
pub use frame::FiredFrame;
pub use frame::Frame;
pub use frame::LogLevel;
pub use frame::ReflectFrame;
pub use frame::RegisterFrame;
pub use frame::ReplyFrame;
pub use frame::decode_seq;
