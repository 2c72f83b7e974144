//! # sdkbridge
//!
//! Exposes a permissioned slice of a vendor sdk to untrusted web content.
//!
//! The privileged `host` owns the real sdk client. The `guest` side never sees it; it
//! only holds names (interface, method, callback type) that the host resolves on
//! every request. The two talk over a `Transport` using `wirerpc` frames.
//!
//! ```text
//! guest::Surface ──Call/Register/Disconnect/Reflect──▶ host::HostBridge ──▶ SdkClient
//!        ▲                                                  │
//!        └──────────────── Reply / Fired / Console ─────────┘
//! ```

pub mod config;
pub mod guest;
pub mod handoff;
pub mod host;
pub mod ledger;
pub mod outbox;
pub mod sdk;
pub mod transport;

pub use config::HostConfig;
pub use guest::GuestBridge;
pub use handoff::StartupHandoff;
pub use host::HostBridge;
pub use wirepack::Value;
