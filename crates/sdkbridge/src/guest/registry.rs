//! # Callback registry
//!
//! The guest's table of local event handlers, keyed by subscription id. Ids start at 1,
//! only ever grow, and are never reused while the registry lives. The registry is
//! owned by the bridge and cleared when the guest shuts down.

use std::any::Any;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use dashmap::DashMap;
use wirepack::Value;

pub type Handler = Arc<dyn Fn(&[Value]) + Send + Sync>;

pub struct CallbackRegistry {
    next_id: AtomicU64,
    handlers: DashMap<u64, Handler>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            handlers: DashMap::new(),
        }
    }

    /// Stores `handler` under a fresh id.
    pub fn insert(&self, handler: Handler) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers.insert(id, handler);
        id
    }

    /// Returns whether a handler was removed.
    pub fn remove(&self, id: u64) -> bool {
        self.handlers.remove(&id).is_some()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.handlers.contains_key(&id)
    }

    /// Runs the handler for `id`. Ids without a handler are ignored.
    ///
    /// The handler runs after the table lock is released, so it may register or
    /// disconnect callbacks itself. A panicking handler is logged and contained; it
    /// stays registered and later events still reach it.
    pub fn dispatch(&self, id: u64, args: &[Value]) -> bool {
        let Some(handler) = self.handlers.get(&id).map(|entry| entry.value().clone()) else {
            tracing::trace!(id, "event for unknown or disconnected callback ignored");
            return false;
        };
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler(args))) {
            tracing::error!(id, panic = panic_message(payload.as_ref()), "callback handler panicked");
        }
        true
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Removes every handler and returns their ids.
    pub fn clear(&self) -> Vec<u64> {
        let ids: Vec<u64> = self.handlers.iter().map(|e| *e.key()).collect();
        ids.into_iter().filter(|id| self.remove(*id)).collect()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}
