//! # Availability gate
//!
//! Guards the mirrored surface. When the host reported the sdk as unavailable, every
//! access is refused and the warning is logged on the first refusal only.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use wirerpc::LogLevel;

use crate::guest::console::Console;

pub struct AvailabilityGate {
    warning: Option<String>,
    has_warned: AtomicBool,
    console: Arc<dyn Console>,
}

impl AvailabilityGate {
    /// `warning` is the host-supplied text; `None` means the sdk is available.
    pub fn new(warning: Option<String>, console: Arc<dyn Console>) -> Self {
        Self {
            warning,
            has_warned: AtomicBool::new(false),
            console,
        }
    }

    pub fn is_available(&self) -> bool {
        self.warning.is_none()
    }

    /// Whether the warning has been logged yet.
    pub fn has_warned(&self) -> bool {
        self.has_warned.load(Ordering::SeqCst)
    }

    /// Returns whether access is allowed, logging the warning on the first refusal.
    pub fn admit(&self) -> bool {
        let Some(warning) = &self.warning else {
            return true;
        };
        if !self.has_warned.swap(true, Ordering::SeqCst) {
            self.console.log(LogLevel::Warn, warning);
        }
        false
    }
}
