//! Console sinks for the guest context.

use std::sync::Arc;
use std::sync::Mutex;

use wirerpc::LogLevel;

/// Where the guest shows availability warnings and host console messages.
pub trait Console: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);
}

/// Forwards console output to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingConsole;

impl Console for TracingConsole {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Log => tracing::info!(target: "console", "{}", message),
            LogLevel::Warn => tracing::warn!(target: "console", "{}", message),
            LogLevel::Error => tracing::error!(target: "console", "{}", message),
        }
    }
}

/// Captures console output in memory for inspection.
#[derive(Debug, Clone, Default)]
pub struct MemoryConsole {
    lines: Arc<Mutex<Vec<(LogLevel, String)>>>,
}

impl MemoryConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every captured line.
    pub fn lines(&self) -> Vec<(LogLevel, String)> {
        self.lines.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl Console for MemoryConsole {
    fn log(&self, level: LogLevel, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((level, message.to_string()));
    }
}
