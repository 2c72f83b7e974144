//! # Reflection service
//!
//! Answers "which members exist at this path" from the compiled ledger. Only a host
//! running in debug mode constructs one.

use crate::ledger;

pub struct Reflection {
    initialized: bool,
}

impl Reflection {
    pub fn new(initialized: bool) -> Self {
        Self { initialized }
    }

    /// Member names at `path`. Empty when the path does not resolve or the sdk never came up.
    pub fn query(&self, path: &[String]) -> Vec<String> {
        if !self.initialized {
            return Vec::new();
        }
        ledger::members(path)
    }
}
