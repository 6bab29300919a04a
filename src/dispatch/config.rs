//! Dispatch configuration.

use serde::{Deserialize, Serialize};

/// Settings for a [`DispatchContext`](super::DispatchContext).
///
/// Deserializable so it can sit inside a larger application config; every
/// field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Turn on [`SymbolicError`](crate::SymbolicError) debugging (cause
    /// chaining, backtraces in `Display`) when the context is built.
    #[serde(default)]
    pub debug_errors: bool,
    /// Log every reported symbolic failure.
    #[serde(default = "default_log_reported_errors")]
    pub log_reported_errors: bool,
}

fn default_log_reported_errors() -> bool {
    true
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            debug_errors: false,
            log_reported_errors: default_log_reported_errors(),
        }
    }
}
