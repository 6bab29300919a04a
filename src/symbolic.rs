//! Symbolic errors: a stable machine-readable code, a human message and an
//! optional chained cause.
//!
//! A [`SymbolicError`] always serializes as `{"code": ..., "message": ...}`,
//! whatever was chained into it. Chaining and backtrace capture are only
//! active while the process-wide debug flag is set.
//!
//! # Example
//!
//! ```
//! use dispatchkit::SymbolicError;
//!
//! let err = SymbolicError::new("auth.badCredentials", "Login/Password pair not valid.");
//! assert_eq!(
//!     err.to_string(),
//!     "SymbolicError(auth.badCredentials): Login/Password pair not valid."
//! );
//!
//! let json = serde_json::to_string(&err).unwrap();
//! assert_eq!(json, r#"{"code":"auth.badCredentials","message":"Login/Password pair not valid."}"#);
//! ```

use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// Well-known symbolic codes raised by this crate.
pub mod codes {
    /// Fallback when no code was given.
    pub const UNKNOWN: &str = "unknown";
    /// Parameter validation failed.
    pub const API_PARAM_INVALID: &str = "api.paramInvalid";
    /// `validate()` called on a parameter set without a schema.
    pub const BUG_SCHEMA_IS_NULL: &str = "bug.schemaIsNull";
    /// Null or wrongly typed argument passed to a transform.
    pub const CALL_BAD_ARGUMENT: &str = "call.badArgument";

    /// Prefix of programmer-error codes.
    pub const BUG_PREFIX: &str = "bug.";
}

static DEBUG: AtomicBool = AtomicBool::new(false);

/// Chained cause of a symbolic error.
pub type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Error with a symbolic code and optional chaining.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "WireError")]
pub struct SymbolicError {
    code: String,
    message: String,
    #[serde(skip)]
    cause: Option<Cause>,
    #[serde(skip)]
    backtrace: Option<Arc<Backtrace>>,
}

fn default_code() -> String {
    codes::UNKNOWN.to_string()
}

/// Wire form; decoding goes through [`SymbolicError::new`] so the code is
/// never empty.
#[derive(Deserialize)]
struct WireError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl From<WireError> for SymbolicError {
    fn from(wire: WireError) -> Self {
        SymbolicError::new(wire.code, wire.message).without_backtrace()
    }
}

impl SymbolicError {
    /// Create an error. An empty code becomes `"unknown"`.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        let code = code.into();
        Self {
            code: if code.is_empty() { default_code() } else { code },
            message: message.into(),
            cause: None,
            backtrace: capture_backtrace(),
        }
    }

    /// Create an error chaining `cause`.
    ///
    /// The cause is only kept when debug is enabled at this point.
    pub fn chained<E>(code: impl Into<String>, message: impl Into<String>, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::chained_arc(code, message, Arc::new(cause))
    }

    /// Like [`chained`](Self::chained) for a cause that is already shared.
    pub fn chained_arc(code: impl Into<String>, message: impl Into<String>, cause: Cause) -> Self {
        let mut err = Self::new(code, message);
        if Self::debug() {
            err.cause = Some(cause);
        }
        err
    }

    /// Turn debugging on or off for the whole process.
    ///
    /// Affects errors constructed afterwards and every `Display` call.
    pub fn set_debug(enabled: bool) {
        DEBUG.store(enabled, Ordering::SeqCst);
    }

    /// Current state of the debug flag.
    pub fn debug() -> bool {
        DEBUG.load(Ordering::SeqCst)
    }

    /// Attach an explicit backtrace.
    pub fn with_backtrace(mut self, backtrace: Backtrace) -> Self {
        self.backtrace = Some(Arc::new(backtrace));
        self
    }

    /// Drop any captured backtrace.
    pub fn without_backtrace(mut self) -> Self {
        self.backtrace = None;
        self
    }

    #[inline]
    pub fn code(&self) -> &str {
        &self.code
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The chained cause, if one was retained.
    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// The captured backtrace, if any.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        self.backtrace.as_deref()
    }

    /// Whether this is a programmer error (`bug.*`).
    pub fn is_bug(&self) -> bool {
        self.code.starts_with(codes::BUG_PREFIX)
    }
}

fn capture_backtrace() -> Option<Arc<Backtrace>> {
    if !SymbolicError::debug() {
        return None;
    }
    let bt = Backtrace::capture();
    match bt.status() {
        BacktraceStatus::Captured => Some(Arc::new(bt)),
        _ => None,
    }
}

impl fmt::Display for SymbolicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymbolicError({}): {}", self.code, self.message)?;

        if !Self::debug() {
            return Ok(());
        }

        if let Some(bt) = &self.backtrace {
            return write!(f, "\n: {}", bt);
        }

        let Some(cause) = &self.cause else {
            return Ok(());
        };

        let chained_bt = cause
            .downcast_ref::<SymbolicError>()
            .or_else(|| {
                cause
                    .downcast_ref::<DispatchError>()
                    .and_then(DispatchError::as_symbolic)
            })
            .and_then(SymbolicError::backtrace);

        match chained_bt {
            Some(bt) => write!(f, "\n: {}", bt),
            None => write!(f, "\nChained: {}", cause),
        }
    }
}

impl std::error::Error for SymbolicError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|c| c as &(dyn std::error::Error + 'static))
    }
}

impl PartialEq for SymbolicError {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code && self.message == other.message
    }
}

impl Eq for SymbolicError {}

/// Serializes access to the debug flag across tests.
#[cfg(test)]
pub(crate) fn debug_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Holds the debug lock and restores the flag on drop.
    struct DebugGuard {
        _lock: std::sync::MutexGuard<'static, ()>,
    }

    impl DebugGuard {
        fn set(enabled: bool) -> Self {
            let lock = debug_lock();
            SymbolicError::set_debug(enabled);
            Self { _lock: lock }
        }
    }

    impl Drop for DebugGuard {
        fn drop(&mut self) {
            SymbolicError::set_debug(false);
        }
    }

    #[test]
    fn test_code_falls_back_to_unknown() {
        let _g = DebugGuard::set(false);
        let err = SymbolicError::new("", "");
        assert_eq!(err.code(), "unknown");
        assert_eq!(err.message(), "");
        assert_eq!(err.to_string(), "SymbolicError(unknown): ");
    }

    #[test]
    fn test_display_without_debug_ignores_cause() {
        let _g = DebugGuard::set(false);
        let plain = SymbolicError::new("x.y", "m");
        let chained = SymbolicError::chained("x.y", "m", std::io::Error::other("inner"));

        assert_eq!(plain.to_string(), "SymbolicError(x.y): m");
        assert_eq!(chained.to_string(), plain.to_string());
        assert!(chained.cause().is_none());
    }

    #[test]
    fn test_cause_only_retained_with_debug() {
        let _g = DebugGuard::set(true);
        let err = SymbolicError::chained("x.y", "m", std::io::Error::other("inner"));
        assert!(err.cause().is_some());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_debug_chained_string() {
        let _g = DebugGuard::set(true);
        let cause = std::io::Error::other("disk on fire");
        let expected_tail = format!("Chained: {}", cause);

        let err = SymbolicError::chained("x.y", "m", cause).without_backtrace();

        let s = err.to_string();
        assert!(s.starts_with("SymbolicError(x.y): m"));
        assert!(s.ends_with(&expected_tail), "got: {}", s);
    }

    #[test]
    fn test_debug_no_cause_is_base_form() {
        let _g = DebugGuard::set(true);
        let err = SymbolicError::new("x.y", "m").without_backtrace();
        assert_eq!(err.to_string(), "SymbolicError(x.y): m");
    }

    #[test]
    fn test_debug_own_backtrace_wins() {
        let _g = DebugGuard::set(true);
        let inner = SymbolicError::new("inner.code", "inner").without_backtrace();
        let err = SymbolicError::chained("x.y", "m", inner).with_backtrace(Backtrace::force_capture());

        let s = err.to_string();
        assert!(s.starts_with("SymbolicError(x.y): m\n: "));
        assert!(!s.contains("Chained:"));
    }

    #[test]
    fn test_debug_chained_backtrace_before_chained_string() {
        let _g = DebugGuard::set(true);
        let inner = SymbolicError::new("inner.code", "inner").with_backtrace(Backtrace::force_capture());
        let err = SymbolicError::chained("x.y", "m", inner).without_backtrace();

        let s = err.to_string();
        assert!(s.starts_with("SymbolicError(x.y): m\n: "));
        assert!(!s.contains("Chained:"));
    }

    #[test]
    fn test_debug_backtrace_of_wrapped_cause() {
        let _g = DebugGuard::set(true);
        let inner = SymbolicError::new("inner.code", "inner").with_backtrace(Backtrace::force_capture());
        let err = SymbolicError::chained("x.y", "m", DispatchError::from(inner)).without_backtrace();

        let s = err.to_string();
        assert!(s.starts_with("SymbolicError(x.y): m\n: "));
        assert!(!s.contains("Chained:"));
    }

    #[test]
    fn test_serialization_is_stable() {
        let _g = DebugGuard::set(true);
        let plain = SymbolicError::new("a.b", "msg");
        let chained = SymbolicError::chained("a.b", "msg", std::io::Error::other("x"))
            .with_backtrace(Backtrace::force_capture());

        let expected = serde_json::json!({"code": "a.b", "message": "msg"});
        assert_eq!(serde_json::to_value(&plain).unwrap(), expected);
        assert_eq!(serde_json::to_value(&chained).unwrap(), expected);
    }

    #[test]
    fn test_deserialize_defaults() {
        let err: SymbolicError = serde_json::from_str("{}").unwrap();
        assert_eq!(err.code(), "unknown");
        assert_eq!(err.message(), "");

        let err: SymbolicError = serde_json::from_str(r#"{"code":"","message":"m"}"#).unwrap();
        assert_eq!(err.code(), "unknown");
        assert_eq!(err.message(), "m");

        let err: SymbolicError =
            serde_json::from_str(r#"{"code":"api.paramInvalid","message":"bad"}"#).unwrap();
        assert_eq!(err, SymbolicError::new(codes::API_PARAM_INVALID, "bad"));
    }

    #[test]
    fn test_is_bug() {
        assert!(SymbolicError::new(codes::BUG_SCHEMA_IS_NULL, "").is_bug());
        assert!(!SymbolicError::new(codes::API_PARAM_INVALID, "").is_bug());
    }

    #[test]
    fn test_set_and_get_debug() {
        let _g = DebugGuard::set(true);
        assert!(SymbolicError::debug());
        SymbolicError::set_debug(false);
        assert!(!SymbolicError::debug());
    }
}
