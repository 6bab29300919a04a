//! Error types for dispatchkit.

use thiserror::Error;

use crate::symbolic::SymbolicError;

/// Boxed error used for failures that are not symbolic.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for all dispatch operations.
///
/// Handlers return [`Result<()>`](Result). Only the [`Symbolic`](DispatchError::Symbolic)
/// variant is recovered by the dispatch wrapper; every other variant
/// propagates to the caller of the wrapped handler unchanged.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Domain, validation or programmer error with a stable code.
    #[error(transparent)]
    Symbolic(#[from] SymbolicError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error while writing a response.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The response sink is gone (writer task stopped).
    #[error("Response sink closed")]
    SinkClosed,

    /// No handler registered under the given action name.
    #[error("Handler not found for action: {0}")]
    HandlerNotFound(String),

    /// Inbound request could not be turned into a parameter mapping.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Anything else raised by business logic.
    #[error(transparent)]
    Unexpected(BoxError),
}

impl DispatchError {
    /// Wrap an arbitrary error as an unexpected failure.
    ///
    /// A [`SymbolicError`] passed here still becomes the `Symbolic` variant.
    pub fn unexpected<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        DispatchError::from_boxed(Box::new(err))
    }

    /// Classify a boxed error: symbolic errors are unboxed, anything else
    /// stays unexpected.
    pub fn from_boxed(err: BoxError) -> Self {
        match err.downcast::<SymbolicError>() {
            Ok(sym) => DispatchError::Symbolic(*sym),
            Err(other) => DispatchError::Unexpected(other),
        }
    }

    /// The symbolic error carried by this value, if any.
    pub fn as_symbolic(&self) -> Option<&SymbolicError> {
        match self {
            DispatchError::Symbolic(e) => Some(e),
            DispatchError::Unexpected(e) => e.downcast_ref::<SymbolicError>(),
            _ => None,
        }
    }

    /// Take the symbolic error out, or hand `self` back unchanged.
    pub fn into_symbolic(self) -> std::result::Result<SymbolicError, Self> {
        match self {
            DispatchError::Symbolic(e) => Ok(e),
            DispatchError::Unexpected(e) => match e.downcast::<SymbolicError>() {
                Ok(sym) => Ok(*sym),
                Err(other) => Err(DispatchError::Unexpected(other)),
            },
            other => Err(other),
        }
    }
}

/// Result type alias using DispatchError.
pub type Result<T> = std::result::Result<T, DispatchError>;
