//! The dispatch context: the one place handler failures become responses.
//!
//! Every handler of a registered controller is wrapped. The wrapper awaits
//! the handler's future to completion, so failures raised after any number
//! of suspension points are still caught. Work a handler detaches with
//! `tokio::spawn` is outside that future; report its failures with
//! [`DispatchContext::report_error`].
//!
//! Per call:
//!
//! ```text
//! Dispatching ─┬─► Success
//!              ├─► SymbolicFailure ─► Reported   ({"error": {code, message}})
//!              └─► UnexpectedFailure ─► Propagated (returned unchanged)
//! ```

use std::sync::{Arc, OnceLock};

use super::DispatchConfig;
use crate::error::DispatchError;
use crate::handler::{Controller, HandlerArgs, HandlerResult, Response};
use crate::interceptor::{BoxFuture, Method, MethodInterceptor, Receiver};
use crate::symbolic::SymbolicError;

/// Interceptor specialised for controllers.
pub type ControllerInterceptor = MethodInterceptor<DispatchShared, HandlerArgs, HandlerResult>;

/// State shared by every wrapped handler of a context.
#[derive(Debug)]
pub struct DispatchShared {
    config: DispatchConfig,
}

impl DispatchShared {
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }
}

/// Wraps controllers so symbolic failures are reported uniformly.
///
/// Holds no per-request state; one context can serve any number of
/// concurrent requests.
pub struct DispatchContext {
    shared: Arc<DispatchShared>,
    interceptor: ControllerInterceptor,
}

impl DispatchContext {
    /// Create a context with default configuration.
    pub fn new() -> Self {
        Self::with_config(DispatchConfig::default())
    }

    /// Create a context with the given configuration.
    ///
    /// `debug_errors` switches the process-wide symbolic error debug flag
    /// on; build contexts at startup.
    pub fn with_config(config: DispatchConfig) -> Self {
        if config.debug_errors {
            SymbolicError::set_debug(true);
        }

        let shared = Arc::new(DispatchShared { config });
        let interceptor = MethodInterceptor::new(Self::dispatch_action, Some(shared.clone()));

        Self {
            shared,
            interceptor,
        }
    }

    /// Create a builder.
    pub fn builder() -> DispatchContextBuilder {
        DispatchContextBuilder::new()
    }

    /// The process-wide context, created with default configuration on
    /// first use.
    ///
    /// Prefer building a context at startup and passing it to registration
    /// sites; this exists for callers that need a single shared instance.
    pub fn instance() -> &'static DispatchContext {
        static INSTANCE: OnceLock<DispatchContext> = OnceLock::new();
        INSTANCE.get_or_init(DispatchContext::new)
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.shared.config
    }

    /// Wrap every handler of `controller`. Value members are kept as they are.
    ///
    /// Register each controller once; registering twice nests the wrappers.
    pub fn register(&self, controller: Controller) -> Controller {
        tracing::debug!(
            controller = controller.name(),
            members = controller.len(),
            "registering controller"
        );
        self.interceptor.intercept(controller)
    }

    /// The interceptor callback: run the original handler and report its
    /// symbolic failure, if any.
    pub fn dispatch_action(
        shared: Option<Arc<DispatchShared>>,
        original: Method<HandlerArgs, HandlerResult>,
        receiver: Receiver,
        (req, res): HandlerArgs,
    ) -> BoxFuture<'static, HandlerResult> {
        Box::pin(async move {
            tracing::debug!(
                controller = receiver.object(),
                action = receiver.member(),
                "dispatching"
            );

            let reply = res.clone();
            match original(receiver.clone(), (req, res)).await {
                Ok(()) => Ok(()),
                Err(err) => report(shared.as_deref(), Some(&receiver), &reply, err).await,
            }
        })
    }

    /// Write `err` to `res` if it is symbolic, otherwise hand it back.
    ///
    /// Returns `Ok(())` once a symbolic error has been written as
    /// `{"error": {"code", "message"}}`. Any other error is returned
    /// unchanged and nothing is written.
    pub async fn report_error(&self, res: &Response, err: DispatchError) -> HandlerResult {
        report(Some(&self.shared), None, res, err).await
    }
}

impl Default for DispatchContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DispatchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchContext")
            .field("config", &self.shared.config)
            .finish()
    }
}

async fn report(
    shared: Option<&DispatchShared>,
    receiver: Option<&Receiver>,
    res: &Response,
    err: DispatchError,
) -> HandlerResult {
    let controller = receiver.map_or("-", Receiver::object);
    let action = receiver.map_or("-", Receiver::member);

    let sym = match err.into_symbolic() {
        Ok(sym) => sym,
        Err(other) => {
            tracing::error!(controller, action, error = %other, "unexpected handler failure");
            return Err(other);
        }
    };

    let log = shared.map_or(true, |s| s.config.log_reported_errors);
    if log {
        if sym.is_bug() {
            tracing::error!(controller, action, code = sym.code(), "programmer error: {}", sym.message());
        } else {
            tracing::warn!(controller, action, code = sym.code(), "{}", sym.message());
        }
    }

    res.error(&sym).await
}

/// Builder for [`DispatchContext`].
#[derive(Debug, Clone, Default)]
pub struct DispatchContextBuilder {
    config: DispatchConfig,
}

impl DispatchContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Enable symbolic error debugging for the process.
    pub fn debug_errors(mut self, enabled: bool) -> Self {
        self.config.debug_errors = enabled;
        self
    }

    /// Log reported symbolic failures.
    ///
    /// Default: true
    pub fn log_reported_errors(mut self, enabled: bool) -> Self {
        self.config.log_reported_errors = enabled;
        self
    }

    pub fn build(self) -> DispatchContext {
        DispatchContext::with_config(self.config)
    }
}
