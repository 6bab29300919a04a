//! Controllers: named collections of request handlers.
//!
//! A [`Controller`] is an [`Object`] whose methods take `(Request, Response)`
//! and resolve to [`HandlerResult`]. Value members (such as a `_config`
//! block for the routing layer) can sit next to the handlers and are never
//! wrapped.
//!
//! # Example
//!
//! ```ignore
//! use dispatchkit::handler::Controller;
//!
//! let auth = Controller::new("auth")
//!     .with_value("_config", json!({"actions": false}))
//!     .action("login", |_req, res| async move {
//!         res.json(&json!({"todo": "login() is not implemented yet!"})).await
//!     });
//! ```

use std::future::Future;

use super::{Request, Response};
use crate::error::{DispatchError, Result};
use crate::interceptor::Object;

/// Result type for handler functions.
pub type HandlerResult = Result<()>;

/// Positional arguments of a handler: request first, response second.
pub type HandlerArgs = (Request, Response);

/// Named collection of handlers and plain values.
pub type Controller = Object<HandlerArgs, HandlerResult>;

impl Object<HandlerArgs, HandlerResult> {
    /// Add a handler that only needs the request and the response.
    pub fn action<F, Fut>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.insert_method(name, move |_recv, (req, res): HandlerArgs| handler(req, res));
        self
    }

    /// Invoke the handler registered as `action`.
    pub async fn invoke(&self, action: &str, req: Request, res: Response) -> HandlerResult {
        let fut = self
            .call(action, (req, res))
            .ok_or_else(|| DispatchError::HandlerNotFound(format!("{}.{}", self.name(), action)))?;

        fut.await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::handler::MemorySink;

    #[test]
    fn test_register_actions() {
        let controller = Controller::new("user")
            .action("create", |_req, _res| async { Ok(()) })
            .action("show", |_req, _res| async { Ok(()) })
            .with_value("_config", json!({"rest": false}));

        assert_eq!(controller.name(), "user");
        assert!(controller.method("create").is_some());
        assert!(controller.method("show").is_some());
        assert!(controller.method("_config").is_none());
        assert_eq!(controller.value("_config"), Some(&json!({"rest": false})));
    }

    #[tokio::test]
    async fn test_invoke_passes_request_and_response() {
        let sink = MemorySink::new();
        let controller = Controller::new("echo").action("echo", |req, res| async move {
            res.json(&req.param("msg")).await
        });

        let req = Request::new().with_param("msg", "hello");
        controller
            .invoke("echo", req, Response::with_sink(sink.clone()))
            .await
            .unwrap();

        assert_eq!(sink.bodies(), vec![json!("hello")]);
    }

    #[tokio::test]
    async fn test_handler_not_found() {
        let controller = Controller::new("user").with_value("_config", json!({}));

        let err = controller
            .invoke("nonexistent", Request::new(), Response::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::HandlerNotFound(ref n) if n == "user.nonexistent"));

        let err = controller
            .invoke("_config", Request::new(), Response::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::HandlerNotFound(_)));
    }
}
