//! Dispatch module - uniform failure handling for registered controllers.
//!
//! Provides:
//! - [`DispatchContext`] - wraps every handler of a controller so symbolic
//!   failures become `{"error": {...}}` responses
//! - [`DispatchConfig`] - settings for the context
//!
//! # Example
//!
//! ```ignore
//! use dispatchkit::{Controller, DispatchContext};
//!
//! let dispatch = DispatchContext::new();
//! let user = dispatch.register(Controller::new("user").action("create", create_user));
//!
//! // Routing layer:
//! user.invoke("create", req, res).await?;
//! ```

mod config;
mod context;

pub use config::DispatchConfig;
pub use context::{ControllerInterceptor, DispatchContext, DispatchContextBuilder, DispatchShared};
