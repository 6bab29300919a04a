//! Handler module - the request/response seams and controllers.
//!
//! Provides:
//! - [`Request`] / [`ParamSource`] - inbound parameters
//! - [`Response`] / [`JsonSink`] - outbound JSON bodies
//! - [`Controller`] - named collection of handlers
//!
//! # Example
//!
//! ```ignore
//! use dispatchkit::handler::{Controller, Request, Response};
//!
//! let user = Controller::new("user").action("create", |req, res| async move {
//!     let params = ParameterSet::new(&req, Some(schema.clone()));
//!     res.data(&params.get_all()).await
//! });
//! ```

mod registry;
mod request;
mod response;

pub use registry::{Controller, HandlerArgs, HandlerResult};
pub use request::{ParamSource, Request};
pub use response::{JsonSink, MemorySink, Response};
