//! # dispatchkit
//!
//! Uniform failure handling and parameter preparation for request handlers.
//!
//! This crate sits between a routing layer and business logic:
//!
//! - **Interception**: every handler of a registered [`Controller`] is
//!   wrapped by a [`DispatchContext`]
//! - **Symbolic errors**: [`SymbolicError`] carries a stable dotted code and
//!   always serializes as `{"code", "message"}`
//! - **Parameters**: [`ParameterSet`](params::ParameterSet) copies, cleans and
//!   validates inbound parameters before a handler commits to any work
//!
//! A handler that fails with a symbolic error produces exactly one
//! `{"error": {"code", "message"}}` response. Any other failure is handed
//! back to the routing layer unchanged.
//!
//! ## Example
//!
//! ```ignore
//! use dispatchkit::{Controller, DispatchContext};
//! use dispatchkit::params::{clean_proper_name, ParameterSet};
//!
//! let dispatch = DispatchContext::new();
//!
//! let user = dispatch.register(Controller::new("user").action("create", move |req, res| {
//!     let schema = schema.clone();
//!     async move {
//!         let mut params = ParameterSet::new(&req, Some(schema));
//!         params
//!             .try_apply(&["firstName", "lastName"], clean_proper_name)?
//!             .validate()?;
//!         res.data(&params.get_all()).await
//!     }
//! }));
//!
//! user.invoke("create", request, response).await?;
//! ```

pub mod dispatch;
pub mod error;
pub mod handler;
pub mod interceptor;
pub mod params;
pub mod symbolic;
pub mod writer;

pub use dispatch::{DispatchConfig, DispatchContext};
pub use error::{DispatchError, Result};
pub use handler::{Controller, Request, Response};
pub use symbolic::SymbolicError;
