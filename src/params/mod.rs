//! Parameter handling - extraction, transformation and validation.
//!
//! Provides:
//! - [`ParameterSet`] - request-scoped view over inbound parameters
//! - [`Schema`] - the validation engine seam, with [`ObjectSchema`] compiling
//!   to the built-in JSON Schema engine
//! - [`clean_proper_name`] - transform for person names
//!
//! # Example
//!
//! ```ignore
//! let mut params = ParameterSet::new(&req, Some(schema.clone()));
//! params
//!     .try_apply(&["firstName", "lastName"], clean_proper_name)?
//!     .validate()?;
//! res.data(&params.get_all()).await
//! ```

mod schema;
mod set;
mod transform;

pub use schema::{
    FieldError, ObjectSchema, ObjectValidator, Schema, SchemaError, StringRule, ValidationFailure,
};
pub use set::{ParamNames, ParameterSet, RESERVED_KEY};
pub use transform::{clean_proper_name, clean_proper_name_str};
