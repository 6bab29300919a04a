//! Request-scoped parameter set.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::Schema;
use crate::handler::ParamSource;
use crate::symbolic::{codes, SymbolicError};

/// Key injected by the routing layer; never a domain parameter.
pub const RESERVED_KEY: &str = "id";

/// One parameter name or a list of them.
pub trait ParamNames {
    fn for_each_name(&self, f: &mut dyn FnMut(&str));
}

impl ParamNames for str {
    fn for_each_name(&self, f: &mut dyn FnMut(&str)) {
        f(self)
    }
}

impl ParamNames for String {
    fn for_each_name(&self, f: &mut dyn FnMut(&str)) {
        f(self)
    }
}

impl<T: AsRef<str>> ParamNames for [T] {
    fn for_each_name(&self, f: &mut dyn FnMut(&str)) {
        self.iter().for_each(|n| f(n.as_ref()))
    }
}

impl<T: AsRef<str>, const N: usize> ParamNames for [T; N] {
    fn for_each_name(&self, f: &mut dyn FnMut(&str)) {
        self.as_slice().for_each_name(f)
    }
}

impl<T: AsRef<str>> ParamNames for Vec<T> {
    fn for_each_name(&self, f: &mut dyn FnMut(&str)) {
        self.as_slice().for_each_name(f)
    }
}

/// Validated, transformable view over a request's parameters.
///
/// Owns its own copy of the inbound mapping. The reserved `"id"` key is
/// removed on construction.
///
/// # Example
///
/// ```
/// use dispatchkit::handler::Request;
/// use dispatchkit::params::{clean_proper_name, ParameterSet};
///
/// let req = Request::new().with_param("id", "x").with_param("firstName", "  bob");
///
/// let mut params = ParameterSet::new(&req, None);
/// params.try_apply("firstName", clean_proper_name).unwrap();
///
/// assert!(!params.has("id"));
/// assert_eq!(params.to_string(), r#"{"firstName":"Bob"}"#);
/// ```
#[derive(Clone)]
pub struct ParameterSet {
    items: Map<String, Value>,
    schema: Option<Arc<dyn Schema>>,
}

impl ParameterSet {
    /// Copy the parameters of `source` and bind an optional schema.
    pub fn new<S>(source: &S, schema: Option<Arc<dyn Schema>>) -> Self
    where
        S: ParamSource + ?Sized,
    {
        let mut set = Self {
            items: source.params(),
            schema,
        };
        set.delete(RESERVED_KEY);
        set
    }

    /// Remove `name` if present.
    pub fn delete(&mut self, name: &str) -> &mut Self {
        self.items.remove(name);
        self
    }

    /// Whether `name` is present (an explicit `null` counts as present).
    pub fn has(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    /// Value of `name`; `None` when absent.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.items.get(name)
    }

    /// Replace each named value with `f(value)`. Absent names are skipped.
    pub fn apply<N, F>(&mut self, names: &N, mut f: F) -> &mut Self
    where
        N: ParamNames + ?Sized,
        F: FnMut(Value) -> Value,
    {
        names.for_each_name(&mut |name: &str| {
            if let Some(slot) = self.items.get_mut(name) {
                let current = std::mem::take(slot);
                *slot = f(current);
            }
        });
        self
    }

    /// Like [`apply`](Self::apply) for transforms that can reject a value.
    ///
    /// Stops at the first rejection; the rejected value is left as it was.
    pub fn try_apply<N, F>(&mut self, names: &N, mut f: F) -> Result<&mut Self, SymbolicError>
    where
        N: ParamNames + ?Sized,
        F: FnMut(&Value) -> Result<Value, SymbolicError>,
    {
        let mut failure = None;
        names.for_each_name(&mut |name: &str| {
            if failure.is_some() {
                return;
            }
            if let Some(slot) = self.items.get_mut(name) {
                match f(&*slot) {
                    Ok(v) => *slot = v,
                    Err(e) => failure = Some(e),
                }
            }
        });

        match failure {
            Some(e) => Err(e),
            None => Ok(self),
        }
    }

    /// Validate against the bound schema.
    ///
    /// Fails with `bug.schemaIsNull` when no schema was bound, and with
    /// `api.paramInvalid` when the schema rejects the parameters.
    pub fn validate(&mut self) -> Result<&mut Self, SymbolicError> {
        let Some(schema) = &self.schema else {
            return Err(SymbolicError::new(
                codes::BUG_SCHEMA_IS_NULL,
                "call to validate() with null schema in ctor",
            ));
        };

        schema.validate(&self.items)?;
        Ok(self)
    }

    /// Independent copy of all parameters.
    pub fn get_all(&self) -> Map<String, Value> {
        self.items.clone()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl ParamSource for ParameterSet {
    fn params(&self) -> Map<String, Value> {
        self.get_all()
    }
}

/// Canonical JSON of the parameters (keys sorted).
impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(&self.items).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl fmt::Debug for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterSet")
            .field("items", &self.items)
            .field("has_schema", &self.schema.is_some())
            .finish()
    }
}
