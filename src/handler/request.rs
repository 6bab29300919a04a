//! Inbound request seam.
//!
//! The transport layer hands handlers something that can produce a flat
//! mapping of parameter names to values. [`Request`] is the concrete value
//! the dispatch layer passes around; anything implementing [`ParamSource`]
//! can feed a [`ParameterSet`](crate::params::ParameterSet).

use serde_json::{Map, Value};

use crate::error::{DispatchError, Result};

/// Source of request parameters.
pub trait ParamSource {
    /// All parameters of the current invocation.
    fn params(&self) -> Map<String, Value>;
}

impl ParamSource for Map<String, Value> {
    fn params(&self) -> Map<String, Value> {
        self.clone()
    }
}

/// An inbound request as seen by a handler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    params: Map<String, Value>,
}

impl Request {
    /// Create a request with no parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a request from a parameter map.
    pub fn from_params(params: Map<String, Value>) -> Self {
        Self { params }
    }

    /// Parse a JSON object body into a request.
    ///
    /// Anything other than a JSON object is rejected.
    pub fn from_json(body: &str) -> Result<Self> {
        match serde_json::from_str::<Value>(body)? {
            Value::Object(params) => Ok(Self { params }),
            other => Err(DispatchError::InvalidRequest(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Add a parameter (builder style).
    pub fn with_param(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    /// Borrow a single parameter.
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }
}

impl ParamSource for Request {
    fn params(&self) -> Map<String, Value> {
        self.params.clone()
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_object() {
        let req = Request::from_json(r#"{"id": "7", "email": "a@b.com"}"#).unwrap();
        assert_eq!(req.param("email"), Some(&Value::from("a@b.com")));
        assert_eq!(req.params().len(), 2);
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        let err = Request::from_json("[1, 2]").unwrap_err();
        assert!(matches!(err, DispatchError::InvalidRequest(_)));
        assert_eq!(err.to_string(), "Invalid request: expected a JSON object, got array");

        let err = Request::from_json("{not json").unwrap_err();
        assert!(matches!(err, DispatchError::Json(_)));
    }

    #[test]
    fn test_params_is_a_copy() {
        let req = Request::new().with_param("a", 1);
        let mut params = req.params();
        params.insert("b".into(), Value::from(2));

        assert!(req.param("b").is_none());
    }

    #[test]
    fn test_map_is_a_param_source() {
        let mut map = Map::new();
        map.insert("k".into(), Value::Bool(true));
        assert_eq!(ParamSource::params(&map), map);
    }
}
