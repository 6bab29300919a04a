//! Validation engine seam and a JSON Schema backed object validator.
//!
//! [`Schema`] is what a [`ParameterSet`](super::ParameterSet) validates
//! against. [`ObjectSchema`] declares a flat object of string fields and
//! compiles it into a JSON Schema document checked by `jsonschema`; errors
//! come back in the wording clients already know (`"x" is required`, ...).
//!
//! ```
//! use dispatchkit::params::{ObjectSchema, Schema, StringRule};
//! use regex::Regex;
//!
//! let schema = ObjectSchema::new()
//!     .field("firstName", StringRule::new().alphanum().max(30).required())
//!     .field("email", StringRule::new().email().required())
//!     .field("password", StringRule::new().pattern(Regex::new(r"\w{6,128}").unwrap()).required())
//!     .build()
//!     .unwrap();
//!
//! let data = serde_json::json!({"firstName": "Bob", "email": "a@b.com", "password": "ab"});
//! let err = schema.validate(data.as_object().unwrap()).unwrap_err();
//! assert_eq!(
//!     err.to_string(),
//!     r#""password" with value "ab" fails to match the required pattern: /\w{6,128}/"#
//! );
//! ```

use std::fmt;

use jsonschema::error::ValidationErrorKind;
use jsonschema::{Draft, ValidationError, Validator};
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::symbolic::{codes, SymbolicError};

const ALPHANUM_PATTERN: &str = "^[a-zA-Z0-9]*$";

/// A validation engine bound to one schema.
pub trait Schema: Send + Sync {
    /// Check `data`, reporting every rule it breaks.
    fn validate(&self, data: &Map<String, Value>) -> Result<(), ValidationFailure>;
}

/// One broken rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Structured validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", join_messages(.details))]
pub struct ValidationFailure {
    details: Vec<FieldError>,
}

fn join_messages(details: &[FieldError]) -> String {
    details
        .iter()
        .map(|d| d.message.as_str())
        .collect::<Vec<_>>()
        .join(". ")
}

impl ValidationFailure {
    pub fn new(details: Vec<FieldError>) -> Self {
        Self { details }
    }

    pub fn details(&self) -> &[FieldError] {
        &self.details
    }
}

impl From<ValidationFailure> for SymbolicError {
    fn from(failure: ValidationFailure) -> Self {
        SymbolicError::chained(codes::API_PARAM_INVALID, failure.to_string(), failure)
    }
}

/// The declared schema could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid schema: {0}")]
pub struct SchemaError(String);

impl From<ValidationError<'_>> for SchemaError {
    fn from(err: ValidationError<'_>) -> Self {
        SchemaError(err.to_string())
    }
}

/// Rules for a single string field.
#[derive(Debug, Clone, Default)]
pub struct StringRule {
    required: bool,
    alphanum: bool,
    email: bool,
    min: Option<usize>,
    max: Option<usize>,
    pattern: Option<Regex>,
}

impl StringRule {
    pub fn new() -> Self {
        Self::default()
    }

    /// The field must be present.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Only ASCII letters and digits.
    pub fn alphanum(mut self) -> Self {
        self.alphanum = true;
        self
    }

    /// Minimum length in characters.
    pub fn min(mut self, len: usize) -> Self {
        self.min = Some(len);
        self
    }

    /// Maximum length in characters.
    pub fn max(mut self, len: usize) -> Self {
        self.max = Some(len);
        self
    }

    /// The value must be an email address (`format: "email"`).
    pub fn email(mut self) -> Self {
        self.email = true;
        self
    }

    /// The value must contain a match of `re` (not anchored).
    pub fn pattern(mut self, re: Regex) -> Self {
        self.pattern = Some(re);
        self
    }

    /// Property schema for this field.
    ///
    /// Empty strings are always refused. A user pattern sits under `allOf`
    /// so it can share the object with the alphanumeric pattern.
    fn to_schema(&self) -> Value {
        let mut prop = Map::new();
        prop.insert("type".into(), json!("string"));
        prop.insert("minLength".into(), json!(self.min.unwrap_or(0).max(1)));
        if let Some(max) = self.max {
            prop.insert("maxLength".into(), json!(max));
        }
        if self.alphanum {
            prop.insert("pattern".into(), json!(ALPHANUM_PATTERN));
        }
        if self.email {
            prop.insert("format".into(), json!("email"));
        }
        if let Some(re) = &self.pattern {
            prop.insert("allOf".into(), json!([{ "pattern": re.as_str() }]));
        }
        Value::Object(prop)
    }

    /// Rank and message for a failed keyword. Lower ranks win when a field
    /// breaks several rules.
    fn describe(
        &self,
        name: &str,
        keyword: &str,
        user_pattern: bool,
        value: Option<&Value>,
    ) -> Option<(u8, String)> {
        let s = value.and_then(Value::as_str).unwrap_or_default();

        let described = match keyword {
            "type" => (0, format!("\"{}\" must be a string", name)),
            "minLength" if s.is_empty() => (1, format!("\"{}\" is not allowed to be empty", name)),
            "pattern" if !user_pattern => (
                2,
                format!("\"{}\" must only contain alpha-numeric characters", name),
            ),
            "minLength" => (
                3,
                format!(
                    "\"{}\" length must be at least {} characters long",
                    name,
                    self.min.unwrap_or(1)
                ),
            ),
            "maxLength" => (
                4,
                format!(
                    "\"{}\" length must be less than or equal to {} characters long",
                    name,
                    self.max.unwrap_or_default()
                ),
            ),
            "format" => (5, format!("\"{}\" must be a valid email", name)),
            "pattern" => (
                6,
                format!(
                    "\"{}\" with value \"{}\" fails to match the required pattern: /{}/",
                    name,
                    s,
                    self.pattern.as_ref().map_or("", Regex::as_str)
                ),
            ),
            _ => return None,
        };
        Some(described)
    }
}

/// Declaration of a flat object of string fields.
///
/// Unknown keys are rejected unless [`allow_unknown`](Self::allow_unknown)
/// is set. Validation reports only the first broken rule unless
/// [`abort_early(false)`](Self::abort_early). Call [`build`](Self::build)
/// to get a [`Schema`].
#[derive(Debug, Clone)]
pub struct ObjectSchema {
    fields: Vec<(String, StringRule)>,
    allow_unknown: bool,
    abort_early: bool,
}

impl Default for ObjectSchema {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            allow_unknown: false,
            abort_early: true,
        }
    }
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field. Fields are reported in declaration order.
    pub fn field(mut self, name: &str, rule: StringRule) -> Self {
        self.fields.retain(|(n, _)| n != name);
        self.fields.push((name.to_string(), rule));
        self
    }

    pub fn allow_unknown(mut self, allow: bool) -> Self {
        self.allow_unknown = allow;
        self
    }

    pub fn abort_early(mut self, abort: bool) -> Self {
        self.abort_early = abort;
        self
    }

    /// The JSON Schema (draft 7) document for this declaration.
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|(name, rule)| (name.clone(), rule.to_schema()))
            .collect();
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|(_, rule)| rule.required)
            .map(|(name, _)| name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": self.allow_unknown,
        })
    }

    /// Compile the declaration.
    pub fn build(self) -> Result<ObjectValidator, SchemaError> {
        let document = self.to_json_schema();
        let validator = jsonschema::options()
            .with_draft(Draft::Draft7)
            .should_validate_formats(true)
            .build(&document)?;

        Ok(ObjectValidator {
            fields: self.fields,
            abort_early: self.abort_early,
            document,
            validator,
        })
    }
}

/// Compiled [`ObjectSchema`].
pub struct ObjectValidator {
    fields: Vec<(String, StringRule)>,
    abort_early: bool,
    document: Value,
    validator: Validator,
}

impl ObjectValidator {
    /// The compiled JSON Schema document.
    pub fn document(&self) -> &Value {
        &self.document
    }

    fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|(n, _)| n == name)
    }
}

impl fmt::Debug for ObjectValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectValidator")
            .field("document", &self.document)
            .field("abort_early", &self.abort_early)
            .finish()
    }
}

impl Schema for ObjectValidator {
    fn validate(&self, data: &Map<String, Value>) -> Result<(), ValidationFailure> {
        let instance = Value::Object(data.clone());
        let unknown = self.fields.len();
        // (declaration index, rank, error); unknown keys sort last
        let mut found: Vec<(usize, u8, FieldError)> = Vec::new();

        for err in self.validator.iter_errors(&instance) {
            match &err.kind {
                ValidationErrorKind::Required { property } => {
                    let Some(name) = property.as_str() else { continue };
                    let index = self.field_index(name).unwrap_or(unknown);
                    found.push((index, 0, FieldError::new(name, format!("\"{}\" is required", name))));
                }
                ValidationErrorKind::AdditionalProperties { unexpected } => {
                    for key in unexpected {
                        found.push((unknown, 0, FieldError::new(key, format!("\"{}\" is not allowed", key))));
                    }
                }
                _ => {
                    let name = pointer_field(&err.instance_path.to_string());
                    let Some(index) = self.field_index(&name) else { continue };
                    let schema_path = err.schema_path.to_string();
                    let keyword = schema_path.rsplit('/').next().unwrap_or_default();

                    let rule = &self.fields[index].1;
                    let (rank, message) = rule
                        .describe(&name, keyword, schema_path.contains("/allOf/"), data.get(&name))
                        .unwrap_or_else(|| (u8::MAX, format!("\"{}\" {}", name, err)));
                    found.push((index, rank, FieldError::new(&name, message)));
                }
            }
        }

        found.sort_by_key(|(index, rank, _)| (*index, *rank));

        // One error per declared field.
        let mut details = Vec::new();
        let mut last = None;
        for (index, _, error) in found {
            if index != unknown && last == Some(index) {
                continue;
            }
            last = Some(index);
            details.push(error);
        }

        if self.abort_early {
            details.truncate(1);
        }

        if details.is_empty() {
            Ok(())
        } else {
            Err(ValidationFailure::new(details))
        }
    }
}

/// Top-level property name from a JSON pointer such as `/firstName`.
fn pointer_field(pointer: &str) -> String {
    let segment = pointer.trim_start_matches('/');
    let segment = segment.split('/').next().unwrap_or_default();
    segment.replace("~1", "/").replace("~0", "~")
}
