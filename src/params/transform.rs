//! Value transforms for use with [`ParameterSet::try_apply`](super::ParameterSet::try_apply).

use serde_json::Value;

use crate::symbolic::{codes, SymbolicError};

/// Clean a proper name: remove all whitespace, upper-case the first character.
///
/// Null and non-string values are rejected with `call.badArgument`.
///
/// ```
/// use dispatchkit::params::clean_proper_name;
/// use serde_json::json;
///
/// assert_eq!(clean_proper_name(&json!("  bob")).unwrap(), json!("Bob"));
/// assert_eq!(clean_proper_name(&json!("mc donald")).unwrap(), json!("Mcdonald"));
/// ```
pub fn clean_proper_name(value: &Value) -> Result<Value, SymbolicError> {
    match value {
        Value::String(s) => Ok(Value::String(clean_proper_name_str(s))),
        Value::Null => Err(SymbolicError::new(
            codes::CALL_BAD_ARGUMENT,
            "null argument passed (requires string)",
        )),
        _ => Err(SymbolicError::new(
            codes::CALL_BAD_ARGUMENT,
            "non-string argument passed (requires string)",
        )),
    }
}

/// String form of [`clean_proper_name`].
pub fn clean_proper_name_str(s: &str) -> String {
    let mut chars = s.chars().filter(|c| !c.is_whitespace());
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clean_proper_name_str() {
        assert_eq!(clean_proper_name_str("  bob"), "Bob");
        assert_eq!(clean_proper_name_str("smith "), "Smith");
        assert_eq!(clean_proper_name_str("\tjean luc\n"), "Jeanluc");
        assert_eq!(clean_proper_name_str("Already"), "Already");
        assert_eq!(clean_proper_name_str("émile"), "Émile");
    }

    #[test]
    fn test_whitespace_only_becomes_empty() {
        assert_eq!(clean_proper_name_str("   "), "");
        assert_eq!(clean_proper_name(&json!("")).unwrap(), json!(""));
    }

    #[test]
    fn test_null_is_bad_argument() {
        let err = clean_proper_name(&Value::Null).unwrap_err();
        assert_eq!(err.code(), codes::CALL_BAD_ARGUMENT);
        assert_eq!(err.message(), "null argument passed (requires string)");
    }

    #[test]
    fn test_non_string_is_bad_argument() {
        let err = clean_proper_name(&json!(42)).unwrap_err();
        assert_eq!(err.code(), codes::CALL_BAD_ARGUMENT);
    }
}
