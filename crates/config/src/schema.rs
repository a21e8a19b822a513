//! Schema validation boundary.
//!
//! Responsibilities:
//! - Define the `Schema` trait the composer hands resolved trees to.
//! - Provide `TypedSchema`, a serde-deserialization adapter covering the
//!   common case of validating into a typed struct.
//!
//! Does NOT handle:
//! - Building or transforming trees; a schema only judges the final value.
//!
//! Invariants:
//! - `safe_parse` never panics on malformed input; rejection is a list of
//!   issues.

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::Value;

/// One reason a schema rejected the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// Dotted path into the tree, empty when unknown.
    pub path: String,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Validator for a resolved configuration tree.
pub trait Schema {
    type Output;

    /// Judge `value`, returning the typed configuration or the reasons it
    /// was rejected.
    fn safe_parse(&self, value: &Value) -> Result<Self::Output, Vec<Issue>>;
}

/// Schema backed by serde deserialization into `T`.
#[derive(Debug)]
pub struct TypedSchema<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedSchema<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for TypedSchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Schema for TypedSchema<T>
where
    T: DeserializeOwned,
{
    type Output = T;

    fn safe_parse(&self, value: &Value) -> Result<T, Vec<Issue>> {
        serde_json::from_value(value.clone()).map_err(|error| {
            vec![Issue {
                path: String::new(),
                message: error.to_string(),
            }]
        })
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Server {
        host: String,
        port: u16,
    }

    #[test]
    fn typed_schema_accepts_matching_trees() {
        let schema = TypedSchema::<Server>::new();
        let parsed = schema.safe_parse(&json!({"host": "h", "port": 80})).unwrap();
        assert_eq!(parsed, Server { host: "h".to_string(), port: 80 });
    }

    #[test]
    fn typed_schema_rejects_with_issues() {
        let schema = TypedSchema::<Server>::new();
        let issues = schema.safe_parse(&json!({"host": "h", "port": "not-a-port"})).unwrap_err();
        assert_eq!(issues.len(), 1);
        assert!(!issues[0].message.is_empty());
    }
}
