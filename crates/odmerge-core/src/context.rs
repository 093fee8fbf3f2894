/*
 * context.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Shared key/value store for one pipeline run.
 */

//! Shared pipeline context.
//!
//! Transforms communicate through a single [`Context`] per run. Keys follow
//! the `<Producer>:<variable>` convention; [`Context::key`] builds them.

use crate::schema::SchemaConfig;
use crate::{EngineError, Result};
use std::collections::HashMap;
use std::fmt;

/// Producer prefixes used by the built-in transforms.
pub mod producer {
    pub const GET_ATTRIBUTE: &str = "GetAttribute";
    pub const SET_ATTRIBUTE: &str = "SetAttribute";
    pub const PAGEBREAK_STYLE: &str = "AddpagebreakStyle";
    pub const MAILMERGE: &str = "Mailmerge";
    pub const CONCATENATE: &str = "Concatenate";
}

/// A context value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Int(i64),
}

impl Value {
    /// Integer view of the value; text is parsed.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Int(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

/// Mutable store shared by every transform in one run.
#[derive(Debug, Clone)]
pub struct Context {
    schema: SchemaConfig,
    values: HashMap<String, Value>,
}

impl Context {
    pub fn new(schema: SchemaConfig) -> Self {
        Self {
            schema,
            values: HashMap::new(),
        }
    }

    /// Namespaced key: `producer:variable`.
    pub fn key(producer: &str, variable: &str) -> String {
        format!("{}:{}", producer, variable)
    }

    pub fn schema(&self) -> &SchemaConfig {
        &self.schema
    }

    /// Read a key.
    ///
    /// # Errors
    ///
    /// [`EngineError::ContextKeyMissing`] when no earlier transform wrote it.
    pub fn get(&self, key: &str) -> Result<&Value> {
        self.values
            .get(key)
            .ok_or_else(|| EngineError::ContextKeyMissing(key.to_string()))
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Read a key that must hold an integer.
    pub fn get_int(&self, key: &str) -> Result<i64> {
        let value = self.get(key)?;
        value.as_int().ok_or_else(|| EngineError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    /// Read a key as text.
    pub fn get_text(&self, key: &str) -> Result<String> {
        self.get(key).map(Value::to_string)
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.values.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Generation;

    fn ctx() -> Context {
        Context::new(SchemaConfig::new(Generation::OpenOffice1))
    }

    #[test]
    fn test_missing_key_is_an_error() {
        let ctx = ctx();
        let err = ctx.get("GetAttribute:page-count").unwrap_err();
        assert!(matches!(err, EngineError::ContextKeyMissing(ref k) if k == "GetAttribute:page-count"));
    }

    #[test]
    fn test_set_get_has() {
        let mut ctx = ctx();
        let key = Context::key(producer::GET_ATTRIBUTE, "page-count");
        assert_eq!(key, "GetAttribute:page-count");
        assert!(!ctx.has(&key));
        ctx.set(key.clone(), "3");
        assert!(ctx.has(&key));
        assert_eq!(ctx.get_int(&key).unwrap(), 3);
        ctx.set(key.clone(), 7_i64);
        assert_eq!(ctx.get_text(&key).unwrap(), "7");
    }

    #[test]
    fn test_non_integer_value() {
        let mut ctx = ctx();
        ctx.set("a:b", "many");
        assert!(matches!(
            ctx.get_int("a:b").unwrap_err(),
            EngineError::InvalidValue { .. }
        ));
    }
}
