//! Typed environment placeholder resolution.
//!
//! Responsibilities:
//! - Walk a merged tree and substitute `%env(NAME)%` and
//!   `%env(TYPE:NAME)%` tokens in string values.
//! - Coerce `number` and `boolean` placeholders into native scalars.
//!
//! Does NOT handle:
//! - Loading or merging trees; resolution is a single post-merge pass.
//! - Transitive substitution: resolver output is never re-scanned.
//!
//! Invariants:
//! - A string that is exactly one placeholder becomes the coerced native
//!   value; embedded placeholders stringify into the surrounding text.
//! - Every lookup goes through the shared accessor, so missing variables
//!   surface as `MissingEnv`.
//! - Text that merely resembles a placeholder (bad type, bad name charset)
//!   is left untouched.

use serde_json::{Map, Value};

use crate::accessor::EnvAccessor;
use crate::constants::{PLACEHOLDER_CLOSE, PLACEHOLDER_OPEN};
use crate::error::ConfigError;

/// Resolve every placeholder in `tree`, producing a new tree.
pub(crate) fn resolve(tree: &Value, env: &mut EnvAccessor) -> Result<Value, ConfigError> {
    match tree {
        Value::Object(entries) => {
            let mut out = Map::with_capacity(entries.len());
            for (key, value) in entries {
                out.insert(key.clone(), resolve(value, env)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(resolve(item, env)?);
            }
            Ok(Value::Array(out))
        }
        Value::String(text) => resolve_string(text, env),
        scalar => Ok(scalar.clone()),
    }
}

/// Requested coercion of a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Coercion {
    String,
    Number,
    Boolean,
}

impl Coercion {
    fn from_tag(tag: &str) -> Option<Coercion> {
        match tag.to_ascii_lowercase().as_str() {
            "string" => Some(Coercion::String),
            "number" => Some(Coercion::Number),
            "boolean" => Some(Coercion::Boolean),
            _ => None,
        }
    }
}

/// One recognized token within a string, by byte range.
struct Token<'a> {
    start: usize,
    end: usize,
    coercion: Coercion,
    name: &'a str,
}

fn resolve_string(text: &str, env: &mut EnvAccessor) -> Result<Value, ConfigError> {
    let tokens = scan_tokens(text);
    if tokens.is_empty() {
        return Ok(Value::String(text.to_string()));
    }

    // An exact single-token match produces the native value.
    if let [token] = tokens.as_slice()
        && token.start == 0
        && token.end == text.len()
    {
        return coerce(token, env);
    }

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for token in &tokens {
        out.push_str(&text[cursor..token.start]);
        out.push_str(&stringify(&coerce(token, env)?));
        cursor = token.end;
    }
    out.push_str(&text[cursor..]);

    Ok(Value::String(out))
}

/// Find every well-formed placeholder token in `text`.
fn scan_tokens(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut from = 0;

    while let Some(found) = text[from..].find(PLACEHOLDER_OPEN) {
        let start = from + found;
        let inner_start = start + PLACEHOLDER_OPEN.len();

        let Some(close) = text[inner_start..].find(PLACEHOLDER_CLOSE) else {
            break;
        };
        let inner = &text[inner_start..inner_start + close];
        let end = inner_start + close + PLACEHOLDER_CLOSE.len();

        if let Some((coercion, name)) = parse_inner(inner) {
            tokens.push(Token {
                start,
                end,
                coercion,
                name,
            });
            from = end;
        } else {
            // Not a token; resume after the opener so overlaps are found.
            from = inner_start;
        }
    }

    tokens
}

/// Split `TYPE:NAME` or `NAME`, validating both halves.
fn parse_inner(inner: &str) -> Option<(Coercion, &str)> {
    let (coercion, name) = match inner.split_once(':') {
        Some((tag, name)) => (Coercion::from_tag(tag)?, name),
        None => (Coercion::String, inner),
    };

    let valid_name = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_');
    valid_name.then_some((coercion, name))
}

fn coerce(token: &Token<'_>, env: &mut EnvAccessor) -> Result<Value, ConfigError> {
    let raw = env.read(token.name)?;
    match token.coercion {
        Coercion::String => Ok(Value::String(raw)),
        Coercion::Number => coerce_number(token.name, &raw),
        Coercion::Boolean => Ok(Value::Bool(coerce_boolean(&raw))),
    }
}

/// Parse integers exactly and fall back to finite floats.
///
/// A raw value that parses as neither is rejected here rather than leaking
/// a non-finite sentinel the tree type cannot represent.
fn coerce_number(name: &str, raw: &str) -> Result<Value, ConfigError> {
    if let Ok(int) = raw.parse::<i64>() {
        return Ok(Value::Number(int.into()));
    }
    if let Ok(float) = raw.parse::<f64>()
        && let Some(number) = serde_json::Number::from_f64(float)
    {
        return Ok(Value::Number(number));
    }
    Err(ConfigError::InvalidPlaceholder {
        name: name.to_string(),
        value: raw.to_string(),
    })
}

/// `true/1/yes/y/on` and `false/0/no/n/off` are fixed spellings; anything
/// else follows the truthiness of the non-empty string.
fn coerce_boolean(raw: &str) -> bool {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "on" => true,
        "false" | "0" | "no" | "n" | "off" => false,
        other => !other.is_empty(),
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        other => other.to_string(),
    }
}
