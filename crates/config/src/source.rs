//! Source descriptors for the configuration composer.
//!
//! Responsibilities:
//! - Define the three descriptor variants: bare path, file record, and
//!   inline tree.
//! - Infer the file format from the path extension.
//!
//! Does NOT handle:
//! - Reading or parsing files (see `loader.rs`).
//!
//! Invariants:
//! - Inline sources are object trees by construction.
//! - `Format` inference is extension-based only; content sniffing is never
//!   attempted.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::ConfigError;

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
    Ini,
}

impl Format {
    /// Infer a format from a path extension, case-insensitively.
    pub fn from_extension(path: &Path) -> Option<Format> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "json" => Some(Format::Json),
            "yaml" | "yml" => Some(Format::Yaml),
            "ini" => Some(Format::Ini),
            _ => None,
        }
    }
}

/// A file-backed source with explicit options.
#[derive(Debug, Clone)]
pub struct FileSource {
    pub path: PathBuf,
    /// Overrides extension-based inference when set.
    pub format: Option<Format>,
    /// Suppresses the missing-file error.
    pub optional: bool,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            format: None,
            optional: false,
        }
    }

    pub fn format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }
}

/// One layer of configuration input.
#[derive(Debug, Clone)]
pub enum Source {
    /// A path whose format is inferred from its extension.
    Path(PathBuf),
    /// A file record with explicit format/optional handling.
    File(FileSource),
    /// A caller-supplied tree, cloned defensively at load time.
    Inline(Map<String, Value>),
}

impl Source {
    /// An inline source from a caller-built object.
    pub fn inline(tree: Map<String, Value>) -> Self {
        Source::Inline(tree)
    }
}

impl From<&str> for Source {
    fn from(path: &str) -> Self {
        Source::Path(PathBuf::from(path))
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Source::Path(path)
    }
}

impl From<FileSource> for Source {
    fn from(file: FileSource) -> Self {
        Source::File(file)
    }
}

impl From<Map<String, Value>> for Source {
    fn from(tree: Map<String, Value>) -> Self {
        Source::Inline(tree)
    }
}

impl TryFrom<Value> for Source {
    type Error = ConfigError;

    /// Accepts only object-rooted values, mirroring the loader's root rule.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(tree) => Ok(Source::Inline(tree)),
            other => Err(ConfigError::InvalidOptions {
                message: format!("inline sources must be objects, found {}", value_kind(&other)),
            }),
        }
    }
}

/// Human-readable name of a tree node's shape.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
