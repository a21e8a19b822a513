//! File loading and format dispatch for configuration sources.
//!
//! Responsibilities:
//! - Resolve descriptor paths against the working directory.
//! - Read and decode JSON, YAML, and INI files into object trees.
//! - Enforce the object-at-root rule and the optional-file tolerance.
//!
//! Does NOT handle:
//! - Placeholder substitution (see `placeholder.rs`); trees leave this
//!   module raw.
//! - Merging between layers (see `merge.rs`).
//!
//! Invariants:
//! - Parse failures always carry the resolved file path.
//! - An absent file is an error unless the descriptor marked it optional.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::source::{FileSource, Format, Source, value_kind};

/// Load one source into an object tree.
///
/// Returns `None` only for an absent optional file.
pub(crate) fn load_source(
    source: &Source,
    cwd: &Path,
) -> Result<Option<Map<String, Value>>, ConfigError> {
    match source {
        Source::Inline(tree) => Ok(Some(tree.clone())),
        Source::Path(path) => load_file(&FileSource::new(path.clone()), cwd),
        Source::File(file) => load_file(file, cwd),
    }
}

fn load_file(file: &FileSource, cwd: &Path) -> Result<Option<Map<String, Value>>, ConfigError> {
    let path = resolve_path(&file.path, cwd);
    if !path.is_file() {
        if file.optional {
            tracing::debug!(path = %path.display(), "optional configuration file absent, skipping");
            return Ok(None);
        }
        return Err(ConfigError::FileNotFound { path });
    }

    let format = match file.format.or_else(|| Format::from_extension(&path)) {
        Some(format) => format,
        None => {
            return Err(ConfigError::Parse {
                path,
                cause: Some("unsupported configuration format".into()),
            });
        }
    };

    let text = std::fs::read_to_string(&path)?;
    let value = match format {
        Format::Json => serde_json::from_str(&text).map_err(|e| parse_error(&path, e))?,
        Format::Yaml => serde_yaml::from_str(&text).map_err(|e| parse_error(&path, e))?,
        Format::Ini => ini_to_tree(&text, &path)?,
    };

    match value {
        Value::Object(tree) => {
            tracing::debug!(path = %path.display(), "loaded configuration file");
            Ok(Some(tree))
        }
        other => Err(ConfigError::Parse {
            path,
            cause: Some(
                format!("expected an object at the document root, found {}", value_kind(&other))
                    .into(),
            ),
        }),
    }
}

fn resolve_path(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

fn parse_error(path: &Path, cause: impl std::error::Error + Send + Sync + 'static) -> ConfigError {
    ConfigError::Parse {
        path: path.to_path_buf(),
        cause: Some(Box::new(cause)),
    }
}

/// Decode INI text; sections become nested objects, sectionless properties
/// land at the root. All INI scalars are strings.
fn ini_to_tree(text: &str, path: &Path) -> Result<Value, ConfigError> {
    let document = ini::Ini::load_from_str(text).map_err(|e| parse_error(path, e))?;

    let mut root = Map::new();
    for (section, properties) in document.iter() {
        match section {
            Some(name) => {
                let mut tree = Map::new();
                for (key, value) in properties.iter() {
                    tree.insert(key.to_string(), Value::String(value.to_string()));
                }
                root.insert(name.to_string(), Value::Object(tree));
            }
            None => {
                for (key, value) in properties.iter() {
                    root.insert(key.to_string(), Value::String(value.to_string()));
                }
            }
        }
    }

    Ok(Value::Object(root))
}
