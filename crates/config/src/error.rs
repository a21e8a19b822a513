//! Error types for configuration composition.
//!
//! Responsibilities:
//! - Define error variants for every composition failure: missing files,
//!   parser failures, placeholder problems, schema rejection.
//! - Bridge dotenv errors into the unified error type.
//!
//! Does NOT handle:
//! - Dotenv syntax diagnostics (see the `layerconf-dotenv` crate).
//!
//! Invariants:
//! - Parse failures always carry the offending file path; the underlying
//!   parser error rides along as the source when one exists.
//! - Error messages never echo configuration values other than the single
//!   raw token a placeholder failed to coerce.

use std::path::PathBuf;
use thiserror::Error;

use crate::schema::Issue;

/// Errors that can occur while composing configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required configuration file does not exist.
    #[error("configuration file not found: {}", .path.display())]
    FileNotFound { path: PathBuf },

    /// A file could not be decoded into an object tree.
    #[error("failed to parse configuration file {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        cause: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The schema rejected the resolved tree.
    #[error("configuration failed schema validation ({} issue(s))", .issues.len())]
    Validation { issues: Vec<Issue> },

    /// A placeholder or required read named an unset variable.
    #[error("missing required environment variable: {0}")]
    MissingEnv(String),

    /// A `number`-typed placeholder whose raw value is not numeric.
    #[error("environment variable {name} is not numeric: {value:?}")]
    InvalidPlaceholder { name: String, value: String },

    /// The composer was configured inconsistently.
    #[error("invalid composer options: {message}")]
    InvalidOptions { message: String },

    #[error(transparent)]
    Dotenv(#[from] layerconf_dotenv::DotenvError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
