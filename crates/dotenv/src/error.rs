//! Error types for dotenv parsing and loading.
//!
//! Responsibilities:
//! - Define error variants for syntax violations, unreadable paths, and I/O.
//! - Carry exact positions (file, line, column) for syntax errors.
//!
//! Does NOT handle:
//! - Errors from configuration composition (see the `layerconf` crate).
//!
//! Invariants:
//! - `Format` errors name the violated rule and the position where lexing
//!   stopped; they never echo surrounding value bytes.
//! - `PathNotFound` is raised for a missing required base file or a path
//!   that is a directory.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while parsing or loading `.env` files.
#[derive(Error, Debug)]
pub enum DotenvError {
    /// The file violates the dotenv grammar.
    #[error("{message} in \"{path}\" at line {line} column {column}")]
    Format {
        message: String,
        path: String,
        line: usize,
        column: usize,
    },

    /// The base path does not exist, or is not a readable file.
    #[error("unable to read the \"{}\" environment file", .path.display())]
    PathNotFound { path: PathBuf },

    /// Reading an existing file failed.
    #[error("failed to read the \"{}\" environment file", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `$(...)` expansion was attempted on a platform without a POSIX shell.
    #[error("resolving commands requires a POSIX shell and is not supported on this platform")]
    CommandsUnsupported,
}

impl DotenvError {
    /// Position of a `Format` error as `(line, column)`, if applicable.
    pub fn position(&self) -> Option<(usize, usize)> {
        match self {
            DotenvError::Format { line, column, .. } => Some((*line, *column)),
            _ => None,
        }
    }
}
