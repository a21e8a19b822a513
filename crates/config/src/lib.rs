//! Typed layered configuration for long-lived server processes.
//!
//! This crate composes a validated configuration value from layered
//! sources — inline defaults, JSON/YAML/INI files, and typed
//! `%env(TYPE:NAME)%` placeholders — after bootstrapping the process
//! environment from a `.env` file family (see `layerconf-dotenv`).
//!
//! ```no_run
//! use layerconf::{Composer, EnvOptions, TypedSchema};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct AppConfig {
//!     database: Database,
//! }
//!
//! #[derive(Deserialize)]
//! struct Database {
//!     host: String,
//!     port: u16,
//! }
//!
//! # fn main() -> Result<(), layerconf::ConfigError> {
//! let composed = Composer::new(TypedSchema::<AppConfig>::new())
//!     .env(EnvOptions::default())
//!     .source("config/base.yaml")
//!     .source("config/local.json")
//!     .compose()?;
//! println!("db host: {}", composed.config.database.host);
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), warn(clippy::unwrap_used))]

pub mod constants;

mod accessor;
mod composer;
mod error;
mod loader;
mod merge;
mod placeholder;
mod schema;
mod source;

pub use accessor::EnvAccessor;
pub use composer::{Composed, Composer, EnvOptions};
pub use error::ConfigError;
pub use merge::merge;
pub use schema::{Issue, Schema, TypedSchema};
pub use source::{FileSource, Format, Source};

// The dotenv engine is part of the public surface: callers match on its
// errors and cooperating cascades key on the sentinel names.
pub use layerconf_dotenv::{Dotenv, DotenvError, PATH_SENTINEL, VARS_SENTINEL};
