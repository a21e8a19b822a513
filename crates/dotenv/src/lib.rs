//! Dotenv parsing and environment bootstrap for layerconf.
//!
//! This crate owns the `.env` grammar — quoting, escapes, variable
//! interpolation, optional command substitution — and the multi-file
//! cascade that populates the process environment with override-aware
//! precedence. Typed configuration composition lives in the `layerconf`
//! crate, which drives this one.

#![cfg_attr(not(test), warn(clippy::unwrap_used))]

mod cascade;
mod error;
mod lexer;

pub use cascade::{
    DEFAULT_DEBUG_KEY, DEFAULT_ENV_KEY, Dotenv, PATH_SENTINEL, VARS_SENTINEL, bool_cast,
};
pub use error::DotenvError;

#[cfg(test)]
pub(crate) mod test_util {
    use std::sync::{Mutex, OnceLock};

    pub fn global_test_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }
}
