//! Multi-file cascade and process-environment population.
//!
//! Responsibilities:
//! - Resolve a base path into the ordered list of `.env` files to load
//!   (`.env` / `.env.dist`, `.env.local`, `.env.<env>`, `.env.<env>.local`).
//! - Populate parsed values into the process environment under the
//!   override rules, maintaining the loaded-by-us sentinel.
//! - Derive the debug flag during `boot_env`.
//!
//! Does NOT handle:
//! - Lexing a single file (see `lexer.rs`).
//! - Typed reads of the resulting environment (see the `layerconf` crate).
//!
//! Invariants / Assumptions:
//! - A variable not listed in `NODE_DOTENV_VARS` is host-owned and is never
//!   overwritten unless the caller passes `override_existing`.
//! - Every key the cascade writes is recorded in `NODE_DOTENV_VARS`.
//! - Environment bootstrap runs before other threads are spawned; the
//!   process-env writes below are not synchronized.

use std::collections::HashSet;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::error::DotenvError;
use crate::lexer;

/// Process-env key listing every variable populated by this library.
pub const VARS_SENTINEL: &str = "NODE_DOTENV_VARS";

/// Process-env key recording the last base path seen by the cascade.
pub const PATH_SENTINEL: &str = "NODE_DOTENV_PATH";

/// Default key naming the active environment.
pub const DEFAULT_ENV_KEY: &str = "APP_ENV";

/// Default key naming the debug flag derived by `boot_env`.
pub const DEFAULT_DEBUG_KEY: &str = "APP_DEBUG";

/// Parser and loader for `.env` file families.
///
/// The value is cheap to construct and holds no parse state; every call
/// reads the process environment as it currently stands.
#[derive(Debug, Clone)]
pub struct Dotenv {
    env_key: String,
    debug_key: String,
    prod_envs: Vec<String>,
    expand_commands: bool,
}

impl Default for Dotenv {
    fn default() -> Self {
        Self::new()
    }
}

impl Dotenv {
    /// Create a loader with the `APP_ENV` / `APP_DEBUG` key pair.
    pub fn new() -> Self {
        Self {
            env_key: DEFAULT_ENV_KEY.to_string(),
            debug_key: DEFAULT_DEBUG_KEY.to_string(),
            prod_envs: vec!["prod".to_string()],
            expand_commands: false,
        }
    }

    /// Override the environment and debug key names.
    pub fn with_keys(env_key: impl Into<String>, debug_key: impl Into<String>) -> Self {
        Self {
            env_key: env_key.into(),
            debug_key: debug_key.into(),
            ..Self::new()
        }
    }

    /// Set the environment names treated as production by `boot_env`.
    pub fn prod_envs<I, S>(mut self, envs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prod_envs = envs.into_iter().map(Into::into).collect();
        self
    }

    /// Enable `$(...)` command substitution for every parsed file.
    pub fn expand_commands(mut self, enabled: bool) -> Self {
        self.expand_commands = enabled;
        self
    }

    /// The key naming the active environment.
    pub fn env_key(&self) -> &str {
        &self.env_key
    }

    /// Parse a dotenv text without touching the process environment.
    ///
    /// `path` is used for diagnostics only.
    pub fn parse(
        &self,
        data: &str,
        path: &str,
    ) -> Result<IndexMap<String, String>, DotenvError> {
        lexer::parse(data, path, self.expand_commands)
    }

    /// Load one file, keeping any variables the host already set.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<(), DotenvError> {
        self.do_load(path.as_ref(), false)
    }

    /// Load one file, overwriting existing variables.
    pub fn load_override(&self, path: impl AsRef<Path>) -> Result<(), DotenvError> {
        self.do_load(path.as_ref(), true)
    }

    /// Load the `.env` file family for `base` in precedence order.
    ///
    /// `env_key` overrides the key configured on this loader. The active
    /// environment is re-read after `.env.local`, which may change it.
    pub fn load_env(
        &self,
        base: impl AsRef<Path>,
        env_key: Option<&str>,
        default_env: &str,
        test_envs: &[String],
        override_existing: bool,
    ) -> Result<(), DotenvError> {
        let base = base.as_ref();
        let key = env_key.unwrap_or(&self.env_key);

        let dist = path_with_suffix(base, ".dist");
        if base.is_file() || !dist.is_file() {
            self.do_load(base, override_existing)?;
        } else {
            self.do_load(&dist, override_existing)?;
        }

        // SAFETY: environment bootstrap is documented as single-threaded.
        unsafe {
            env::set_var(PATH_SENTINEL, base.as_os_str());
        }

        let mut env_name = match env::var(key) {
            Ok(name) => name,
            Err(_) => {
                let mut seed = IndexMap::new();
                seed.insert(key.to_string(), default_env.to_string());
                self.populate(&seed, override_existing);
                default_env.to_string()
            }
        };

        if !test_envs.iter().any(|test| test == &env_name) {
            let local = path_with_suffix(base, ".local");
            if local.is_file() {
                self.do_load(&local, override_existing)?;
                env_name = env::var(key).unwrap_or(env_name);
            }
        }

        if env_name == "local" {
            return Ok(());
        }

        let per_env = path_with_suffix(base, &format!(".{env_name}"));
        if per_env.is_file() {
            self.do_load(&per_env, override_existing)?;
        }

        let per_env_local = path_with_suffix(base, &format!(".{env_name}.local"));
        if per_env_local.is_file() {
            self.do_load(&per_env_local, override_existing)?;
        }

        Ok(())
    }

    /// Run `load_env`, then derive and normalize the debug flag.
    ///
    /// An unset debug key becomes `"1"` outside the production environments
    /// and `"0"` inside them; a pre-existing value is normalized through
    /// [`bool_cast`].
    pub fn boot_env(
        &self,
        base: impl AsRef<Path>,
        default_env: &str,
        test_envs: &[String],
        override_existing: bool,
    ) -> Result<(), DotenvError> {
        self.load_env(base, None, default_env, test_envs, override_existing)?;

        let debug = match env::var(&self.debug_key) {
            Ok(existing) => bool_cast(&existing),
            Err(_) => {
                let env_name =
                    env::var(&self.env_key).unwrap_or_else(|_| default_env.to_string());
                !self.prod_envs.contains(&env_name)
            }
        };

        // SAFETY: environment bootstrap is documented as single-threaded.
        unsafe {
            env::set_var(&self.debug_key, if debug { "1" } else { "0" });
        }

        Ok(())
    }

    /// Write parsed values into the process environment.
    ///
    /// A key is written when `override_existing` is set, when it is listed
    /// in the loaded-by-us sentinel, or when it is currently unset. Every
    /// written key is recorded back into the sentinel.
    pub fn populate(&self, values: &IndexMap<String, String>, override_existing: bool) {
        let mut loaded: Vec<String> = env::var(VARS_SENTINEL)
            .map(|raw| {
                raw.split(',')
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let owned: HashSet<String> = loaded.iter().cloned().collect();

        let mut updated = false;
        for (name, value) in values {
            let is_owned = owned.contains(name);
            if !override_existing && !is_owned && env::var_os(name).is_some() {
                continue;
            }
            // SAFETY: environment bootstrap is documented as single-threaded.
            unsafe {
                env::set_var(name, value);
            }
            if !is_owned {
                loaded.push(name.clone());
                updated = true;
            }
        }

        if updated {
            // SAFETY: environment bootstrap is documented as single-threaded.
            unsafe {
                env::set_var(VARS_SENTINEL, loaded.join(","));
            }
        }
    }

    fn do_load(&self, path: &Path, override_existing: bool) -> Result<(), DotenvError> {
        let data = read_env_file(path)?;
        let values = self.parse(&data, &path.display().to_string())?;
        tracing::debug!(path = %path.display(), count = values.len(), "loaded environment file");
        self.populate(&values, override_existing);
        Ok(())
    }
}

/// Interpret an environment value as a boolean.
///
/// `1`, `true`, `yes`, and `on` are true; `0`, `false`, `no`, `off`, and the
/// empty string are false; any other non-empty value is true.
pub fn bool_cast(value: &str) -> bool {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "" | "0" | "false" | "no" | "off" => false,
        _ => true,
    }
}

/// `base` with `suffix` appended to its final component.
fn path_with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut joined = OsString::from(base.as_os_str());
    joined.push(suffix);
    PathBuf::from(joined)
}

fn read_env_file(path: &Path) -> Result<String, DotenvError> {
    if !path.is_file() {
        return Err(DotenvError::PathNotFound {
            path: path.to_path_buf(),
        });
    }
    std::fs::read_to_string(path).map_err(|source| DotenvError::Io {
        path: path.to_path_buf(),
        source,
    })
}
