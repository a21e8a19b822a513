//! Configuration composition pipeline.
//!
//! Responsibilities:
//! - Normalize composer options (working directory, env cascade, sources).
//! - Run the dotenv cascade, seed and register the env accessor.
//! - Load and merge sources left to right, resolve placeholders, and gate
//!   the result through the schema.
//!
//! Does NOT handle:
//! - Dotenv syntax (see `layerconf-dotenv`) or file decoding (`loader.rs`).
//!
//! Invariants / Assumptions:
//! - Sources merge strictly in the order they were added.
//! - Cascade path errors are swallowed only when the env option is marked
//!   optional.
//! - Composition mutates the process environment and must not run
//!   concurrently with other composers.

use std::env;
use std::path::PathBuf;

use layerconf_dotenv::{DEFAULT_DEBUG_KEY, Dotenv, DotenvError, VARS_SENTINEL};
use serde_json::{Map, Value};

use crate::accessor::EnvAccessor;
use crate::constants::{
    DEFAULT_ENV_KEY, DEFAULT_ENV_PATH, DEFAULT_ENVIRONMENT, DEFAULT_PROD_ENVS, DEFAULT_TEST_ENVS,
};
use crate::error::ConfigError;
use crate::loader::load_source;
use crate::merge::merge;
use crate::placeholder::resolve;
use crate::schema::Schema;
use crate::source::Source;

/// Options controlling the environment bootstrap.
#[derive(Debug, Clone)]
pub struct EnvOptions {
    /// Master switch; a record with `enabled: false` skips the cascade.
    pub enabled: bool,
    /// Base path of the `.env` family, resolved against `cwd`.
    pub path: PathBuf,
    /// Key naming the active environment.
    pub env_key: String,
    /// When set, `boot_env` derives and normalizes this debug flag.
    pub debug_key: Option<String>,
    /// Environment assumed when the env key is unset after the base file.
    pub default_env: String,
    /// Environments whose `.env.local` file is skipped.
    pub test_envs: Vec<String>,
    /// Environments treated as production for the debug flag.
    pub prod_envs: Vec<String>,
    /// Overwrite variables the host already set.
    pub override_existing: bool,
    /// Tolerate a missing base file.
    pub optional: bool,
    /// When set, force-assigned to the env key before the cascade runs.
    pub environment: Option<String>,
    /// Names pre-registered on the accessor.
    pub known_keys: Vec<String>,
}

impl Default for EnvOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from(DEFAULT_ENV_PATH),
            env_key: DEFAULT_ENV_KEY.to_string(),
            debug_key: None,
            default_env: DEFAULT_ENVIRONMENT.to_string(),
            test_envs: DEFAULT_TEST_ENVS.iter().map(|s| s.to_string()).collect(),
            prod_envs: DEFAULT_PROD_ENVS.iter().map(|s| s.to_string()).collect(),
            override_existing: false,
            optional: true,
            environment: None,
            known_keys: Vec::new(),
        }
    }
}

/// A validated configuration plus the accessor that produced it.
#[derive(Debug)]
pub struct Composed<T> {
    pub config: T,
    pub env: EnvAccessor,
}

/// Builder composing a validated configuration from layered sources.
#[derive(Debug)]
pub struct Composer<S> {
    schema: S,
    cwd: Option<PathBuf>,
    env: Option<EnvOptions>,
    env_disabled: bool,
    defaults: Option<Map<String, Value>>,
    sources: Vec<Source>,
}

impl<S: Schema> Composer<S> {
    /// Start composing against `schema`.
    pub fn new(schema: S) -> Self {
        Self {
            schema,
            cwd: None,
            env: None,
            env_disabled: false,
            defaults: None,
            sources: Vec::new(),
        }
    }

    /// Resolve relative paths against `cwd` instead of the process cwd.
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Configure the environment bootstrap explicitly.
    pub fn env(mut self, options: EnvOptions) -> Self {
        self.env = Some(options);
        self
    }

    /// Skip the environment bootstrap entirely.
    pub fn skip_env(mut self) -> Self {
        self.env_disabled = true;
        self
    }

    /// Seed the tree with inline defaults before any source merges.
    pub fn defaults(mut self, defaults: Map<String, Value>) -> Self {
        self.defaults = Some(defaults);
        self
    }

    /// Append one source layer.
    pub fn source(mut self, source: impl Into<Source>) -> Self {
        self.sources.push(source.into());
        self
    }

    /// Append source layers in order.
    pub fn sources<I, T>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Source>,
    {
        self.sources.extend(sources.into_iter().map(Into::into));
        self
    }

    /// Run the pipeline: cascade, load, merge, resolve, validate.
    pub fn compose(self) -> Result<Composed<S::Output>, ConfigError> {
        let cwd = match self.cwd {
            Some(cwd) => cwd,
            None => env::current_dir()?,
        };

        let mut accessor = EnvAccessor::new();
        if !self.env_disabled {
            let options = self.env.unwrap_or_default();
            if options.enabled {
                run_cascade(&options, &cwd, &mut accessor)?;
            }
        }

        let mut tree = Value::Object(self.defaults.unwrap_or_default());
        for source in &self.sources {
            let loaded = load_source(source, &cwd)?.map(Value::Object);
            tree = merge(&tree, loaded.as_ref());
        }

        let resolved = resolve(&tree, &mut accessor)?;

        match self.schema.safe_parse(&resolved) {
            Ok(config) => Ok(Composed {
                config,
                env: accessor,
            }),
            Err(issues) => Err(ConfigError::Validation { issues }),
        }
    }
}

/// Run the dotenv cascade and register the keys it touches.
fn run_cascade(
    options: &EnvOptions,
    cwd: &std::path::Path,
    accessor: &mut EnvAccessor,
) -> Result<(), ConfigError> {
    accessor.register(options.known_keys.iter().cloned());
    accessor.register(env::vars().map(|(name, _)| name));

    if let Some(environment) = &options.environment {
        // SAFETY: composition is documented as single-threaded with respect
        // to process-environment mutation.
        unsafe {
            env::set_var(&options.env_key, environment);
        }
    }

    let debug_key = options.debug_key.as_deref().unwrap_or(DEFAULT_DEBUG_KEY);
    let dotenv = Dotenv::with_keys(options.env_key.as_str(), debug_key)
        .prod_envs(options.prod_envs.iter().cloned());

    let base = if options.path.is_absolute() {
        options.path.clone()
    } else {
        cwd.join(&options.path)
    };

    let outcome = if options.debug_key.is_some() {
        dotenv.boot_env(&base, &options.default_env, &options.test_envs, options.override_existing)
    } else {
        dotenv.load_env(
            &base,
            None,
            &options.default_env,
            &options.test_envs,
            options.override_existing,
        )
    };
    match outcome {
        Ok(()) => {}
        Err(DotenvError::PathNotFound { path }) if options.optional => {
            tracing::warn!(path = %path.display(), "environment file missing, cascade skipped");
        }
        Err(error) => return Err(error.into()),
    }

    if let Ok(sentinel) = env::var(VARS_SENTINEL) {
        accessor.register(sentinel.split(',').filter(|name| !name.is_empty()).map(str::to_string));
    }
    accessor.register([options.env_key.clone()]);
    if let Some(debug_key) = &options.debug_key {
        accessor.register([debug_key.clone()]);
    }

    Ok(())
}
