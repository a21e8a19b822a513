//! Centralized defaults for the configuration composer.
//!
//! These mirror the documented defaults of the env option; keeping them in
//! one place avoids magic-string duplication between the composer and its
//! tests.

// =============================================================================
// Environment Cascade Defaults
// =============================================================================

/// Default base path of the `.env` file family, resolved against `cwd`.
pub const DEFAULT_ENV_PATH: &str = ".env";

/// Default key naming the active environment.
pub const DEFAULT_ENV_KEY: &str = layerconf_dotenv::DEFAULT_ENV_KEY;

/// Environment assumed when the env key is unset after the base file loads.
pub const DEFAULT_ENVIRONMENT: &str = "dev";

/// Environments whose `.env.local` file is skipped.
pub const DEFAULT_TEST_ENVS: &[&str] = &["test"];

/// Environments treated as production when deriving the debug flag.
pub const DEFAULT_PROD_ENVS: &[&str] = &["prod"];

// =============================================================================
// Placeholder Syntax
// =============================================================================

/// Opening delimiter of an environment placeholder.
pub const PLACEHOLDER_OPEN: &str = "%env(";

/// Closing delimiter of an environment placeholder.
pub const PLACEHOLDER_CLOSE: &str = ")%";
