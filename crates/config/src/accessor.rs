//! Registered, typed view over the process environment.
//!
//! Responsibilities:
//! - Funnel every environment read of the composer through one place.
//! - Track the set of known keys so callers can enumerate what the
//!   configuration actually consumed.
//! - Raise `MissingEnv` for required reads of unset variables.
//!
//! Does NOT handle:
//! - Writing the process environment (see `layerconf-dotenv`).
//! - Placeholder token parsing (see `placeholder.rs`).
//!
//! Invariants:
//! - Every key returned by a successful read is registered afterwards.
//! - `register` is additive and idempotent.

use std::collections::BTreeSet;
use std::env;

use crate::error::ConfigError;

/// Typed view over the process environment with key registration.
#[derive(Debug, Default, Clone)]
pub struct EnvAccessor {
    registered: BTreeSet<String>,
}

impl EnvAccessor {
    /// Create an accessor with no registered keys.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an accessor pre-seeded with `keys`.
    pub fn with_known_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut accessor = Self::new();
        accessor.register(keys);
        accessor
    }

    /// Register additional keys; already-registered names are kept.
    pub fn register<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.registered.extend(names.into_iter().map(Into::into));
    }

    /// Read a required variable, registering the key on success.
    pub fn read(&mut self, name: &str) -> Result<String, ConfigError> {
        match env::var(name) {
            Ok(value) => {
                self.register([name]);
                Ok(value)
            }
            Err(_) => Err(ConfigError::MissingEnv(name.to_string())),
        }
    }

    /// Read a variable, falling back to `default` when unset.
    pub fn read_or(&mut self, name: &str, default: &str) -> String {
        self.register([name]);
        env::var(name).unwrap_or_else(|_| default.to_string())
    }

    /// Read an optional variable, registering the key when present.
    pub fn optional(&mut self, name: &str) -> Option<String> {
        let value = env::var(name).ok()?;
        self.register([name]);
        Some(value)
    }

    /// True when `name` is registered or currently set in the environment.
    pub fn has(&self, name: &str) -> bool {
        self.registered.contains(name) || env::var_os(name).is_some()
    }

    /// Sorted union of registered keys and current environment keys.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: BTreeSet<String> = self.registered.clone();
        keys.extend(env::vars().map(|(name, _)| name));
        keys.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    #[serial]
    fn read_registers_the_key_and_errors_when_unset() {
        let _lock = crate::test_util::global_test_lock().lock().unwrap();
        temp_env::with_vars([("ACCESSOR_SET", Some("value"))], || {
            let mut accessor = EnvAccessor::new();
            assert_eq!(accessor.read("ACCESSOR_SET").unwrap(), "value");
            assert!(accessor.keys().contains(&"ACCESSOR_SET".to_string()));

            let err = accessor.read("ACCESSOR_UNSET_FOR_SURE").unwrap_err();
            assert!(matches!(err, ConfigError::MissingEnv(name) if name == "ACCESSOR_UNSET_FOR_SURE"));
        });
    }

    #[test]
    #[serial]
    fn read_or_falls_back_to_the_default() {
        let _lock = crate::test_util::global_test_lock().lock().unwrap();
        temp_env::with_vars_unset(["ACCESSOR_FALLBACK"], || {
            let mut accessor = EnvAccessor::new();
            assert_eq!(accessor.read_or("ACCESSOR_FALLBACK", "dft"), "dft");
            assert!(accessor.has("ACCESSOR_FALLBACK"), "defaulted reads still register");
        });
    }

    #[test]
    #[serial]
    fn optional_reads_register_only_on_hit() {
        let _lock = crate::test_util::global_test_lock().lock().unwrap();
        temp_env::with_vars([("ACCESSOR_OPT", Some("here"))], || {
            let mut accessor = EnvAccessor::new();
            assert_eq!(accessor.optional("ACCESSOR_OPT").as_deref(), Some("here"));
            assert_eq!(accessor.optional("ACCESSOR_OPT_MISSING"), None);

            let keys = accessor.keys();
            assert!(keys.contains(&"ACCESSOR_OPT".to_string()));
            assert!(!keys.contains(&"ACCESSOR_OPT_MISSING".to_string()));
        });
    }

    #[test]
    fn register_is_idempotent() {
        let mut accessor = EnvAccessor::with_known_keys(["A", "B"]);
        accessor.register(["B", "C"]);
        accessor.register(["C"]);

        let registered: Vec<String> = accessor
            .keys()
            .into_iter()
            .filter(|k| ["A", "B", "C"].contains(&k.as_str()))
            .collect();
        assert_eq!(registered, vec!["A", "B", "C"]);
    }
}
