//! Construction options for the store adapters.

use kwstore_types::{resolve_config, Bm25Config, ConfigOverrides, EnvSource, Metadata};

use crate::error::AdapterError;

/// Inputs to configuration resolution, plus construction behavior.
///
/// Precedence when resolved: `overrides` > `env` > `legacy` > defaults.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Explicit values, highest precedence
    pub overrides: ConfigOverrides,

    /// Legacy configuration mapping, lowest precedence above defaults
    pub legacy: Option<Metadata>,

    /// Source of `REFINIRE_RAG_BM25S_*` variables
    pub env: EnvSource,

    /// Load the snapshot at `index_path` during construction
    pub load_existing: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            overrides: ConfigOverrides::default(),
            legacy: None,
            env: EnvSource::Process,
            load_existing: true,
        }
    }
}

impl StoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options that reproduce `config` exactly, ignoring the environment.
    pub fn from_config(config: &Bm25Config) -> Self {
        Self::new()
            .with_overrides(ConfigOverrides::from(config))
            .without_env()
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_legacy(mut self, legacy: Metadata) -> Self {
        self.legacy = Some(legacy);
        self
    }

    pub fn with_env(mut self, env: EnvSource) -> Self {
        self.env = env;
        self
    }

    /// Ignore the process environment.
    pub fn without_env(self) -> Self {
        self.with_env(EnvSource::Vars(Default::default()))
    }

    pub fn load_existing(mut self, load: bool) -> Self {
        self.load_existing = load;
        self
    }

    /// Resolve and validate the effective configuration.
    pub fn resolve(&self) -> Result<Bm25Config, AdapterError> {
        Ok(resolve_config(
            &self.overrides,
            self.env.clone(),
            self.legacy.as_ref(),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let options = StoreOptions::default();
        assert!(options.load_existing);
        assert!(options.legacy.is_none());
        assert!(matches!(options.env, EnvSource::Process));

        let config = StoreOptions::new().without_env().resolve().unwrap();
        assert_eq!(config, Bm25Config::default());
    }

    #[test]
    fn test_precedence() {
        let legacy = match json!({"k1": 1.8, "b": 0.85, "epsilon": 0.3}) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };
        let config = StoreOptions::new()
            .with_legacy(legacy)
            .with_env(EnvSource::vars([("REFINIRE_RAG_BM25S_B", "0.5")]))
            .with_overrides(ConfigOverrides::new().epsilon(0.1))
            .resolve()
            .unwrap();
        assert_eq!(config.k1, 1.8);
        assert_eq!(config.b, 0.5);
        assert_eq!(config.epsilon, 0.1);
    }

    #[test]
    fn test_from_config() {
        let config = Bm25Config::from_overrides(&ConfigOverrides::new().k1(1.5).b(0.8)).unwrap();
        let resolved = StoreOptions::from_config(&config).resolve().unwrap();
        assert_eq!(resolved, config);
    }

    #[test]
    fn test_invalid_config() {
        let result = StoreOptions::new()
            .without_env()
            .with_overrides(ConfigOverrides::new().b(2.0))
            .resolve();
        assert!(matches!(result, Err(AdapterError::Config(_))));
    }
}
