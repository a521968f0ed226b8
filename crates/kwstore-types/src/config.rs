//! Configuration loading for the keyword store.
//!
//! Layered precedence, lowest to highest:
//! 1. Built-in defaults (k1=1.2, b=0.75, epsilon=0.25)
//! 2. Legacy configuration mapping
//! 3. Environment variables (REFINIRE_RAG_BM25S_*)
//! 4. Explicit overrides
//!
//! [`resolve_config`] is a pure function of its three inputs; the process
//! environment is only read when [`EnvSource::Process`] is passed.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;

/// Prefix for environment variables, e.g. `REFINIRE_RAG_BM25S_K1`.
pub const ENV_PREFIX: &str = "REFINIRE_RAG_BM25S";

pub const DEFAULT_K1: f64 = 1.2;
pub const DEFAULT_B: f64 = 0.75;
pub const DEFAULT_EPSILON: f64 = 0.25;

/// BM25 variant requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScoringMethod {
    #[default]
    #[serde(rename = "lucene")]
    Lucene,
    #[serde(rename = "robertson")]
    Robertson,
    #[serde(rename = "atire")]
    Atire,
    #[serde(rename = "bm25l")]
    Bm25L,
    #[serde(rename = "bm25+")]
    Bm25Plus,
}

impl ScoringMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoringMethod::Lucene => "lucene",
            ScoringMethod::Robertson => "robertson",
            ScoringMethod::Atire => "atire",
            ScoringMethod::Bm25L => "bm25l",
            ScoringMethod::Bm25Plus => "bm25+",
        }
    }
}

impl fmt::Display for ScoringMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScoringMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lucene" => Ok(ScoringMethod::Lucene),
            "robertson" => Ok(ScoringMethod::Robertson),
            "atire" => Ok(ScoringMethod::Atire),
            "bm25l" => Ok(ScoringMethod::Bm25L),
            "bm25+" | "bm25plus" => Ok(ScoringMethod::Bm25Plus),
            other => Err(ConfigError::invalid("method", other)),
        }
    }
}

/// Base tokenizer used for both documents and queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenizerKind {
    /// Morphological segmentation (lindera, UniDic)
    #[default]
    Japanese,
    /// Split on non-alphanumeric characters
    Simple,
}

impl TokenizerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenizerKind::Japanese => "japanese",
            TokenizerKind::Simple => "simple",
        }
    }
}

impl fmt::Display for TokenizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenizerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "japanese" | "ja" | "lindera" => Ok(TokenizerKind::Japanese),
            "simple" | "default" | "standard" => Ok(TokenizerKind::Simple),
            other => Err(ConfigError::invalid("tokenizer", other)),
        }
    }
}

/// Validated keyword store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bm25Config {
    /// Term frequency saturation, >= 0
    pub k1: f64,

    /// Document length normalization, 0.0-1.0
    pub b: f64,

    /// IDF floor for the Robertson/ATIRE variants
    pub epsilon: f64,

    /// Snapshot file used by save/load
    #[serde(default)]
    pub index_path: Option<String>,

    #[serde(default)]
    pub method: ScoringMethod,

    /// Snowball stemmer language, e.g. "english"
    #[serde(default)]
    pub stemmer: Option<String>,

    /// Stop word list, e.g. "en" or "ja"
    #[serde(default)]
    pub stopwords: Option<String>,

    #[serde(default)]
    pub tokenizer: TokenizerKind,
}

impl Default for Bm25Config {
    fn default() -> Self {
        Self {
            k1: DEFAULT_K1,
            b: DEFAULT_B,
            epsilon: DEFAULT_EPSILON,
            index_path: None,
            method: ScoringMethod::default(),
            stemmer: None,
            stopwords: None,
            tokenizer: TokenizerKind::default(),
        }
    }
}

impl Bm25Config {
    /// Build from defaults plus explicit overrides, ignoring the environment.
    pub fn from_overrides(overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        resolve_config(overrides, EnvSource::Vars(HashMap::new()), None)
    }

    /// Validate ranges. Construction paths call this before returning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.k1.is_finite() || self.k1 < 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "k1",
                value: self.k1,
                expected: ">= 0.0",
            });
        }
        if !self.b.is_finite() || !(0.0..=1.0).contains(&self.b) {
            return Err(ConfigError::OutOfRange {
                field: "b",
                value: self.b,
                expected: "0.0..=1.0",
            });
        }
        if !self.epsilon.is_finite() {
            return Err(ConfigError::OutOfRange {
                field: "epsilon",
                value: self.epsilon,
                expected: "a finite number",
            });
        }
        Ok(())
    }

    /// Snapshot path, if configured.
    pub fn index_path(&self) -> Option<&Path> {
        self.index_path.as_deref().map(Path::new)
    }

    /// Configuration as a JSON object, for hosts that expect a mapping.
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// Explicit, highest-precedence configuration values.
///
/// Every field is optional; unset fields fall through to the environment,
/// the legacy mapping and finally the defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub k1: Option<f64>,
    pub b: Option<f64>,
    pub epsilon: Option<f64>,
    pub index_path: Option<String>,
    pub method: Option<String>,
    pub stemmer: Option<String>,
    pub stopwords: Option<String>,
    pub tokenizer: Option<String>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn k1(mut self, k1: f64) -> Self {
        self.k1 = Some(k1);
        self
    }

    pub fn b(mut self, b: f64) -> Self {
        self.b = Some(b);
        self
    }

    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = Some(epsilon);
        self
    }

    pub fn index_path(mut self, path: impl Into<String>) -> Self {
        self.index_path = Some(path.into());
        self
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn stemmer(mut self, stemmer: impl Into<String>) -> Self {
        self.stemmer = Some(stemmer.into());
        self
    }

    pub fn stopwords(mut self, stopwords: impl Into<String>) -> Self {
        self.stopwords = Some(stopwords.into());
        self
    }

    pub fn tokenizer(mut self, tokenizer: impl Into<String>) -> Self {
        self.tokenizer = Some(tokenizer.into());
        self
    }
}

impl From<&Bm25Config> for ConfigOverrides {
    /// Pin every field of an existing configuration.
    fn from(config: &Bm25Config) -> Self {
        Self {
            k1: Some(config.k1),
            b: Some(config.b),
            epsilon: Some(config.epsilon),
            index_path: config.index_path.clone(),
            method: Some(config.method.to_string()),
            stemmer: config.stemmer.clone(),
            stopwords: config.stopwords.clone(),
            tokenizer: Some(config.tokenizer.to_string()),
        }
    }
}

/// Where environment-layer values come from.
#[derive(Debug, Clone)]
pub enum EnvSource {
    /// The current process environment
    Process,
    /// A fixed set of variables (full names, including the prefix)
    Vars(HashMap<String, String>),
}

impl EnvSource {
    pub fn vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        EnvSource::Vars(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Intermediate shape deserialized from the merged layers.
#[derive(Debug, Deserialize)]
struct RawConfig {
    k1: f64,
    b: f64,
    epsilon: f64,
    #[serde(default)]
    index_path: Option<String>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    stemmer: Option<String>,
    #[serde(default)]
    stopwords: Option<String>,
    #[serde(default)]
    tokenizer: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl TryFrom<RawConfig> for Bm25Config {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let method = match non_blank(raw.method) {
            Some(m) => m.parse()?,
            None => ScoringMethod::default(),
        };
        let tokenizer = match non_blank(raw.tokenizer) {
            Some(t) => t.parse()?,
            None => TokenizerKind::default(),
        };

        let config = Bm25Config {
            k1: raw.k1,
            b: raw.b,
            epsilon: raw.epsilon,
            index_path: non_blank(raw.index_path),
            method,
            stemmer: non_blank(raw.stemmer),
            stopwords: non_blank(raw.stopwords),
            tokenizer,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Resolve the effective configuration from three sources.
///
/// Precedence: `overrides` > `env` > `legacy` > defaults. The result is
/// validated; out-of-range k1/b fail here.
pub fn resolve_config(
    overrides: &ConfigOverrides,
    env: EnvSource,
    legacy: Option<&Map<String, Value>>,
) -> Result<Bm25Config, ConfigError> {
    let mut builder = Config::builder()
        .set_default("k1", DEFAULT_K1)?
        .set_default("b", DEFAULT_B)?
        .set_default("epsilon", DEFAULT_EPSILON)?;

    if let Some(legacy) = legacy {
        let json = serde_json::to_string(legacy).map_err(|e| ConfigError::Load(e.to_string()))?;
        builder = builder.add_source(File::from_str(&json, FileFormat::Json));
    }

    let environment = Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .try_parsing(true);
    let environment = match env {
        EnvSource::Process => environment,
        EnvSource::Vars(vars) => environment.source(Some(vars)),
    };
    builder = builder.add_source(environment);

    let config = builder
        .set_override_option("k1", overrides.k1)?
        .set_override_option("b", overrides.b)?
        .set_override_option("epsilon", overrides.epsilon)?
        .set_override_option("index_path", overrides.index_path.clone())?
        .set_override_option("method", overrides.method.clone())?
        .set_override_option("stemmer", overrides.stemmer.clone())?
        .set_override_option("stopwords", overrides.stopwords.clone())?
        .set_override_option("tokenizer", overrides.tokenizer.clone())?
        .build()?;

    let raw: RawConfig = config.try_deserialize()?;
    Bm25Config::try_from(raw)
}
