//! Server configuration
//!
//! Loaded from an optional TOML file, then overridden from the command line
//! and environment (see [`crate::cli`]). Every field has a default, so an
//! empty file is a valid configuration.

use roadmap_core::CoreConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Value of `database` selecting the in-memory stores
pub const MEMORY_DATABASE: &str = "memory";

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Error responses carry provider and store detail
    Development,
    /// Error responses carry generic messages only
    #[default]
    Production,
}

impl Environment {
    /// Check if error detail may be shown to callers
    #[inline]
    #[must_use]
    pub fn exposes_detail(self) -> bool {
        self == Environment::Development
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(ConfigError::Invalid(format!("unknown environment '{other}'"))),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Environment::Development => "development",
            Environment::Production => "production",
        })
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(ConfigError::Invalid(format!("unknown log format '{other}'"))),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Output format
    pub format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: "info,roadmap_core=debug,roadmap_server=debug".to_string(),
        }
    }
}

/// OpenAI-compatible generator settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// API root, without the `/chat/completions` suffix
    pub base_url: String,
    /// Bearer token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Model name
    pub model: String,
    /// Upper bound on one generation, in seconds
    pub timeout_secs: u64,
}

impl fmt::Debug for GeneratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 90,
        }
    }
}

impl GeneratorConfig {
    /// Timeout as a duration
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind: SocketAddr,
    /// SQLite file path, or `memory`
    pub database: String,
    /// Deployment environment
    pub environment: Environment,
    /// Honour `X-Forwarded-For` for the quota identity
    pub trust_forwarded_for: bool,
    /// Maximum accepted request body, in bytes
    pub max_body_bytes: u64,
    /// Logging
    pub log: LogConfig,
    /// Content generator
    pub generator: GeneratorConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            database: "data/roadmap.db".to_string(),
            environment: Environment::Production,
            trust_forwarded_for: false,
            max_body_bytes: 2 * 1024 * 1024,
            log: LogConfig::default(),
            generator: GeneratorConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// Returns error if the text is not valid TOML for this structure
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check cross-field constraints
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] describing the first problem found
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.trim().is_empty() {
            return Err(ConfigError::Invalid("database must not be empty".into()));
        }
        if self.generator.timeout_secs == 0 {
            return Err(ConfigError::Invalid("generator.timeout_secs must be positive".into()));
        }
        if !self.generator.base_url.starts_with("http://")
            && !self.generator.base_url.starts_with("https://")
        {
            return Err(ConfigError::Invalid(format!(
                "generator.base_url '{}' is not an http(s) URL",
                self.generator.base_url
            )));
        }
        Ok(())
    }

    /// Check if the in-memory stores are selected
    #[inline]
    #[must_use]
    pub fn uses_memory_store(&self) -> bool {
        self.database.trim().eq_ignore_ascii_case(MEMORY_DATABASE)
    }

    /// Core settings derived from this configuration
    #[must_use]
    pub fn core(&self) -> CoreConfig {
        CoreConfig::new().with_generation_timeout(self.generator.timeout())
    }

    /// With listen address
    #[inline]
    #[must_use]
    pub fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }

    /// With database path (or `memory`)
    #[inline]
    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// With environment
    #[inline]
    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// With forwarded-for trust
    #[inline]
    #[must_use]
    pub fn with_trust_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    /// With log format
    #[inline]
    #[must_use]
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log.format = format;
        self
    }

    /// With generator API key
    #[inline]
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.generator.api_key = Some(key.into());
        self
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file unreadable
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// TOML syntax or shape error
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML rendering failed
    #[error("cannot render config: {0}")]
    Render(#[from] toml::ser::Error),

    /// Semantically invalid value
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_is_default() {
        assert_eq!(ServerConfig::from_toml_str("").unwrap(), ServerConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = ServerConfig::from_toml_str(
            r#"
            database = "memory"
            environment = "development"

            [log]
            format = "json"

            [generator]
            model = "gpt-4o"
            timeout_secs = 30
            "#,
        )
        .unwrap();
        assert!(config.uses_memory_store());
        assert!(config.environment.exposes_detail());
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.log.filter, LogConfig::default().filter);
        assert_eq!(config.generator.model, "gpt-4o");
        assert_eq!(config.core().generation_timeout(), Duration::from_secs(30));
        assert_eq!(config.bind, ServerConfig::default().bind);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            ServerConfig::from_toml_str("environment = \"staging\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            ServerConfig::from_toml_str("[generator]\ntimeout_secs = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ServerConfig::from_toml_str("[generator]\nbase_url = \"ftp://x\""),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn toml_round_trip_omits_missing_key() {
        let config = ServerConfig::new().with_database("memory");
        let text = config.to_toml().unwrap();
        assert!(!text.contains("api_key"));
        assert_eq!(ServerConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = ServerConfig::new().with_api_key("sk-secret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ServerConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn environment_and_format_parse() {
        assert_eq!("DEV".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("loud".parse::<LogFormat>().is_err());
    }
}
