use serde::de::DeserializeOwned;

use crate::logging;

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// The log level to use, this is a tracing env filter
    pub level: String,

    /// What logging mode we should use
    pub mode: logging::Mode,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            mode: logging::Mode::Default,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// The path to the TLS certificate
    pub cert: String,

    /// The path to the TLS private key
    pub key: String,
}

/// Loads a config struct by layering an optional TOML file (named by the
/// `<PREFIX>_CONFIG_FILE` environment variable) under `<PREFIX>_`-prefixed
/// environment variables, with `__` separating nested keys.
pub fn load<C: DeserializeOwned>(env_prefix: &str) -> Result<C, config::ConfigError> {
    let mut builder = config::Config::builder();

    if let Ok(file) = std::env::var(format!("{env_prefix}_CONFIG_FILE")) {
        builder = builder.add_source(config::File::with_name(&file));
    }

    builder
        .add_source(config::Environment::with_prefix(env_prefix).separator("__"))
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq, serde::Deserialize)]
    #[serde(default)]
    struct TestConfig {
        logging: LoggingConfig,
        tls: Option<TlsConfig>,
    }

    #[test]
    fn load_falls_back_to_defaults() {
        let config: TestConfig = load("ELEV8_TEST_UNSET").unwrap();
        assert_eq!(config, TestConfig::default());
        assert_eq!(config.logging.level, "info");
    }
}
