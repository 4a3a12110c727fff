//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `gadgethub.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::time::Duration;

use gadgethub_adapter_virtual::VirtualConfig;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Client liveness and acknowledgement settings.
    pub clients: ClientsConfig,
    /// Local driver toggles.
    pub integrations: IntegrationsConfig,
    /// Outbound message bus.
    pub bus: BusConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Client settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ClientsConfig {
    /// Seconds without activity after which a client counts as inactive.
    pub activity_timeout_secs: u64,
    /// Milliseconds to wait for a ping acknowledgement.
    pub ack_timeout_ms: u64,
}

/// Local driver toggles.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct IntegrationsConfig {
    /// Enable the virtual/demo driver.
    pub virtual_enabled: bool,
    /// Interval between two polls of the simulated receiver.
    pub poll_interval_ms: u64,
}

/// Bus configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Messages buffered per listener before it starts lagging.
    pub capacity: usize,
}

impl Config {
    /// Load configuration from `gadgethub.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("gadgethub.toml")?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("GADGETHUB_HOST") {
            self.server.host = val;
        }
        if let Some(val) = var("GADGETHUB_PORT")
            && let Ok(port) = val.parse()
        {
            self.server.port = port;
        }
        if let Some(val) = var("GADGETHUB_BIND")
            && let Some((host, port)) = val.rsplit_once(':')
        {
            self.server.host = host.to_string();
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Some(val) = var("GADGETHUB_CLIENT_TIMEOUT_SECS")
            && let Ok(secs) = val.parse()
        {
            self.clients.activity_timeout_secs = secs;
        }
        if let Some(val) = var("GADGETHUB_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.clients.activity_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "client activity timeout must be non-zero".to_string(),
            ));
        }
        if self.integrations.poll_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "poll interval must be non-zero".to_string(),
            ));
        }
        if self.bus.capacity == 0 {
            return Err(ConfigError::Validation(
                "bus capacity must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    #[must_use]
    pub fn activity_timeout(&self) -> Duration {
        Duration::from_secs(self.clients.activity_timeout_secs)
    }

    #[must_use]
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.clients.ack_timeout_ms)
    }

    /// Settings for the virtual driver.
    #[must_use]
    pub fn virtual_driver(&self) -> VirtualConfig {
        VirtualConfig {
            poll_interval: Duration::from_millis(self.integrations.poll_interval_ms),
            ..VirtualConfig::default()
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "gadgethubd=info,gadgethub=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for ClientsConfig {
    fn default() -> Self {
        Self {
            activity_timeout_secs: 60,
            ack_timeout_ms: 5_000,
        }
    }
}

impl Default for IntegrationsConfig {
    fn default() -> Self {
        Self {
            virtual_enabled: true,
            poll_interval_ms: 500,
        }
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.activity_timeout(), Duration::from_secs(60));
        assert_eq!(config.ack_timeout(), Duration::from_secs(5));
        assert_eq!(config.bus.capacity, 256);
        assert!(config.integrations.virtual_enabled);
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = "
            [server]
            host = '127.0.0.1'
            port = 9090

            [logging]
            filter = 'debug'

            [clients]
            activity_timeout_secs = 30
            ack_timeout_ms = 250

            [integrations]
            virtual_enabled = false
            poll_interval_ms = 100

            [bus]
            capacity = 16
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.activity_timeout(), Duration::from_secs(30));
        assert_eq!(config.ack_timeout(), Duration::from_millis(250));
        assert!(!config.integrations.virtual_enabled);
        assert_eq!(
            config.virtual_driver().poll_interval,
            Duration::from_millis(100)
        );
        assert_eq!(config.bus.capacity, 16);
    }

    #[test]
    fn should_parse_partial_toml_with_defaults() {
        let toml = "
            [server]
            port = 8080
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.clients.activity_timeout_secs, 60);
        assert!(config.integrations.virtual_enabled);
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }

    #[test]
    fn should_apply_env_overrides() {
        let mut config = Config::default();
        config.apply_env_overrides(env(&[
            ("GADGETHUB_BIND", "127.0.0.1:4000"),
            ("GADGETHUB_CLIENT_TIMEOUT_SECS", "15"),
            ("GADGETHUB_LOG", "debug"),
        ]));
        assert_eq!(config.bind_addr(), "127.0.0.1:4000");
        assert_eq!(config.activity_timeout(), Duration::from_secs(15));
        assert_eq!(config.logging.filter, "debug");
    }

    #[test]
    fn should_prefer_rust_log_over_gadgethub_log() {
        let mut config = Config::default();
        config.apply_env_overrides(env(&[("GADGETHUB_LOG", "debug"), ("RUST_LOG", "trace")]));
        assert_eq!(config.logging.filter, "trace");
    }

    #[test]
    fn should_ignore_unparsable_port_override() {
        let mut config = Config::default();
        config.apply_env_overrides(env(&[("GADGETHUB_PORT", "http")]));
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn should_reject_zero_port() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_zero_timeouts_and_intervals() {
        let mut config = Config::default();
        config.clients.activity_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.integrations.poll_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.bus.capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_accept_defaults() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn should_format_custom_bind_addr() {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 9090;
        assert_eq!(config.bind_addr(), "127.0.0.1:9090");
    }
}
