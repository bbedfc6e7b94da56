use serde::Deserialize;
use std::net::{AddrParseError, SocketAddr};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub discord: DiscordConfig,
    #[serde(default)]
    pub reconciler: ReconcilerConfig,
    #[serde(default)]
    pub attribution: AttributionConfig,
    pub security: SecurityConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl From<&DatabaseConfig> for persistence::db::DatabaseConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            connect_timeout_secs: config.connect_timeout_secs,
            idle_timeout_secs: config.idle_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Connection to the chat platform's REST API.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    /// When false an in-process gateway stands in for the platform.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Bot token, sent as `Authorization: Bot <token>`.
    #[serde(default)]
    pub token: String,

    #[serde(default = "default_discord_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_discord_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReconcilerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds between reconciliation passes.
    #[serde(default = "default_reconcile_interval")]
    pub interval_secs: u64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_reconcile_interval(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttributionConfig {
    /// Platform events buffered before ingestion applies back-pressure.
    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,

    /// Grant the default role on arrival even while the member is gated.
    #[serde(default)]
    pub default_role_while_pending: bool,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            event_queue_capacity: default_event_queue_capacity(),
            default_role_while_pending: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// SHA-256 hex digest of the admin API key.
    #[serde(default)]
    pub admin_api_key_hash: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_purge_amount")]
    pub max_purge_amount: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_purge_amount: default_max_purge_amount(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_database_url() -> String {
    "sqlite://invites.db?mode=rwc".to_string()
}
fn default_max_connections() -> u32 {
    5
}
fn default_min_connections() -> u32 {
    1
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_true() -> bool {
    true
}
fn default_discord_api_base_url() -> String {
    "https://discord.com/api/v10".to_string()
}
fn default_discord_timeout() -> u64 {
    15
}
fn default_reconcile_interval() -> u64 {
    10
}
fn default_event_queue_capacity() -> usize {
    1024
}
fn default_max_purge_amount() -> usize {
    100
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with RI__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("RI").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Builds the config from embedded defaults and overrides only, so tests
    /// do not depend on the working directory.
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "127.0.0.1"
            port = 8080
            request_timeout_secs = 30

            [database]
            url = "sqlite::memory:"
            max_connections = 1
            min_connections = 1

            [logging]
            level = "info"
            format = "json"

            [discord]
            enabled = false
            token = ""

            [reconciler]
            enabled = true
            interval_secs = 10

            [attribution]
            event_queue_capacity = 64
            default_role_while_pending = false

            [security]
            admin_api_key_hash = ""

            [limits]
            max_purge_amount = 100
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        // Validation is skipped so tests can use partial configs.
        builder.build()?.try_deserialize()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "RI__DATABASE__URL must not be empty".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        if self.reconciler.interval_secs == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "reconciler.interval_secs must be positive".to_string(),
            ));
        }

        if self.attribution.event_queue_capacity == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "attribution.event_queue_capacity must be positive".to_string(),
            ));
        }

        if self.discord.enabled && self.discord.token.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "RI__DISCORD__TOKEN environment variable must be set".to_string(),
            ));
        }

        // An empty hash disables the admin API.
        let key_hash = &self.security.admin_api_key_hash;
        if !key_hash.is_empty() && !shared::crypto::is_sha256_hex(key_hash) {
            return Err(ConfigValidationError::InvalidValue(
                "security.admin_api_key_hash must be a SHA-256 hex digest".to_string(),
            ));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_HASH: &str = "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8";

    #[test]
    fn test_config_load_with_defaults() {
        let config = Config::load_for_test(&[]).expect("Failed to load config");

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.reconciler.interval_secs, 10);
        assert!(!config.attribution.default_role_while_pending);
        assert_eq!(config.limits.max_purge_amount, 100);
        assert_eq!(config.discord.api_base_url, "https://discord.com/api/v10");
    }

    #[test]
    fn test_config_override() {
        let config = Config::load_for_test(&[
            ("server.port", "9000"),
            ("reconciler.interval_secs", "30"),
            ("attribution.default_role_while_pending", "true"),
        ])
        .expect("Failed to load config");

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.reconciler.interval_secs, 30);
        assert!(config.attribution.default_role_while_pending);
    }

    #[test]
    fn test_validation_accepts_complete_config() {
        let config = Config::load_for_test(&[("security.admin_api_key_hash", KEY_HASH)])
            .expect("Failed to load config");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_requires_token_when_enabled() {
        let config = Config::load_for_test(&[
            ("security.admin_api_key_hash", KEY_HASH),
            ("discord.enabled", "true"),
        ])
        .expect("Failed to load config");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("RI__DISCORD__TOKEN"));
    }

    #[test]
    fn test_validation_rejects_zero_interval() {
        let config = Config::load_for_test(&[
            ("security.admin_api_key_hash", KEY_HASH),
            ("reconciler.interval_secs", "0"),
        ])
        .expect("Failed to load config");
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("interval_secs"));
    }

    #[test]
    fn test_validation_rejects_bad_key_hash() {
        let config = Config::load_for_test(&[("security.admin_api_key_hash", "not-a-hash")])
            .expect("Failed to load config");
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("admin_api_key_hash"));
    }

    #[test]
    fn test_validation_accepts_disabled_admin_api() {
        let config = Config::load_for_test(&[]).expect("Failed to load config");
        assert!(config.security.admin_api_key_hash.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_pool_settings() {
        let config = Config::load_for_test(&[
            ("security.admin_api_key_hash", KEY_HASH),
            ("database.min_connections", "10"),
            ("database.max_connections", "2"),
        ])
        .expect("Failed to load config");
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("min_connections"));
    }

    #[test]
    fn test_socket_addr() {
        let config = Config::load_for_test(&[("server.port", "3000")])
            .expect("Failed to load config");
        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:3000");
    }
}
