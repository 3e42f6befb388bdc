// common/src/config.rs
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use config::{Config as ConfigFile, File, Environment};

/// Minimum auth secret length, shared by the JWT key and the cookie key
pub const MIN_SECRET_LEN: usize = 32;

/// Central configuration for the wallet auth service
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub web_server_addr: String,
    /// Only an explicit "development" drops the Secure flag from cookies
    #[serde(default = "default_run_mode")]
    pub run_mode: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,

    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,

    // Static file serving configuration
    pub static_files: StaticFilesConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Postgres connection URL. Empty means the in-memory profile store.
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Signs session tokens and encrypts the challenge cookie
    #[serde(default)]
    pub secret: String,
    pub session_cookie_name: String,
    pub challenge_cookie_name: String,
    pub session_ttl_secs: i64,
    pub challenge_ttl_secs: i64,
    /// Chains a wallet may sign in from
    pub allowed_chain_ids: Vec<u64>,
    /// When set, SIWE messages must name this domain
    #[serde(default)]
    pub siwe_domain: Option<String>,
    /// Path prefixes that need a session
    pub protected_routes: Vec<String>,
    /// Where authenticated users land after register/login
    pub post_login_redirect: String,
    pub registry_cleanup_interval_secs: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub paths: Vec<String>,
    pub max_requests: usize,
    pub window_secs: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StaticFilesConfig {
    pub path: String,
    pub index: String,
    pub enabled: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("AUTH_SECRET is not set")]
    MissingSecret,
    #[error("auth secret must be at least 32 bytes, got {0}")]
    SecretTooShort(usize),
    #[error("no allowed chain ids configured")]
    NoChains,
    #[error("{0} must be positive")]
    NonPositiveTtl(&'static str),
}

fn default_run_mode() -> String {
    "production".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_connect_timeout() -> u64 {
    30
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            session_cookie_name: "session".to_string(),
            challenge_cookie_name: "siwe_challenge".to_string(),
            session_ttl_secs: 86400,
            challenge_ttl_secs: 300,
            allowed_chain_ids: vec![11155111],
            siwe_domain: None,
            protected_routes: vec!["/dashboard".to_string()],
            post_login_redirect: "/dashboard".to_string(),
            registry_cleanup_interval_secs: 60,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            paths: vec!["/api/auth/nonce".to_string(), "/api/auth/verify".to_string()],
            max_requests: 30,
            window_secs: 60,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web_server_addr: "127.0.0.1:8081".to_string(),
            run_mode: default_run_mode(),
            log_level: default_log_level(),
            database: DatabaseConfig {
                url: String::new(),
                max_connections: default_max_connections(),
                connect_timeout_secs: default_connect_timeout(),
            },
            auth: AuthConfig::default(),
            rate_limit: RateLimitConfig::default(),
            static_files: StaticFilesConfig {
                path: "./static".to_string(),
                index: "index.html".to_string(),
                enabled: false,
            },
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        // Get the run mode, defaulting to "production"
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| default_run_mode());

        // Locate the config directory
        let config_dir = env::var("CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                // Check if we're in the project root or a subcrate
                let mut path = PathBuf::from("./config");
                if !path.exists() {
                    path = PathBuf::from("../config");
                }
                path
            });

        tracing::info!("Loading configuration from {}", config_dir.display());
        tracing::info!("Using run mode: {}", run_mode);

        let defaults = ConfigFile::try_from(&Config::default())?;

        let config = ConfigFile::builder()
            // Start with compiled-in defaults, then the default file
            .add_source(defaults)
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Add environment specific config
            .add_source(File::from(config_dir.join(format!("{}.toml", run_mode))).required(false))
            // Add a local config file for local overrides
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // Add environment variables with prefix "APP"
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Conventional variables win over everything else
            .set_override_option("auth.secret", env::var("AUTH_SECRET").ok())?
            .set_override_option("database.url", env::var("DATABASE_URL").ok())?
            .set_override("run_mode", run_mode)?
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Load configuration, falling back to plain environment variables
    pub fn from_env() -> Self {
        // Try to load from file first
        match Self::load() {
            Ok(config) => {
                tracing::info!("Configuration loaded from files and environment");
                config
            },
            Err(e) => {
                tracing::warn!("Failed to load configuration from files: {}", e);
                tracing::info!("Falling back to environment variables only");

                let mut config = Self::default();

                if let Ok(addr) = env::var("WEB_SERVER_ADDR") {
                    config.web_server_addr = addr;
                }
                if let Ok(mode) = env::var("RUN_MODE") {
                    config.run_mode = mode;
                }
                if let Ok(url) = env::var("DATABASE_URL") {
                    config.database.url = url;
                }
                if let Ok(secret) = env::var("AUTH_SECRET") {
                    config.auth.secret = secret;
                }
                if let Ok(domain) = env::var("SIWE_DOMAIN") {
                    config.auth.siwe_domain = Some(domain);
                }
                if let Some(chains) = env::var("ALLOWED_CHAIN_IDS").ok().map(|v| parse_u64_list(&v)) {
                    if !chains.is_empty() {
                        config.auth.allowed_chain_ids = chains;
                    }
                }
                if let Ok(path) = env::var("STATIC_FILES_PATH") {
                    config.static_files.path = path;
                    config.static_files.enabled = true;
                }

                config
            }
        }
    }

    pub fn is_development(&self) -> bool {
        self.run_mode == "development"
    }

    /// Reject configurations the service cannot run with
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let secret_len = self.auth.secret.len();
        if secret_len == 0 {
            return Err(ConfigValidationError::MissingSecret);
        }
        if secret_len < MIN_SECRET_LEN {
            return Err(ConfigValidationError::SecretTooShort(secret_len));
        }
        if self.auth.allowed_chain_ids.is_empty() {
            return Err(ConfigValidationError::NoChains);
        }
        if self.auth.session_ttl_secs <= 0 {
            return Err(ConfigValidationError::NonPositiveTtl("session_ttl_secs"));
        }
        if self.auth.challenge_ttl_secs <= 0 {
            return Err(ConfigValidationError::NonPositiveTtl("challenge_ttl_secs"));
        }
        Ok(())
    }
}

fn parse_u64_list(raw: &str) -> Vec<u64> {
    raw.split(',')
        .filter_map(|part| part.trim().parse::<u64>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_secret(secret: &str) -> Config {
        let mut config = Config::default();
        config.auth.secret = secret.to_string();
        config
    }

    #[test]
    fn test_missing_secret_rejected() {
        assert!(matches!(
            Config::default().validate(),
            Err(ConfigValidationError::MissingSecret)
        ));
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(matches!(
            with_secret("too-short").validate(),
            Err(ConfigValidationError::SecretTooShort(9))
        ));
    }

    #[test]
    fn test_valid_config() {
        let config = with_secret("0123456789abcdef0123456789abcdef");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_production_unless_opted_out() {
        let mut config = Config::default();
        assert!(!config.is_development());

        config.run_mode = "development".to_string();
        assert!(config.is_development());
    }

    #[test]
    fn test_parse_chain_list() {
        assert_eq!(parse_u64_list("1, 11155111,,x"), vec![1, 11155111]);
    }
}
