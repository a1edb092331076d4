//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use chrono::Duration;
use imago::auth::{
    DEFAULT_RESET_TOKEN_LIFETIME_MINUTES, MAX_RESET_TOKEN_LIFETIME_MINUTES, MIN_TOKEN_BYTES,
};
use imago::db::DatabaseConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

/// Default bind address
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Default externally visible base URL, used in emailed links
pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

/// Default directory for gallery image files
pub const DEFAULT_IMAGE_DIR: &str = "images";

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Base URL the server is reachable at
    pub server_url: String,
    /// Deployment environment
    pub environment: Environment,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Security configuration
    pub security: SecurityConfig,
    /// Token sizes and lifetimes
    pub tokens: TokenConfig,
    /// Root directory for gallery images
    pub image_dir: PathBuf,
    /// Prometheus exporter address, disabled when unset
    pub metrics_bind: Option<SocketAddr>,
}

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Dev,
    Prod,
}

impl Environment {
    /// Production cookies carry the `Secure` attribute
    pub fn is_prod(self) -> bool {
        self == Environment::Prod
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Dev),
            "prod" | "production" => Ok(Environment::Prod),
            other => Err(ConfigError::Invalid {
                var: "SERVER_ENV".to_string(),
                reason: format!("Expected dev or prod, got {:?}", other),
            }),
        }
    }
}

/// Security-related configuration
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Password hashing pepper (required)
    pub password_pepper: String,
}

/// Session and reset token settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenConfig {
    /// Random bytes per session token
    pub session_token_bytes: usize,
    /// Random bytes per reset token
    pub reset_token_bytes: usize,
    /// Reset token lifetime in minutes
    pub reset_token_lifetime_minutes: i64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            session_token_bytes: MIN_TOKEN_BYTES,
            reset_token_bytes: MIN_TOKEN_BYTES,
            reset_token_lifetime_minutes: DEFAULT_RESET_TOKEN_LIFETIME_MINUTES,
        }
    }
}

impl TokenConfig {
    /// Reset token lifetime, kept within `1..=MAX_RESET_TOKEN_LIFETIME_MINUTES`
    pub fn reset_token_lifetime(&self) -> Duration {
        Duration::minutes(
            self.reset_token_lifetime_minutes
                .clamp(1, MAX_RESET_TOKEN_LIFETIME_MINUTES),
        )
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(addr) => addr,
            None => parse_addr("SERVER_BIND", &env_or("SERVER_BIND", DEFAULT_BIND))?,
        };

        let server_url = env_or("SERVER_URL", DEFAULT_SERVER_URL)
            .trim_end_matches('/')
            .to_string();

        let environment = match std::env::var("SERVER_ENV") {
            Ok(value) => value.parse()?,
            Err(_) => Environment::default(),
        };

        let mut database = DatabaseConfig::from_env();
        if let Some(url) = database_url_override {
            database.database_url = url;
        }

        // Security configuration (REQUIRED)
        let password_pepper =
            std::env::var("PASSWORD_PEPPER").map_err(|_| ConfigError::MissingRequired {
                var: "PASSWORD_PEPPER".to_string(),
                hint: "Generate with: openssl rand -hex 16".to_string(),
            })?;

        let defaults = TokenConfig::default();
        let tokens = TokenConfig {
            session_token_bytes: parse_env_or("SESSION_TOKEN_BYTES", defaults.session_token_bytes),
            reset_token_bytes: parse_env_or("RESET_TOKEN_BYTES", defaults.reset_token_bytes),
            reset_token_lifetime_minutes: parse_env_or(
                "RESET_TOKEN_LIFETIME_MINUTES",
                defaults.reset_token_lifetime_minutes,
            ),
        };

        let image_dir = PathBuf::from(env_or("IMAGE_DIR", DEFAULT_IMAGE_DIR));

        let metrics_bind = match std::env::var("METRICS_BIND") {
            Ok(value) if !value.trim().is_empty() => Some(parse_addr("METRICS_BIND", &value)?),
            _ => None,
        };

        Ok(ServerConfig {
            bind,
            server_url,
            environment,
            database,
            security: SecurityConfig { password_pepper },
            tokens,
            image_dir,
            metrics_bind,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.password_pepper.len() < 16 {
            return Err(ConfigError::Invalid {
                var: "PASSWORD_PEPPER".to_string(),
                reason: "Must be at least 16 characters (64-bit security)".to_string(),
            });
        }

        if self.tokens.session_token_bytes < MIN_TOKEN_BYTES {
            return Err(ConfigError::Invalid {
                var: "SESSION_TOKEN_BYTES".to_string(),
                reason: format!("Must be at least {}", MIN_TOKEN_BYTES),
            });
        }

        if self.tokens.reset_token_bytes < MIN_TOKEN_BYTES {
            return Err(ConfigError::Invalid {
                var: "RESET_TOKEN_BYTES".to_string(),
                reason: format!("Must be at least {}", MIN_TOKEN_BYTES),
            });
        }

        if self.tokens.reset_token_lifetime_minutes <= 0 {
            return Err(ConfigError::Invalid {
                var: "RESET_TOKEN_LIFETIME_MINUTES".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.tokens.reset_token_lifetime_minutes > MAX_RESET_TOKEN_LIFETIME_MINUTES {
            return Err(ConfigError::Invalid {
                var: "RESET_TOKEN_LIFETIME_MINUTES".to_string(),
                reason: format!("Cannot exceed {}", MAX_RESET_TOKEN_LIFETIME_MINUTES),
            });
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!(
                    "Cannot exceed DB_MAX_CONNECTIONS ({})",
                    self.database.max_connections
                ),
            });
        }

        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                var: "SERVER_URL".to_string(),
                reason: "Must start with http:// or https://".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_addr(var: &str, value: &str) -> Result<SocketAddr, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid {
        var: var.to_string(),
        reason: format!("{:?} is not an IP:PORT address", value),
    })
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
