//! Database configuration module.
//!
//! Provides configuration structures for database connection management.

use std::env;

/// Default connection URL for local development
pub const DEFAULT_DATABASE_URL: &str = "postgres://postgres@localhost/imago";

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Connection timeout in seconds
    pub connection_timeout_secs: u64,

    /// Idle connection timeout in seconds
    pub idle_timeout_secs: u64,

    /// Maximum connection lifetime in seconds
    pub max_lifetime_secs: u64,
}

impl DatabaseConfig {
    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `DATABASE_URL`: PostgreSQL connection string (default: [`DEFAULT_DATABASE_URL`])
    /// - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 20)
    /// - `DB_MIN_CONNECTIONS`: Minimum pool size (default: 1)
    /// - `DB_CONNECTION_TIMEOUT_SECS`: Connection timeout in seconds (default: 5)
    /// - `DB_IDLE_TIMEOUT_SECS`: Idle timeout in seconds (default: 300)
    /// - `DB_MAX_LIFETIME_SECS`: Max lifetime in seconds (default: 1800)
    ///
    /// Unparseable numbers fall back to their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::development();
        Self {
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            max_connections: parse_env_or("DB_MAX_CONNECTIONS", defaults.max_connections),
            min_connections: parse_env_or("DB_MIN_CONNECTIONS", defaults.min_connections),
            connection_timeout_secs: parse_env_or(
                "DB_CONNECTION_TIMEOUT_SECS",
                defaults.connection_timeout_secs,
            ),
            idle_timeout_secs: parse_env_or("DB_IDLE_TIMEOUT_SECS", defaults.idle_timeout_secs),
            max_lifetime_secs: parse_env_or("DB_MAX_LIFETIME_SECS", defaults.max_lifetime_secs),
        }
    }

    /// Create a default configuration for development
    pub fn development() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 20,
            min_connections: 1,
            connection_timeout_secs: 5,
            idle_timeout_secs: 300,
            max_lifetime_secs: 1800,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::development()
    }
}

fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_development_defaults() {
        let config = DatabaseConfig::default();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.max_connections, 20);
        assert_eq!(config.min_connections, 1);
        assert!(config.min_connections <= config.max_connections);
    }

    #[test]
    fn test_parse_env_or_falls_back_on_missing() {
        let value: u32 = parse_env_or("IMAGO_TEST_SURELY_UNSET_VARIABLE", 7);
        assert_eq!(value, 7);
    }
}
