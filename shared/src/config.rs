//! Configuration management for all services

use serde::{Deserialize, Serialize};
use std::env;

/// Secret used when `JWT_SECRET` is not set. Rejected in production.
pub const DEVELOPMENT_JWT_SECRET: &str = "reports-development-jwt-secret-change-me";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
    pub max_lifetime_seconds: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_ttl_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: String,
    pub log_level: String,
    pub host: String,
    pub port: u16,
    pub max_request_size_mb: u64,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database: DatabaseConfig {
                url: "postgresql://localhost:5432/centralserver".to_string(),
                max_connections: 10,
                min_connections: 2,
                acquire_timeout_seconds: 10,
                idle_timeout_seconds: 300,
                max_lifetime_seconds: 1800,
                run_migrations: false,
            },
            auth: AuthConfig {
                jwt_secret: DEVELOPMENT_JWT_SECRET.to_string(),
                access_token_ttl_seconds: 3600,
            },
            app: AppConfig {
                environment: "development".to_string(),
                log_level: "info".to_string(),
                host: "0.0.0.0".to_string(),
                port: 8000,
                max_request_size_mb: 2,
                cors_allowed_origins: Vec::new(),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup, falling back to
    /// the defaults for every missing key.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let config = Config {
            database: DatabaseConfig {
                url: lookup("DATABASE_URL").unwrap_or(defaults.database.url),
                max_connections: parse_or(
                    &lookup,
                    "DATABASE_MAX_CONNECTIONS",
                    defaults.database.max_connections,
                )?,
                min_connections: parse_or(
                    &lookup,
                    "DATABASE_MIN_CONNECTIONS",
                    defaults.database.min_connections,
                )?,
                acquire_timeout_seconds: parse_or(
                    &lookup,
                    "DATABASE_ACQUIRE_TIMEOUT_SECONDS",
                    defaults.database.acquire_timeout_seconds,
                )?,
                idle_timeout_seconds: parse_or(
                    &lookup,
                    "DATABASE_IDLE_TIMEOUT_SECONDS",
                    defaults.database.idle_timeout_seconds,
                )?,
                max_lifetime_seconds: parse_or(
                    &lookup,
                    "DATABASE_MAX_LIFETIME_SECONDS",
                    defaults.database.max_lifetime_seconds,
                )?,
                run_migrations: parse_or(
                    &lookup,
                    "RUN_MIGRATIONS",
                    defaults.database.run_migrations,
                )?,
            },
            auth: AuthConfig {
                jwt_secret: lookup("JWT_SECRET").unwrap_or(defaults.auth.jwt_secret),
                access_token_ttl_seconds: parse_or(
                    &lookup,
                    "JWT_ACCESS_TOKEN_TTL_SECONDS",
                    defaults.auth.access_token_ttl_seconds,
                )?,
            },
            app: AppConfig {
                environment: lookup("ENVIRONMENT").unwrap_or(defaults.app.environment),
                log_level: lookup("RUST_LOG").unwrap_or(defaults.app.log_level),
                host: lookup("HOST").unwrap_or(defaults.app.host),
                port: parse_or(&lookup, "PORT", defaults.app.port)?,
                max_request_size_mb: parse_or(
                    &lookup,
                    "MAX_REQUEST_SIZE_MB",
                    defaults.app.max_request_size_mb,
                )?,
                cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                    .map(|origins| {
                        origins
                            .split(',')
                            .map(|origin| origin.trim().to_string())
                            .filter(|origin| !origin.is_empty())
                            .collect()
                    })
                    .unwrap_or(defaults.app.cors_allowed_origins),
            },
        };

        if config.is_production() && config.auth.jwt_secret == DEVELOPMENT_JWT_SECRET {
            anyhow::bail!("JWT_SECRET must be set in production");
        }

        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        self.app.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.app.environment == "development"
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid value for {}: {}", key, e)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.app.port, 8000);
        assert_eq!(config.database.max_connections, 10);
        assert!(!config.database.run_migrations);
        assert!(config.is_development());
        assert!(config.app.cors_allowed_origins.is_empty());
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "9090"),
            ("RUN_MIGRATIONS", "true"),
            ("CORS_ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
        ]))
        .unwrap();
        assert_eq!(config.app.port, 9090);
        assert!(config.database.run_migrations);
        assert_eq!(
            config.app.cors_allowed_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let result = Config::from_lookup(lookup_from(&[("PORT", "eighty")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_production_requires_jwt_secret() {
        let result = Config::from_lookup(lookup_from(&[("ENVIRONMENT", "production")]));
        assert!(result.is_err());

        let config = Config::from_lookup(lookup_from(&[
            ("ENVIRONMENT", "production"),
            ("JWT_SECRET", "a-real-production-secret"),
        ]))
        .unwrap();
        assert!(config.is_production());
    }
}
