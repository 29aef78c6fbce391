// src/config.rs

use std::{env, fmt, str::FromStr};

use dotenvy::dotenv;

/// Access tokens live for 7 days by default.
pub const DEFAULT_JWT_EXPIRATION: u64 = 7 * 24 * 60 * 60;

/// Refresh tokens live for 30 days by default.
pub const DEFAULT_JWT_REFRESH_EXPIRATION: u64 = 30 * 24 * 60 * 60;

/// Fixed pass mark for practice quizzes, independent of a certification's own passing score.
pub const QUIZ_PASS_PERCENTAGE: f64 = 75.0;

/// Number of rows returned by the history endpoints.
pub const HISTORY_LIMIT: i64 = 10;

/// Number of questions embedded in each dump of the dump listing.
pub const DUMP_PREVIEW_SIZE: i64 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub environment: String,
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_refresh_secret: String,
    /// Access token lifetime in seconds.
    pub jwt_expiration: u64,
    /// Refresh token lifetime in seconds.
    pub jwt_refresh_expiration: u64,
    pub cors_origins: Vec<String>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub seed_demo_data: bool,
    pub rust_log: String,
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
    SharedJwtSecret,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid { key, value } => write!(f, "{} has an invalid value: {:?}", key, value),
            ConfigError::SharedJwtSecret => {
                write!(f, "JWT_SECRET and JWT_REFRESH_SECRET must be different")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;
        let jwt_refresh_secret = required("JWT_REFRESH_SECRET")?;

        if jwt_secret == jwt_refresh_secret {
            return Err(ConfigError::SharedJwtSecret);
        }

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            port: parsed_or("PORT", 3001)?,
            environment: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            database_url,
            database_max_connections: parsed_or("DATABASE_MAX_CONNECTIONS", 5)?,
            jwt_secret,
            jwt_refresh_secret,
            jwt_expiration: parsed_or("JWT_EXPIRATION", DEFAULT_JWT_EXPIRATION)?,
            jwt_refresh_expiration: parsed_or(
                "JWT_REFRESH_EXPIRATION",
                DEFAULT_JWT_REFRESH_EXPIRATION,
            )?,
            cors_origins,
            admin_email: optional("ADMIN_EMAIL"),
            admin_password: optional("ADMIN_PASSWORD"),
            seed_demo_data: parsed_or("SEED_DEMO_DATA", false)?,
            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    optional(key).ok_or(ConfigError::Missing(key))
}

fn optional(key: &'static str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parsed_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parsed_or_uses_default_when_unset() {
        let port: u16 = parsed_or("CERTPREP_TEST_UNSET_PORT", 3001).unwrap();
        assert_eq!(port, 3001);
    }

    #[test]
    fn test_config_error_messages() {
        assert_eq!(
            ConfigError::Missing("DATABASE_URL").to_string(),
            "DATABASE_URL must be set"
        );
        let err = ConfigError::Invalid {
            key: "PORT",
            value: "abc".to_string(),
        };
        assert!(err.to_string().contains("PORT"));
    }
}
