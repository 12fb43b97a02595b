//! Server configuration parsed from environment variables.
//!
//! SYSTEM CONTEXT
//! ==============
//! `main` loads `.env` through `dotenvy`, then builds a typed `ServerConfig`
//! before anything else starts. Parsing goes through `from_lookup` so tests
//! can feed a fixed map instead of mutating process env.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::services::password;
use crate::services::token::SigningSecret;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const MIN_SECRET_BYTES: usize = 32;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    Missing(&'static str),
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMode {
    Development,
    Production,
}

impl ServerMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl FromStr for ServerMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("expected 'development' or 'production', got '{other}'")),
        }
    }
}

/// Origins allowed by the CORS layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub mode: ServerMode,
    pub log_level: tracing::Level,
    /// `None` runs the service against the in-memory user store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt_secret: SigningSecret,
    /// Retired secrets still accepted for verification during rotation.
    pub jwt_previous_secrets: Vec<SigningSecret>,
    pub token_ttl: Duration,
    pub bcrypt_cost: u32,
    pub cors_origins: CorsOrigins,
    pub request_timeout: Duration,
}

impl ServerConfig {
    /// Build config from process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `JWT_SECRET` is missing or any variable is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. Blank values count as unset.
    ///
    /// Required:
    /// - `JWT_SECRET` (at least 32 bytes)
    ///
    /// Optional:
    /// - `HOST`, `PORT`, `SERVER_MODE`, `LOG_LEVEL`
    /// - `DATABASE_URL`, `DB_MAX_CONNECTIONS`
    /// - `JWT_PREVIOUS_SECRETS` (comma separated), `TOKEN_TTL_SECS`
    /// - `BCRYPT_COST`, `CORS_ALLOWED_ORIGINS`, `REQUEST_TIMEOUT_SECS`
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value fails to parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let host = get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_owned());
        let port = parse_or(get("PORT"), "PORT", DEFAULT_PORT)?;
        let mode = parse_or(get("SERVER_MODE"), "SERVER_MODE", ServerMode::Development)?;
        let log_level = parse_or(get("LOG_LEVEL"), "LOG_LEVEL", tracing::Level::INFO)?;

        let database_url = get("DATABASE_URL");
        let db_max_connections = parse_or(get("DB_MAX_CONNECTIONS"), "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?;

        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let jwt_secret = parse_secret(&jwt_secret, "JWT_SECRET")?;
        let jwt_previous_secrets = get("JWT_PREVIOUS_SECRETS")
            .map(|raw| {
                split_list(&raw)
                    .map(|s| parse_secret(s, "JWT_PREVIOUS_SECRETS"))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();

        let ttl_secs = parse_or(get("TOKEN_TTL_SECS"), "TOKEN_TTL_SECS", DEFAULT_TOKEN_TTL_SECS)?;
        if ttl_secs == 0 {
            return Err(ConfigError::Invalid { var: "TOKEN_TTL_SECS", reason: "must be greater than zero".into() });
        }

        let bcrypt_cost = parse_or(get("BCRYPT_COST"), "BCRYPT_COST", password::DEFAULT_COST)?;
        if !(password::MIN_COST..=password::MAX_COST).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                var: "BCRYPT_COST",
                reason: format!("must be between {} and {}", password::MIN_COST, password::MAX_COST),
            });
        }

        let cors_origins = parse_cors(get("CORS_ALLOWED_ORIGINS").as_deref());
        let timeout_secs = parse_or(get("REQUEST_TIMEOUT_SECS"), "REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?;

        Ok(Self {
            host,
            port,
            mode,
            log_level,
            database_url,
            db_max_connections,
            jwt_secret,
            jwt_previous_secrets,
            token_ttl: Duration::from_secs(ttl_secs),
            bcrypt_cost,
            cors_origins,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_or<T>(raw: Option<String>, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value
            .parse::<T>()
            .map_err(|e| ConfigError::Invalid { var, reason: format!("'{value}': {e}") }),
    }
}

fn parse_secret(raw: &str, var: &'static str) -> Result<SigningSecret, ConfigError> {
    if raw.len() < MIN_SECRET_BYTES {
        return Err(ConfigError::Invalid { var, reason: format!("secrets must be at least {MIN_SECRET_BYTES} bytes") });
    }
    Ok(SigningSecret::new(raw.as_bytes()))
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

pub(crate) fn parse_cors(raw: Option<&str>) -> CorsOrigins {
    match raw {
        None | Some("*") => CorsOrigins::Any,
        Some(list) => {
            let origins: Vec<String> = split_list(list).map(str::to_owned).collect();
            if origins.is_empty() || origins.iter().any(|o| o == "*") {
                CorsOrigins::Any
            } else {
                CorsOrigins::List(origins)
            }
        }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
