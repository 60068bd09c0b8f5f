use std::env;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} is not valid: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Runtime settings, read once at startup and handed to the router.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub admin_jwt_secret: String,
    pub admin_id: String,
    pub admin_pass: String,
    /// Allowed CORS origins. Empty means permissive.
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match env::var("PORT") {
            Ok(value) => value
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { key: "PORT", value })?,
            Err(_) => 3001,
        };

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            port,
            jwt_secret: required("JWT_SECRET")?,
            admin_jwt_secret: required("ADMIN_JWT_SECRET")?,
            admin_id: env::var("ADMIN_ID").unwrap_or_else(|_| "admin".to_string()),
            admin_pass: required("ADMIN_PASS")?,
            cors_origins,
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(key)),
    }
}
