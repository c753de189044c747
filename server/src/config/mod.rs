use std::fmt;

use crate::error::{AppError, Result};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_ALLOWED_ORIGIN: &str = "https://peachofmind.netlify.com";
pub const DEFAULT_SESSION_COLLECTION: &str = "sessions";
pub const MIN_SESSION_SECRET_LEN: usize = 32;

/// Process configuration, sourced from environment variables.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub test_database_url: String,
    pub session_secret: String,
    /// Overrides the database named in the connection string.
    pub database_name: Option<String>,
    pub cors_allowed_origins: Vec<String>,
    pub session_collection: String,
    pub session_cookie_secure: bool,
    pub trust_proxy_hops: usize,
    pub autostart: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Required keys: `PORT`, `DATABASE_URL`, `TEST_DATABASE_URL`, `SESSION_SECRET`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &str| {
            value(key).ok_or_else(|| {
                AppError::Config(format!("missing required environment variable {}", key))
            })
        };

        let port = required("PORT")?
            .parse::<u16>()
            .map_err(|e| AppError::Config(format!("PORT is not a valid port number: {}", e)))?;
        let database_url = required("DATABASE_URL")?;
        let test_database_url = required("TEST_DATABASE_URL")?;

        let session_secret = required("SESSION_SECRET")?;
        if session_secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(AppError::Config(format!(
                "SESSION_SECRET must be at least {} bytes",
                MIN_SESSION_SECRET_LEN
            )));
        }

        let cors_allowed_origins = match value("CORS_ALLOWED_ORIGINS") {
            Some(raw) => parse_origins(&raw)?,
            None => vec![DEFAULT_ALLOWED_ORIGIN.to_string()],
        };

        let session_cookie_secure = match value("SESSION_COOKIE_SECURE") {
            Some(raw) => parse_flag("SESSION_COOKIE_SECURE", &raw)?,
            None => true,
        };

        let autostart = match value("AUTOSTART") {
            Some(raw) => parse_flag("AUTOSTART", &raw)?,
            None => true,
        };

        let trust_proxy_hops = match value("TRUST_PROXY_HOPS") {
            Some(raw) => raw.parse::<usize>().map_err(|e| {
                AppError::Config(format!("TRUST_PROXY_HOPS is not a number: {}", e))
            })?,
            None => 1,
        };

        Ok(Self {
            host: value("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            database_url,
            test_database_url,
            session_secret,
            database_name: value("DATABASE_NAME"),
            cors_allowed_origins,
            session_collection: value("SESSION_COLLECTION")
                .unwrap_or_else(|| DEFAULT_SESSION_COLLECTION.to_string()),
            session_cookie_secure,
            trust_proxy_hops,
            autostart,
        })
    }
}

// Keeps the session secret and connection strings out of logs.
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_url", &"<redacted>")
            .field("test_database_url", &"<redacted>")
            .field("session_secret", &"<redacted>")
            .field("database_name", &self.database_name)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("session_collection", &self.session_collection)
            .field("session_cookie_secure", &self.session_cookie_secure)
            .field("trust_proxy_hops", &self.trust_proxy_hops)
            .field("autostart", &self.autostart)
            .finish()
    }
}

fn parse_origins(raw: &str) -> Result<Vec<String>> {
    let origins: Vec<String> = raw
        .split(',')
        .map(|origin| origin.trim().trim_end_matches('/').to_string())
        .filter(|origin| !origin.is_empty())
        .collect();

    if origins.is_empty() {
        return Err(AppError::Config(
            "CORS_ALLOWED_ORIGINS must list at least one origin".to_string(),
        ));
    }

    Ok(origins)
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AppError::Config(format!(
            "{} must be a boolean, got '{}'",
            key, other
        ))),
    }
}
