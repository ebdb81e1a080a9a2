//! Layered settings: built-in defaults, then `REVIEWS__*` environment variables.
//!
//! `REVIEWS__SERVER__PORT=9090` overrides `server.port`, and so on.

use std::path::PathBuf;

use config::{Config, ConfigError, Environment};
use secrecy::SecretString;
use serde::Deserialize;

/// Signing secret used when none is configured. Fine for local runs only.
pub const DEV_JWT_SECRET: &str = "rusty-reviews-dev-secret";

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct MediaSettings {
    pub root: PathBuf,
    pub url_prefix: String,
}

#[derive(Debug, Deserialize)]
struct RawAuthSettings {
    jwt_secret: String,
    session_ttl_secs: i64,
}

#[derive(Debug)]
pub struct AuthSettings {
    pub jwt_secret: SecretString,
    pub session_ttl_secs: i64,
    /// True when `jwt_secret` is still the built-in development value
    pub using_dev_secret: bool,
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    server: ServerSettings,
    database: DatabaseSettings,
    media: MediaSettings,
    auth: RawAuthSettings,
}

#[derive(Debug)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub media: MediaSettings,
    pub auth: AuthSettings,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_env(Environment::with_prefix("REVIEWS"))
    }

    fn from_env(env: Environment) -> Result<Self, ConfigError> {
        let raw: RawSettings = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.url", "sqlite:rusty_reviews.db")?
            .set_default("media.root", "./data/uploads")?
            .set_default("media.url_prefix", "/static/uploads")?
            .set_default("auth.jwt_secret", DEV_JWT_SECRET)?
            .set_default("auth.session_ttl_secs", 86_400)?
            .add_source(env.prefix_separator("__").separator("__"))
            .build()?
            .try_deserialize()?;

        if raw.auth.session_ttl_secs <= 0 {
            return Err(ConfigError::Message("auth.session_ttl_secs must be positive".into()));
        }

        Ok(Settings {
            server: raw.server,
            database: raw.database,
            media: raw.media,
            auth: AuthSettings {
                using_dev_secret: raw.auth.jwt_secret == DEV_JWT_SECRET,
                jwt_secret: SecretString::from(raw.auth.jwt_secret),
                session_ttl_secs: raw.auth.session_ttl_secs,
            },
        })
    }
}
