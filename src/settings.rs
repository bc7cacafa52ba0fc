// ABOUTME: Layered service settings from defaults, an optional TOML file and environment
// ABOUTME: Covers the listen address, cookie policy, database url and the admin token

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
    pub secure_cookies: bool,
    pub session_max_age_secs: i64,
}

impl Server {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Admin {
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub database: Database,
    pub admin: Admin,
}

impl Settings {
    pub fn new() -> Result<Self> {
        dotenvy::dotenv().ok();
        let settings = Self::builder()?
            .add_source(
                File::with_name("sickleave.toml")
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(Environment::with_prefix("SICKLEAVE").separator("__"))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    fn builder() -> std::result::Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("server.secure_cookies", false)?
            .set_default("server.session_max_age_secs", 24 * 60 * 60)?
            .set_default("database.url", "sqlite:sickleave.db?mode=rwc")?
            .set_default("admin.token", "change-me")
    }

    /// Defaults only, without reading files or the environment.
    pub fn defaults() -> Result<Self> {
        Ok(Self::builder()?.build()?.try_deserialize()?)
    }
}
