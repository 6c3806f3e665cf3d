//! Handles settings for the application. Configuration is read from an
//! optional `settings.toml`, then from `KHATA__`-prefixed environment
//! variables (`KHATA__SERVER__PORT=8080`).

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
}

/// The admin role is not stored in the database; its login lives here.
#[derive(Debug, Deserialize)]
pub struct Admin {
    pub login_name: String,
    /// bcrypt hash, as printed by `khata_admin hash-password`.
    pub password_hash: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Engine {
    pub lock_timeout_ms: u64,
    pub bcrypt_cost: u32,
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 5_000,
            bcrypt_cost: 12,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub server: Option<Server>,
    pub admin: Option<Admin>,
    #[serde(default)]
    pub engine: Engine,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings").required(false))
            .add_source(Environment::with_prefix("KHATA").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}
