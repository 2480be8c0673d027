use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::store::BackendKind;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
    pub database_url: String,
    pub database_max_connections: u32,
    /// Strategy serving members, memberships and products.
    pub storage_backend: BackendKind,
    pub mongo_url: Option<Url>,
    pub mongo_database: String,
    pub debug: bool,
    pub auth_token: String,
    pub enable_swagger: bool,
    pub port: u16,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let config = Config::builder()
            .set_default("database_url", "sqlite://fitness-center.db")?
            .set_default("database_max_connections", 5)?
            .set_default("storage_backend", "sql")?
            .set_default("mongo_database", "fitness_center")?
            .set_default("debug", false)?
            .set_default("auth_token", "default-token-change-me")?
            .set_default("enable_swagger", true)?
            .set_default("port", 8080)?
            .add_source(File::with_name("fitness-center").required(false))
            // APP_DATABASE_URL, APP_STORAGE_BACKEND, ...
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        config.try_deserialize()
    }
}
