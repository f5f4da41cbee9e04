use std::path::PathBuf;

use anyhow::{anyhow, Context};
use serde::Deserialize;

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "BOOKSTORE_ENV";
const CONFIG_DIR_ENV: &str = "BOOKSTORE_CONFIG_DIR";
const ENV_PREFIX: &str = "BOOKSTORE";

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

impl Environment {
    fn parse(name: &str) -> anyhow::Result<Self> {
        match name {
            "local" => Ok(Environment::Local),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(anyhow!(
                "unsupported environment '{}'; expected local/staging/production",
                other
            )),
        }
    }
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, environment overlay
    /// and `BOOKSTORE_*` variables.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => std::env::current_dir()
                .with_context(|| "unable to resolve current directory")?
                .join("config"),
        };

        Self::load_from(&config_dir, &environment)
    }

    /// Load configuration from an explicit directory and environment name.
    pub fn load_from(config_dir: &std::path::Path, environment: &str) -> anyhow::Result<Self> {
        let parsed_environment = Environment::parse(environment)?;

        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        let cfg = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        settings.environment = parsed_environment;

        Ok(settings)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    #[serde(default = "ServerSettings::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        8000
    }

    fn default_request_timeout_ms() -> u64 {
        15000
    }

    /// `host:port` string suitable for binding a listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_ms: Self::default_request_timeout_ms(),
        }
    }
}

/// Which store implementation backs the books collection.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Mongodb,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "DatabaseSettings::default_uri")]
    pub uri: String,
    #[serde(default = "DatabaseSettings::default_name")]
    pub name: String,
    #[serde(default = "DatabaseSettings::default_collection")]
    pub collection: String,
}

impl DatabaseSettings {
    fn default_uri() -> String {
        "mongodb://localhost:27017".to_string()
    }

    fn default_name() -> String {
        "bookStore".to_string()
    }

    fn default_collection() -> String {
        "books".to_string()
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            uri: Self::default_uri(),
            name: Self::default_name(),
            collection: Self::default_collection(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default = "TelemetrySettings::default_log_level")]
    pub log_level: String,
}

impl TelemetrySettings {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            log_level: Self::default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}
