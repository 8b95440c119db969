use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML from config file at {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Deserialize, Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub listen_addr: String,
    pub jwt_secret: String,
    pub app_url: String,
    pub log_dir: String,
    pub db_max_connections: u32,
    pub password_hash_cost: u32,
    pub token_ttl_hours: i64,
    pub admin_bootstrap_key: Option<String>,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
pub struct PartialServerConfig {
    pub database_url: Option<String>,
    pub listen_addr: Option<String>,
    pub jwt_secret: Option<String>,
    pub app_url: Option<String>,
    pub log_dir: Option<String>,
    pub db_max_connections: Option<u32>,
    pub password_hash_cost: Option<u32>,
    pub token_ttl_hours: Option<i64>,
    pub admin_bootstrap_key: Option<String>,
}

fn default_database_url() -> String {
    "sqlite://linkpage.db?mode=rwc".to_string()
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_app_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        None => Ok(None),
    }
}

impl PartialServerConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Builds a partial config from a key lookup, normally the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: lookup("DATABASE_URL"),
            listen_addr: lookup("LISTEN_ADDR"),
            jwt_secret: lookup("JWT_SECRET"),
            app_url: lookup("APP_URL"),
            log_dir: lookup("LOG_DIR"),
            db_max_connections: parse_var(&lookup, "DB_MAX_CONNECTIONS")?,
            password_hash_cost: parse_var(&lookup, "PASSWORD_HASH_COST")?,
            token_ttl_hours: parse_var(&lookup, "TOKEN_TTL_HOURS")?,
            admin_bootstrap_key: lookup("ADMIN_BOOTSTRAP_KEY"),
        })
    }
}

impl ServerConfig {
    /// Loads the config file (if any), then the environment on top of it.
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let file_config = match config_path {
            Some(path) => PartialServerConfig::from_file(Path::new(path))?,
            None => PartialServerConfig::default(),
        };
        let env_config = PartialServerConfig::from_lookup(|key| env::var(key).ok())?;

        Self::merge(env_config, file_config)
    }

    /// Environment overrides file.
    pub fn merge(
        env_config: PartialServerConfig,
        file_config: PartialServerConfig,
    ) -> Result<Self, ConfigError> {
        let password_hash_cost = env_config
            .password_hash_cost
            .or(file_config.password_hash_cost)
            .unwrap_or(bcrypt::DEFAULT_COST);
        if !(4..=31).contains(&password_hash_cost) {
            return Err(ConfigError::InvalidValue {
                key: "PASSWORD_HASH_COST",
                value: password_hash_cost.to_string(),
            });
        }

        Ok(ServerConfig {
            database_url: env_config
                .database_url
                .or(file_config.database_url)
                .unwrap_or_else(default_database_url),
            listen_addr: env_config
                .listen_addr
                .or(file_config.listen_addr)
                .unwrap_or_else(default_listen_addr),
            jwt_secret: env_config
                .jwt_secret
                .or(file_config.jwt_secret)
                .filter(|secret| !secret.is_empty())
                .ok_or(ConfigError::Missing("JWT_SECRET"))?,
            app_url: env_config
                .app_url
                .or(file_config.app_url)
                .unwrap_or_else(default_app_url),
            log_dir: env_config
                .log_dir
                .or(file_config.log_dir)
                .unwrap_or_else(default_log_dir),
            db_max_connections: env_config
                .db_max_connections
                .or(file_config.db_max_connections)
                .unwrap_or(10),
            password_hash_cost,
            token_ttl_hours: env_config
                .token_ttl_hours
                .or(file_config.token_ttl_hours)
                .unwrap_or(24),
            admin_bootstrap_key: env_config
                .admin_bootstrap_key
                .or(file_config.admin_bootstrap_key)
                .filter(|key| !key.is_empty()),
        })
    }
}
