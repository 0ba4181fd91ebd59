//! Repository configuration file support.
//!
//! This module reads `repository.toml`, which selects the storage backend and
//! carries the MongoDB, server and origin settings. Environment variables
//! override values read from the file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::factory::RepositoryType;
use super::repository::RepositoryError;
#[cfg(feature = "mongo-repo")]
use super::repositories::MongoConfig;

/// Origin every deployment accepts.
pub const DEFAULT_ALLOWED_ORIGIN: &str = "https://happy-dreamers.app";
/// Preview deployments, matched case-insensitively.
pub const DEFAULT_PREVIEW_PATTERN: &str = r"^https://happy-dreamers-.*\.vercel\.app$";

/// Repository configuration from file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryConfig {
    #[serde(default)]
    pub repository: RepositorySettings,
    #[serde(default)]
    pub mongo: MongoSettings,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub origins: OriginSettings,
}

/// Repository type settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositorySettings {
    #[serde(rename = "type", default = "default_repo_type")]
    pub repo_type: String,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            repo_type: default_repo_type(),
        }
    }
}

/// MongoDB connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSettings {
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,
    #[serde(default = "default_min_pool_size")]
    pub min_pool_size: u32,
    #[serde(default = "default_max_idle_time_ms")]
    pub max_idle_time_ms: u64,
    #[serde(default = "default_retry_writes")]
    pub retry_writes: bool,
}

impl Default for MongoSettings {
    fn default() -> Self {
        Self {
            uri: String::new(),
            database: None,
            max_pool_size: default_max_pool_size(),
            min_pool_size: default_min_pool_size(),
            max_idle_time_ms: default_max_idle_time_ms(),
            retry_writes: default_retry_writes(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Cross-origin policy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginSettings {
    #[serde(default = "default_allowed_origins")]
    pub allowed: Vec<String>,
    #[serde(default = "default_preview_pattern")]
    pub preview_pattern: Option<String>,
}

impl Default for OriginSettings {
    fn default() -> Self {
        Self {
            allowed: default_allowed_origins(),
            preview_pattern: default_preview_pattern(),
        }
    }
}

fn default_repo_type() -> String {
    "local".to_string()
}

fn default_max_pool_size() -> u32 {
    10
}

fn default_min_pool_size() -> u32 {
    2
}

fn default_max_idle_time_ms() -> u64 {
    30_000
}

fn default_retry_writes() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_allowed_origins() -> Vec<String> {
    vec![DEFAULT_ALLOWED_ORIGIN.to_string()]
}

fn default_preview_pattern() -> Option<String> {
    Some(DEFAULT_PREVIEW_PATTERN.to_string())
}

impl RepositoryConfig {
    /// Load repository configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            RepositoryError::configuration(format!("Failed to read config file: {}", e))
        })?;

        toml::from_str(&content).map_err(|e| {
            RepositoryError::configuration(format!("Failed to parse config file: {}", e))
        })
    }

    /// Load repository configuration from the default location.
    ///
    /// Searches for `repository.toml` in:
    /// 1. Current directory
    /// 2. `backend/` directory
    /// 3. Parent directory
    pub fn from_default_location() -> Result<Self, RepositoryError> {
        let search_paths = [
            PathBuf::from("repository.toml"),
            PathBuf::from("backend/repository.toml"),
            PathBuf::from("../repository.toml"),
        ];

        for path in search_paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Err(RepositoryError::configuration(
            "No repository.toml found in standard locations",
        ))
    }

    /// Default-location file if present, built-in defaults otherwise, then
    /// environment overrides on top.
    pub fn load() -> Result<Self, RepositoryError> {
        let mut config = match Self::from_default_location() {
            Ok(config) => config,
            Err(e) => {
                log::debug!("{}; using built-in defaults", e);
                Self::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Override file values with `REPOSITORY_TYPE`, `MONGODB_URI`,
    /// `MONGODB_DATABASE`, `HOST` and `PORT`. Blank values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(repo_type) = get("REPOSITORY_TYPE") {
            self.repository.repo_type = repo_type;
        } else if get("MONGODB_URI").is_some() && cfg!(feature = "mongo-repo") {
            self.repository.repo_type = "mongo".to_string();
        }
        if let Some(uri) = get("MONGODB_URI") {
            self.mongo.uri = uri;
        }
        if let Some(database) = get("MONGODB_DATABASE") {
            self.mongo.database = Some(database);
        }
        if let Some(host) = get("HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("PORT") {
            match port.trim().parse() {
                Ok(port) => self.server.port = port,
                Err(_) => log::warn!("Ignoring invalid PORT value '{}'", port),
            }
        }
    }

    /// Get the repository type from configuration.
    pub fn repository_type(&self) -> Result<RepositoryType, String> {
        RepositoryType::from_str(&self.repository.repo_type)
    }

    /// `host:port` for the HTTP listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Convert to MongoConfig if this is a MongoDB configuration.
    #[cfg(feature = "mongo-repo")]
    pub fn to_mongo_config(&self) -> Result<Option<MongoConfig>, RepositoryError> {
        let repo_type = self.repository_type().map_err(|e| {
            RepositoryError::configuration(format!("Invalid repository type: {}", e))
        })?;

        if repo_type != RepositoryType::Mongo {
            return Ok(None);
        }

        if self.mongo.uri.trim().is_empty() {
            return Err(RepositoryError::configuration(
                "Mongo repository requires 'mongo.uri' setting or MONGODB_URI",
            ));
        }

        Ok(Some(MongoConfig {
            uri: self.mongo.uri.clone(),
            database: self.mongo.database.clone(),
            max_pool_size: self.mongo.max_pool_size,
            min_pool_size: self.mongo.min_pool_size,
            max_idle_time_ms: self.mongo.max_idle_time_ms,
            retry_writes: self.mongo.retry_writes,
        }))
    }
}
