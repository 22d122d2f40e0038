use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::constants::DEFAULT_PORT;

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

/// Service configuration file structure
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Path of the SQLite database file (created if missing)
    pub database_path: PathBuf,
    /// HTTP port to listen on (default: 8080)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Size of the store connection pool (default: 5)
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// How long a writer waits for the database lock, in milliseconds (default: 5000)
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl ServiceConfig {
    /// Read and validate a TOML config file
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: ServiceConfig = toml::from_str(&content)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_connections == 0 {
            return Err("max_connections must be at least 1".to_string());
        }
        if self.database_path.as_os_str().is_empty() {
            return Err("database_path must not be empty".to_string());
        }
        Ok(())
    }
}
