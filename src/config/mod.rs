/// Configuration for the workflow designer host
///
/// Handles server binding, the document store location, the toolbox catalog
/// and how long idle editing sessions live.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Document storage configuration
    pub storage: StorageConfig,
    /// Toolbox catalog configuration
    pub catalog: CatalogConfig,
    /// Editing session lifetime
    pub sessions: SessionConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding `workflows.db` (default: "data")
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// JSON file with catalog entries; the built-in toolbox is used when unset
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Seconds a session may stay untouched before it is closed (default: 1800)
    pub idle_timeout_secs: u64,
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// How often idle sessions are looked for
    pub fn sweep_period(&self) -> Duration {
        Duration::from_secs((self.idle_timeout_secs / 4).clamp(1, 60))
    }
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for container deployment
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: std::env::var("DESIGNER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("DESIGNER_PORT")
                    .unwrap_or_else(|_| "3004".to_string())
                    .parse()
                    .unwrap_or(3004),
            },
            storage: StorageConfig {
                data_dir: std::env::var("DESIGNER_DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            },
            catalog: CatalogConfig {
                path: std::env::var("DESIGNER_CATALOG")
                    .ok()
                    .filter(|path| !path.trim().is_empty()),
            },
            sessions: SessionConfig {
                idle_timeout_secs: std::env::var("DESIGNER_SESSION_IDLE_SECS")
                    .unwrap_or_else(|_| "1800".to_string())
                    .parse()
                    .unwrap_or(1800),
            },
        }
    }
}
