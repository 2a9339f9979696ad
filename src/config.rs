// ABOUTME: Client configuration loaded from TOML with command-line overrides
// Resolves the relay endpoint from the configured origin

use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::relay::protocol::Geometry;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid URL '{0}': {1}")]
    InvalidUrl(String, url::ParseError),

    #[error("Unsupported origin scheme '{0}', expected http, https, ws or wss")]
    UnsupportedScheme(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Origin the relay is served from, e.g. `http://127.0.0.1:8000`
    pub origin: String,

    /// Relay path on that origin
    pub path: String,

    /// Full endpoint URL; skips origin/path resolution when set
    pub endpoint: Option<String>,

    /// Geometry used until the surface has been measured
    pub default_cols: u16,
    pub default_rows: u16,

    /// Where log files are written
    pub log_dir: Option<PathBuf>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            origin: "http://127.0.0.1:8000".to_string(),
            path: "/ws".to_string(),
            endpoint: None,
            default_cols: 80,
            default_rows: 24,
            log_dir: None,
        }
    }
}

/// Values given on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub origin: Option<String>,
    pub path: Option<String>,
    pub endpoint: Option<String>,
    pub default_cols: Option<u16>,
    pub default_rows: Option<u16>,
    pub log_dir: Option<PathBuf>,
}

impl RelayConfig {
    /// Default config file location, `$XDG_CONFIG_HOME/webrelay/config.toml` on Linux
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "webrelay").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from `path`, or from the default location when `None`.
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(path) => path,
            None => return Ok(Self::default()),
        };

        if !path.exists() {
            debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;

        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    #[must_use]
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(origin) = overrides.origin {
            self.origin = origin;
        }
        if let Some(path) = overrides.path {
            self.path = path;
        }
        if let Some(endpoint) = overrides.endpoint {
            self.endpoint = Some(endpoint);
        }
        if let Some(cols) = overrides.default_cols {
            self.default_cols = cols;
        }
        if let Some(rows) = overrides.default_rows {
            self.default_rows = rows;
        }
        if let Some(log_dir) = overrides.log_dir {
            self.log_dir = Some(log_dir);
        }
        self
    }

    pub const fn default_geometry(&self) -> Geometry {
        Geometry::new(self.default_cols, self.default_rows)
    }

    /// WebSocket endpoint to connect to
    pub fn endpoint(&self) -> Result<Url, ConfigError> {
        if let Some(endpoint) = &self.endpoint {
            let url = Url::parse(endpoint)
                .map_err(|e| ConfigError::InvalidUrl(endpoint.clone(), e))?;
            return match url.scheme() {
                "ws" | "wss" => Ok(url),
                other => Err(ConfigError::UnsupportedScheme(other.to_string())),
            };
        }

        let origin =
            Url::parse(&self.origin).map_err(|e| ConfigError::InvalidUrl(self.origin.clone(), e))?;
        endpoint_for_origin(&origin, &self.path)
    }

    /// Log directory, `~/.webrelay/logs` unless configured
    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| {
            BaseDirs::new().map_or_else(
                || PathBuf::from(".webrelay/logs"),
                |dirs| dirs.home_dir().join(".webrelay").join("logs"),
            )
        })
    }
}

/// Relay endpoint for a page origin: secure origins get `wss`, plain ones `ws`
pub fn endpoint_for_origin(origin: &Url, path: &str) -> Result<Url, ConfigError> {
    let scheme = match origin.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
    };

    // Only scheme, host and port of the origin survive
    let host = origin.host_str().unwrap_or_default();
    let authority = match origin.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };

    let raw = format!("{scheme}://{authority}{path}");
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(raw, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoint() {
        let config = RelayConfig::default();
        assert_eq!(config.endpoint().unwrap().as_str(), "ws://127.0.0.1:8000/ws");
    }

    #[test]
    fn test_origin_path_is_replaced() {
        let origin = Url::parse("https://relay.example.com/app/index.html?x=1").unwrap();
        let endpoint = endpoint_for_origin(&origin, "ws").unwrap();
        assert_eq!(endpoint.as_str(), "wss://relay.example.com/ws");
    }
}
