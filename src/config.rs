//! Configuration Module
//!
//! Handles loading and managing configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::cache::{Ttl, DEFAULT_BETA};

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Memory,
    File,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "file" => Ok(BackendKind::File),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Which storage backend to run on
    pub backend: BackendKind,
    /// Directory for the file backend
    pub cache_dir: PathBuf,
    /// Maximum number of entries the memory backend can hold
    pub max_entries: usize,
    /// Default TTL in seconds, 0 = forever
    pub default_ttl: u64,
    /// Early expiration factor for `get_or_set`
    pub beta: f64,
    /// HTTP server port
    pub server_port: u16,
    /// Garbage collection interval in seconds
    pub gc_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_BACKEND` - `memory` or `file` (default: memory)
    /// - `CACHE_DIR` - File backend directory (default: ./cache-data)
    /// - `MAX_ENTRIES` - Memory backend capacity (default: 1000)
    /// - `DEFAULT_TTL` - Default TTL in seconds, 0 = forever (default: 300)
    /// - `CACHE_BETA` - Early expiration factor (default: 1.0)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `GC_INTERVAL` - Garbage collection frequency in seconds (default: 1)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            backend: parse_var("CACHE_BACKEND").unwrap_or(defaults.backend),
            cache_dir: env::var("CACHE_DIR")
                .ok()
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            max_entries: parse_var("MAX_ENTRIES").unwrap_or(defaults.max_entries),
            default_ttl: parse_var("DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            beta: parse_var("CACHE_BETA").unwrap_or(defaults.beta),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            gc_interval: parse_var("GC_INTERVAL").unwrap_or(defaults.gc_interval),
        }
    }

    /// Default TTL as a value object.
    pub fn default_ttl(&self) -> Ttl {
        match self.default_ttl {
            0 => Ttl::forever(),
            secs => Ttl::seconds(i64::try_from(secs).unwrap_or(i64::MAX)),
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            cache_dir: PathBuf::from("./cache-data"),
            max_entries: 1000,
            default_ttl: 300,
            beta: DEFAULT_BETA,
            server_port: 3000,
            gc_interval: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.max_entries, 1000);
        assert_eq!(config.default_ttl, 300);
        assert_eq!(config.beta, 1.0);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.gc_interval, 1);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        for name in [
            "CACHE_BACKEND",
            "CACHE_DIR",
            "MAX_ENTRIES",
            "DEFAULT_TTL",
            "CACHE_BETA",
            "SERVER_PORT",
            "GC_INTERVAL",
        ] {
            env::remove_var(name);
        }

        let config = Config::from_env();
        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.cache_dir, PathBuf::from("./cache-data"));
        assert_eq!(config.max_entries, 1000);
        assert_eq!(config.default_ttl, 300);
        assert_eq!(config.server_port, 3000);
    }

    #[test]
    fn test_default_ttl_zero_is_forever() {
        let config = Config {
            default_ttl: 0,
            ..Config::default()
        };
        assert!(config.default_ttl().is_forever());

        let config = Config::default();
        assert_eq!(config.default_ttl(), Ttl::seconds(300));
    }

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!("File".parse::<BackendKind>().unwrap(), BackendKind::File);
        assert_eq!(" memory ".parse::<BackendKind>().unwrap(), BackendKind::Memory);
        assert!("redis".parse::<BackendKind>().is_err());
    }
}
