//! Application configuration

use anyhow::{Context, Result};

use mysql_backup_core::serializer::DEFAULT_BATCH_SIZE;
use mysql_backup_core::sink::{CompressionOptions, DEFAULT_COMPRESSION_LEVEL};
use mysql_backup_core::EngineConfig;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Directory backups are written to and downloaded from
    pub backup_root: String,
    /// Rows per INSERT statement
    pub batch_size: u64,
    /// gzip level for compressed artifacts
    pub compression_level: u32,
    /// Character set used when a request names none
    pub default_charset: String,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: var("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse()
                .context("Invalid PORT")?,
            backup_root: var("BACKUP_ROOT").unwrap_or_else(|| "/var/backups/mysql".to_string()),
            batch_size: var("BATCH_SIZE")
                .unwrap_or_else(|| DEFAULT_BATCH_SIZE.to_string())
                .parse()
                .context("Invalid BATCH_SIZE")?,
            compression_level: var("COMPRESSION_LEVEL")
                .unwrap_or_else(|| DEFAULT_COMPRESSION_LEVEL.to_string())
                .parse()
                .context("Invalid COMPRESSION_LEVEL")?,
            default_charset: var("DEFAULT_CHARSET").unwrap_or_else(|| "utf8".to_string()),
        })
    }

    /// Engine settings derived from this configuration
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            batch_size: self.batch_size,
            compression: CompressionOptions {
                level: self.compression_level,
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_config_defaults() {
        let config = load(&[]).unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.compression_level, 9);
        assert_eq!(config.default_charset, "utf8");
    }

    #[test]
    fn test_config_overrides() {
        let config = load(&[
            ("BACKUP_ROOT", "/srv/backups"),
            ("BATCH_SIZE", "250"),
            ("COMPRESSION_LEVEL", "1"),
        ])
        .unwrap();

        assert_eq!(config.backup_root, "/srv/backups");
        assert_eq!(config.batch_size, 250);
        assert_eq!(config.compression_level, 1);
    }

    #[test]
    fn test_invalid_batch_size() {
        assert!(load(&[("BATCH_SIZE", "lots")]).is_err());
    }

    #[test]
    fn test_engine_config() {
        let config = AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            backup_root: "/tmp".to_string(),
            batch_size: 250,
            compression_level: 6,
            default_charset: "utf8mb4".to_string(),
        };
        let engine = config.engine_config();
        assert_eq!(engine.batch_size, 250);
        assert_eq!(engine.compression.level, 6);
        assert_eq!(engine.compression.chunk_size, 256 * 1024);
    }
}
