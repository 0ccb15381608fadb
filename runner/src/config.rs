//! Runner configuration

use anyhow::{Context, Result};

use mysql_backup_core::domain::{BackupRequest, DEFAULT_CHARSET, DEFAULT_PORT};
use mysql_backup_core::serializer::DEFAULT_BATCH_SIZE;
use mysql_backup_core::EngineConfig;

/// Runner configuration
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// MySQL host
    pub host: String,
    /// MySQL port
    pub port: u16,
    /// MySQL user
    pub user: String,
    /// MySQL password
    pub password: Option<String>,
    /// Database to back up
    pub database: String,
    /// Session character set
    pub charset: String,
    /// Directory the artifact is written to
    pub backup_dir: String,
    /// Gzip the finished dump
    pub compress: bool,
    /// Rows per INSERT statement
    pub batch_size: u64,
}

impl RunnerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            host: var("BACKUP_HOST").unwrap_or_else(|| "localhost".to_string()),
            port: var("BACKUP_PORT")
                .unwrap_or_else(|| DEFAULT_PORT.to_string())
                .parse()
                .context("Invalid BACKUP_PORT")?,
            user: var("BACKUP_USER").context("BACKUP_USER is required")?,
            password: var("BACKUP_PASSWORD").filter(|p| !p.is_empty()),
            database: var("BACKUP_DATABASE").context("BACKUP_DATABASE is required")?,
            charset: var("BACKUP_CHARSET").unwrap_or_else(|| DEFAULT_CHARSET.to_string()),
            backup_dir: var("BACKUP_DIR").unwrap_or_else(|| "./backups".to_string()),
            compress: var("BACKUP_COMPRESS")
                .unwrap_or_else(|| "true".to_string())
                .parse()
                .context("Invalid BACKUP_COMPRESS")?,
            batch_size: var("BACKUP_BATCH_SIZE")
                .unwrap_or_else(|| DEFAULT_BATCH_SIZE.to_string())
                .parse()
                .context("Invalid BACKUP_BATCH_SIZE")?,
        })
    }

    /// Build the engine request
    pub fn request(&self) -> BackupRequest {
        BackupRequest {
            host: self.host.clone(),
            port: self.port,
            username: self.user.clone(),
            password: self.password.clone(),
            database: self.database.clone(),
            charset: self.charset.clone(),
            backup_dir: self.backup_dir.clone(),
            compress: self.compress,
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            batch_size: self.batch_size,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<RunnerConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RunnerConfig::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("BACKUP_USER", "root"), ("BACKUP_DATABASE", "shop")]).unwrap();

        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 3306);
        assert_eq!(config.charset, "utf8");
        assert_eq!(config.backup_dir, "./backups");
        assert!(config.compress);
        assert_eq!(config.batch_size, 1000);
        assert!(config.password.is_none());
    }

    #[test]
    fn test_database_required() {
        let err = load(&[("BACKUP_USER", "root")]).unwrap_err();
        assert!(err.to_string().contains("BACKUP_DATABASE is required"));
    }

    #[test]
    fn test_request_from_config() {
        let config = load(&[
            ("BACKUP_USER", "root"),
            ("BACKUP_PASSWORD", "secret"),
            ("BACKUP_DATABASE", "shop"),
            ("BACKUP_COMPRESS", "false"),
            ("BACKUP_BATCH_SIZE", "500"),
        ])
        .unwrap();

        let request = config.request();
        assert_eq!(request.password.as_deref(), Some("secret"));
        assert!(!request.compress);
        assert_eq!(config.engine_config().batch_size, 500);
    }

    #[test]
    fn test_invalid_compress_flag() {
        let err = load(&[
            ("BACKUP_USER", "root"),
            ("BACKUP_DATABASE", "shop"),
            ("BACKUP_COMPRESS", "maybe"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("Invalid BACKUP_COMPRESS"));
    }
}
