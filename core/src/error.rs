//! Core error types for the backup engine

use thiserror::Error;

/// Core error type for all operations
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("ERROR connecting database: {0}")]
    Connection(String),

    #[error("Backup directory error: {0}")]
    Directory(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Could not write to backup file: {0}")]
    Write(String),

    #[error("Compression failed: {0}")]
    Compression(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::Connection(_) => "connection_error",
            CoreError::Directory(_) => "directory_error",
            CoreError::Query(_) => "query_error",
            CoreError::Write(_) => "write_error",
            CoreError::Compression(_) => "compression_error",
            CoreError::Validation(_) => "validation_error",
            CoreError::Database(_) => "database_error",
            CoreError::Io(_) => "io_error",
        }
    }
}

/// Non-fatal failure while negotiating the session character set.
///
/// Only ever logged; the connection falls back to a raw `SET NAMES`.
#[derive(Error, Debug)]
#[error("Could not set character set '{charset}': {reason}")]
pub struct CharsetWarning {
    pub charset: String,
    pub reason: String,
}

/// Result type alias using CoreError
pub type Result<T> = std::result::Result<T, CoreError>;
