//! MySQL Backup Core Library
//!
//! The export engine: enumerates tables, serializes schema and rows into a
//! re-importable SQL script, and streams it into an optionally gzipped file.

pub mod adapter;
pub mod artifact;
pub mod domain;
pub mod encode;
pub mod engine;
pub mod error;
pub mod progress;
pub mod serializer;
pub mod sink;

#[cfg(test)]
mod testing;

pub use engine::{BackupEngine, EngineConfig};
pub use error::{CoreError, Result};
