//! Domain models for the backup engine

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default MySQL port
pub const DEFAULT_PORT: u16 = 3306;

/// Default session character set
pub const DEFAULT_CHARSET: &str = "utf8";

/// Name of a table as reported by `SHOW TABLES`
///
/// Kept as the raw bytes the server sent, which are in the session character
/// set and need not be UTF-8.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName(Vec<u8>);

impl TableName {
    pub fn new(name: impl Into<Vec<u8>>) -> Self {
        Self(name.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl From<&str> for TableName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A single column value read from the source database
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// SQL NULL
    Null,
    /// Character data that decoded as UTF-8
    Text(String),
    /// Integer, decimal, floating point or bit values in their textual form
    Numeric(String),
    /// Binary columns, and character data that is not valid UTF-8
    Binary(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Raw bytes of the value as the server sent them; `None` for NULL
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Null => None,
            Value::Text(s) | Value::Numeric(s) => Some(s.as_bytes()),
            Value::Binary(b) => Some(b),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Numeric(n.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// One row, columns in table order
pub type Row = Vec<Value>;

/// A bounded window of rows read from one table
pub type RowBatch = Vec<Row>;

/// Parameters of one backup run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupRequest {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    pub database: String,
    #[serde(default = "default_charset")]
    pub charset: String,
    /// Directory the artifact is written to
    pub backup_dir: String,
    #[serde(default = "default_compress")]
    pub compress: bool,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_charset() -> String {
    DEFAULT_CHARSET.to_string()
}

fn default_compress() -> bool {
    true
}

/// Outcome of a successful run, handed to the front end
#[derive(Debug, Clone, Serialize)]
pub struct BackupReport {
    /// File name of the final artifact, relative to the backup directory
    pub artifact: String,
    /// Rendered progress log
    pub log: String,
}
