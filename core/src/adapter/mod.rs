//! Database source abstraction used by the backup engine

use crate::domain::{RowBatch, TableName};
use crate::encode::EscapeRules;
use crate::error::Result;
use async_trait::async_trait;

pub mod mysql;

pub use mysql::{ConnectParams, MySqlSource};

/// Read-only access to the database being backed up
///
/// One implementation wraps one exclusively owned session; methods take
/// `&mut self` because every call runs on that session in sequence.
#[async_trait]
pub trait DumpSource: Send {
    /// List all tables in the database, in the server's listing order
    async fn list_tables(&mut self) -> Result<Vec<TableName>>;

    /// The table's creation statement, byte for byte as the server sent it
    async fn show_create_table(&mut self, table: &TableName) -> Result<Vec<u8>>;

    /// Number of rows currently in the table
    async fn count_rows(&mut self, table: &TableName) -> Result<u64>;

    /// Read up to `limit` rows starting at `offset`, natural row order
    async fn fetch_rows(&mut self, table: &TableName, offset: u64, limit: u64)
        -> Result<RowBatch>;

    /// Quoting rules of the session, used to encode values read from it
    fn escape_rules(&self) -> &EscapeRules;
}
