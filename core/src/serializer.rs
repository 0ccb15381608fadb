//! Per-table serialization: schema block, batched row reads and INSERT statements

use std::io::Write;

use tracing::debug;

use crate::adapter::DumpSource;
use crate::domain::{RowBatch, TableName};
use crate::encode::{encode_value, EscapeRules};
use crate::error::{CoreError, Result};

/// Rows read and serialized per INSERT statement
pub const DEFAULT_BATCH_SIZE: u64 = 1000;

/// One ranged read: `LIMIT offset, limit`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: u64,
    pub limit: u64,
}

/// The `ceil(total / batch_size)` windows covering a table
#[derive(Debug, Clone)]
pub struct BatchWindows {
    batch_size: u64,
    next: u64,
    count: u64,
}

impl BatchWindows {
    pub fn new(total_rows: u64, batch_size: u64) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            batch_size,
            next: 0,
            count: total_rows.div_ceil(batch_size),
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

impl Iterator for BatchWindows {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        if self.next >= self.count {
            return None;
        }
        let window = Window {
            offset: self.next * self.batch_size,
            limit: self.batch_size,
        };
        self.next += 1;
        Some(window)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.count - self.next) as usize;
        (remaining, Some(remaining))
    }
}

/// Lazily reads a table one window at a time
pub struct RowBatchReader<'a> {
    table: &'a TableName,
    windows: BatchWindows,
}

impl<'a> RowBatchReader<'a> {
    pub fn new(table: &'a TableName, total_rows: u64, batch_size: u64) -> Self {
        Self {
            table,
            windows: BatchWindows::new(total_rows, batch_size),
        }
    }

    /// Next batch, or `None` once every window has been read
    pub async fn next_batch<S>(&mut self, source: &mut S) -> Result<Option<RowBatch>>
    where
        S: DumpSource + ?Sized,
    {
        match self.windows.next() {
            Some(window) => {
                debug!(
                    "Reading `{}` rows {}..{}",
                    self.table,
                    window.offset,
                    window.offset + window.limit
                );
                let batch = source
                    .fetch_rows(self.table, window.offset, window.limit)
                    .await?;
                Ok(Some(batch))
            }
            None => Ok(None),
        }
    }
}

pub(crate) fn write_err(e: std::io::Error) -> CoreError {
    CoreError::Write(e.to_string())
}

/// `DROP TABLE IF EXISTS` followed by the verbatim creation statement
pub fn schema_block(rules: &EscapeRules, table: &TableName, create_statement: &[u8]) -> Vec<u8> {
    let mut block = b"DROP TABLE IF EXISTS ".to_vec();
    block.extend_from_slice(&rules.quote_identifier(table.as_bytes()));
    block.extend_from_slice(b";\n");
    block.extend_from_slice(create_statement);
    block.extend_from_slice(b";\n\n");
    block
}

/// Retrieve and write the schema block of one table
pub async fn dump_schema<S, W>(source: &mut S, table: &TableName, out: &mut W) -> Result<()>
where
    S: DumpSource + ?Sized,
    W: Write + ?Sized,
{
    let create = source.show_create_table(table).await?;
    out.write_all(&schema_block(source.escape_rules(), table, &create))
        .map_err(write_err)
}

/// One complete INSERT statement for a non-empty batch
pub fn insert_statement(rules: &EscapeRules, table: &TableName, batch: &RowBatch) -> Vec<u8> {
    let mut sql = b"INSERT INTO ".to_vec();
    sql.extend_from_slice(&rules.quote_identifier(table.as_bytes()));
    sql.extend_from_slice(b" VALUES ");
    for (i, row) in batch.iter().enumerate() {
        if i > 0 {
            sql.extend_from_slice(b",\n");
        }
        sql.push(b'(');
        for (j, value) in row.iter().enumerate() {
            if j > 0 {
                sql.push(b',');
            }
            encode_value(rules, value, &mut sql);
        }
        sql.push(b')');
    }
    sql.extend_from_slice(b";\n\n");
    sql
}

/// Write INSERT statements for every non-empty batch of a table.
///
/// Returns the number of row tuples written.
pub async fn dump_data<S, W>(
    source: &mut S,
    table: &TableName,
    total_rows: u64,
    batch_size: u64,
    out: &mut W,
) -> Result<u64>
where
    S: DumpSource + ?Sized,
    W: Write + ?Sized,
{
    let mut reader = RowBatchReader::new(table, total_rows, batch_size);
    let mut written = 0u64;

    while let Some(batch) = reader.next_batch(source).await? {
        if batch.is_empty() {
            continue;
        }
        let statement = insert_statement(source.escape_rules(), table, &batch);
        out.write_all(&statement).map_err(write_err)?;
        written += batch.len() as u64;
    }

    Ok(written)
}
