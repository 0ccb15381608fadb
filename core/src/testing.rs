//! Test doubles for `DumpSource`

use async_trait::async_trait;
use mockall::mock;

use crate::adapter::DumpSource;
use crate::domain::{Row, RowBatch, TableName, Value};
use crate::encode::EscapeRules;
use crate::error::{CoreError, Result};

struct MemoryTable {
    name: TableName,
    create: Vec<u8>,
    rows: Vec<Row>,
}

/// Tables held in memory, listed in insertion order
#[derive(Default)]
pub struct MemorySource {
    tables: Vec<MemoryTable>,
    rules: EscapeRules,
    fetches: Vec<(u64, u64)>,
    fail_count_for: Option<TableName>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(self, name: &str, create: &str, rows: Vec<Row>) -> Self {
        self.with_raw_table(name.as_bytes(), create.as_bytes(), rows)
    }

    /// A table whose name and creation statement are session-charset bytes
    pub fn with_raw_table(mut self, name: &[u8], create: &[u8], rows: Vec<Row>) -> Self {
        self.tables.push(MemoryTable {
            name: TableName::new(name),
            create: create.to_vec(),
            rows,
        });
        self
    }

    /// A two-column table `(id, label)` with `rows` rows
    pub fn with_numbered_table(self, name: &str, rows: u64) -> Self {
        let create = format!(
            "CREATE TABLE `{}` (\n  `id` int NOT NULL,\n  `label` varchar(32)\n) ENGINE=InnoDB",
            name
        );
        let rows = (0..rows)
            .map(|i| vec![Value::from(i as i64), Value::Text(format!("item-{}", i))])
            .collect();
        self.with_table(name, &create, rows)
    }

    pub fn with_rules(mut self, rules: EscapeRules) -> Self {
        self.rules = rules;
        self
    }

    /// Make `COUNT(*)` fail for one table
    pub fn failing_count(mut self, name: &str) -> Self {
        self.fail_count_for = Some(TableName::new(name));
        self
    }

    /// Every `(offset, limit)` read so far
    pub fn fetch_log(&self) -> &[(u64, u64)] {
        &self.fetches
    }

    fn table(&self, name: &TableName) -> Result<&MemoryTable> {
        self.tables
            .iter()
            .find(|t| &t.name == name)
            .ok_or_else(|| CoreError::Query(format!("Table '{}' doesn't exist", name)))
    }
}

#[async_trait]
impl DumpSource for MemorySource {
    async fn list_tables(&mut self) -> Result<Vec<TableName>> {
        Ok(self.tables.iter().map(|t| t.name.clone()).collect())
    }

    async fn show_create_table(&mut self, table: &TableName) -> Result<Vec<u8>> {
        Ok(self.table(table)?.create.clone())
    }

    async fn count_rows(&mut self, table: &TableName) -> Result<u64> {
        if self.fail_count_for.as_ref() == Some(table) {
            return Err(CoreError::Query(format!(
                "Row count for table `{}` failed: lost connection",
                table
            )));
        }
        Ok(self.table(table)?.rows.len() as u64)
    }

    async fn fetch_rows(
        &mut self,
        table: &TableName,
        offset: u64,
        limit: u64,
    ) -> Result<RowBatch> {
        self.fetches.push((offset, limit));
        let rows = &self.table(table)?.rows;
        Ok(rows
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    fn escape_rules(&self) -> &EscapeRules {
        &self.rules
    }
}

mock! {
    pub Source {}

    #[async_trait]
    impl DumpSource for Source {
        async fn list_tables(&mut self) -> Result<Vec<TableName>>;
        async fn show_create_table(&mut self, table: &TableName) -> Result<Vec<u8>>;
        async fn count_rows(&mut self, table: &TableName) -> Result<u64>;
        async fn fetch_rows(
            &mut self,
            table: &TableName,
            offset: u64,
            limit: u64,
        ) -> Result<RowBatch>;
        fn escape_rules(&self) -> &EscapeRules;
    }
}
