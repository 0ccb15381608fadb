//! MySQL source implementation

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Column, Connection, Executor, Row, TypeInfo};
use tracing::{debug, info, warn};

use crate::adapter::DumpSource;
use crate::domain::{BackupRequest, RowBatch, TableName, Value};
use crate::encode::EscapeRules;
use crate::error::{CharsetWarning, CoreError, Result};

/// Column type names whose text form is a number
const NUMERIC_TYPES: &[&str] = &[
    "BOOLEAN",
    "TINYINT",
    "SMALLINT",
    "MEDIUMINT",
    "INT",
    "BIGINT",
    "FLOAT",
    "DOUBLE",
    "DECIMAL",
    "YEAR",
];

/// Column type names carrying raw bytes
const BINARY_TYPES: &[&str] = &[
    "BINARY",
    "VARBINARY",
    "TINYBLOB",
    "BLOB",
    "MEDIUMBLOB",
    "LONGBLOB",
    "BIT",
    "GEOMETRY",
];

/// How a column's bytes map onto [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Numeric,
    Binary,
    Text,
}

impl ColumnKind {
    fn from_type_name(name: &str) -> Self {
        let base = name.trim_end_matches(" UNSIGNED");
        if NUMERIC_TYPES.contains(&base) {
            ColumnKind::Numeric
        } else if BINARY_TYPES.contains(&base) {
            ColumnKind::Binary
        } else {
            ColumnKind::Text
        }
    }

    fn value(self, bytes: Vec<u8>) -> Value {
        match self {
            ColumnKind::Binary => Value::Binary(bytes),
            ColumnKind::Numeric => match String::from_utf8(bytes) {
                Ok(s) => Value::Numeric(s),
                Err(e) => Value::Binary(e.into_bytes()),
            },
            ColumnKind::Text => match String::from_utf8(bytes) {
                Ok(s) => Value::Text(s),
                Err(e) => Value::Binary(e.into_bytes()),
            },
        }
    }
}

/// Connection parameters for one backup run
#[derive(Debug, Clone)]
pub struct ConnectParams {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
    pub database: String,
    /// Requested session character set
    pub charset: String,
}

impl ConnectParams {
    pub fn from_request(req: &BackupRequest) -> Self {
        Self {
            host: req.host.clone(),
            port: req.port,
            username: req.username.clone(),
            password: req.password.clone(),
            database: req.database.clone(),
            charset: req.charset.clone(),
        }
    }

    /// Connection URL for log output, never includes the password
    pub fn display_url(&self) -> String {
        format!(
            "mysql://{}@{}:{}/{}",
            self.username, self.host, self.port, self.database
        )
    }

    fn connect_options(&self) -> MySqlConnectOptions {
        let options = MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .database(&self.database);

        match self.password {
            Some(ref password) => options.password(password),
            None => options,
        }
    }
}

/// Character set names are interpolated into `SET NAMES`, so only plain identifiers pass
fn is_valid_charset_name(charset: &str) -> bool {
    !charset.is_empty()
        && charset.len() <= 64
        && charset
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A single, exclusively owned MySQL session
pub struct MySqlSource {
    conn: MySqlConnection,
    rules: EscapeRules,
}

impl MySqlSource {
    /// Open a session and configure its character set
    pub async fn connect(params: &ConnectParams) -> Result<Self> {
        if !is_valid_charset_name(&params.charset) {
            return Err(CoreError::Validation(format!(
                "Invalid character set name: {:?}",
                params.charset
            )));
        }

        info!("Connecting to {}", params.display_url());
        let mut conn = MySqlConnection::connect_with(&params.connect_options())
            .await
            .map_err(|e| CoreError::Connection(e.to_string()))?;

        // Render TIMESTAMP columns in the server's own zone, as a plain client would
        if let Err(e) = conn.execute("SET time_zone = @@GLOBAL.time_zone").await {
            warn!("Could not reset session time zone: {}", e);
        }

        if let Err(warning) = Self::negotiate_charset(&mut conn, &params.charset).await {
            warn!("{}, falling back to SET NAMES", warning);
            let fallback = format!("SET NAMES {}", params.charset);
            if let Err(e) = conn.execute(fallback.as_str()).await {
                warn!("Fallback '{}' failed: {}", fallback, e);
            }
        }

        let rules = Self::session_escape_rules(&mut conn).await.map_err(|e| {
            CoreError::Connection(format!("Failed to read session settings: {}", e))
        })?;
        debug!(
            "Session charset {}, NO_BACKSLASH_ESCAPES={}",
            rules.charset(),
            rules.no_backslash_escapes()
        );

        Ok(Self { conn, rules })
    }

    /// Close the session, flushing the protocol-level goodbye
    pub async fn close(self) -> Result<()> {
        self.conn.close().await?;
        Ok(())
    }

    async fn negotiate_charset(
        conn: &mut MySqlConnection,
        charset: &str,
    ) -> std::result::Result<(), CharsetWarning> {
        let warning = |reason: String| CharsetWarning {
            charset: charset.to_string(),
            reason,
        };

        // MySQL 8 lists the legacy `utf8` alias as `utf8mb3`
        let alias = if charset.eq_ignore_ascii_case("utf8") {
            "utf8mb3"
        } else {
            charset
        };

        let known = sqlx::query(
            "SELECT CHARACTER_SET_NAME FROM information_schema.CHARACTER_SETS \
             WHERE CHARACTER_SET_NAME = ? OR CHARACTER_SET_NAME = ?",
        )
        .bind(charset)
        .bind(alias)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| warning(e.to_string()))?;

        if known.is_none() {
            return Err(warning("unknown character set".to_string()));
        }

        conn.execute(format!("SET NAMES {}", charset).as_str())
            .await
            .map_err(|e| warning(e.to_string()))?;
        Ok(())
    }

    async fn session_escape_rules(conn: &mut MySqlConnection) -> Result<EscapeRules> {
        let row = conn
            .fetch_one("SELECT @@character_set_client, @@SESSION.sql_mode")
            .await?;
        let charset = column_text(&row, 0)?;
        let sql_mode = column_text(&row, 1)?;
        Ok(EscapeRules::from_session(&charset, &sql_mode))
    }

    fn query_error(what: &str, table: &TableName, e: sqlx::Error) -> CoreError {
        CoreError::Query(format!("{} for table `{}` failed: {}", what, table, e))
    }

    /// Run `<prefix><quoted table><suffix>` and collect every row
    async fn query_table(
        &mut self,
        prefix: &str,
        table: &TableName,
        suffix: &str,
    ) -> sqlx::Result<Vec<MySqlRow>> {
        let ident = self.rules.quote_identifier(table.as_bytes());
        let assemble = match std::str::from_utf8(&ident) {
            Ok(ident) => {
                let sql = format!("{}{}{}", prefix, ident, suffix);
                return self.conn.fetch_all(sql.as_str()).await;
            }
            Err(_) => assemble_statement(prefix, &ident, self.rules.charset(), suffix),
        };

        // Query text must be UTF-8, so the server splices the name in from a hex literal
        self.conn.execute(assemble.as_str()).await?;
        self.conn
            .execute(format!("PREPARE {} FROM @{}", STATEMENT_NAME, STATEMENT_NAME).as_str())
            .await?;
        let rows = self
            .conn
            .fetch_all(format!("EXECUTE {}", STATEMENT_NAME).as_str())
            .await;
        let release = format!("DEALLOCATE PREPARE {}", STATEMENT_NAME);
        if let Err(e) = self.conn.execute(release.as_str()).await {
            debug!("Could not release prepared statement: {}", e);
        }
        rows
    }
}

/// Session variable and prepared statement used for non-UTF-8 table names
const STATEMENT_NAME: &str = "backup_table_stmt";

/// `SET` statement building the full query text server side
fn assemble_statement(prefix: &str, ident: &[u8], charset: &str, suffix: &str) -> String {
    format!(
        "SET @{} = CONCAT('{}', CONVERT(X'{}' USING {}), '{}')",
        STATEMENT_NAME,
        prefix,
        hex::encode_upper(ident),
        charset,
        suffix
    )
}

/// Column `idx` as raw bytes, NULL read as empty
fn column_bytes(row: &MySqlRow, idx: usize) -> Result<Vec<u8>> {
    let bytes: Option<Vec<u8>> = row.try_get_unchecked(idx)?;
    Ok(bytes.unwrap_or_default())
}

/// Column `idx` as text, for ASCII session variables
fn column_text(row: &MySqlRow, idx: usize) -> Result<String> {
    String::from_utf8(column_bytes(row, idx)?)
        .map_err(|e| CoreError::Query(format!("Column {} is not valid UTF-8: {}", idx, e)))
}

/// Convert one text-protocol row into tagged values
fn decode_row(row: &MySqlRow) -> Result<Vec<Value>> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| -> Result<Value> {
            let raw: Option<Vec<u8>> = row.try_get_unchecked(idx)?;
            Ok(match raw {
                None => Value::Null,
                Some(bytes) => {
                    ColumnKind::from_type_name(column.type_info().name()).value(bytes)
                }
            })
        })
        .collect()
}

// Statements below run as plain text queries: the server answers in the
// text protocol, so every value arrives as the literal a client would print.
#[async_trait]
impl DumpSource for MySqlSource {
    async fn list_tables(&mut self) -> Result<Vec<TableName>> {
        let rows = self
            .conn
            .fetch_all("SHOW TABLES")
            .await
            .map_err(|e| CoreError::Query(format!("SHOW TABLES failed: {}", e)))?;

        rows.iter()
            .map(|row| column_bytes(row, 0).map(TableName::new))
            .collect()
    }

    async fn show_create_table(&mut self, table: &TableName) -> Result<Vec<u8>> {
        let rows = self
            .query_table("SHOW CREATE TABLE ", table, "")
            .await
            .map_err(|e| Self::query_error("SHOW CREATE TABLE", table, e))?;
        let row = rows.first().ok_or_else(|| {
            CoreError::Query(format!("SHOW CREATE TABLE for table `{}` returned no row", table))
        })?;
        column_bytes(row, 1)
    }

    async fn count_rows(&mut self, table: &TableName) -> Result<u64> {
        let rows = self
            .query_table("SELECT COUNT(*) FROM ", table, "")
            .await
            .map_err(|e| Self::query_error("Row count", table, e))?;
        let row = rows.first().ok_or_else(|| {
            CoreError::Query(format!("Row count for table `{}` returned no row", table))
        })?;
        let count: i64 = row
            .try_get(0)
            .map_err(|e| Self::query_error("Row count", table, e))?;
        Ok(count.max(0) as u64)
    }

    async fn fetch_rows(
        &mut self,
        table: &TableName,
        offset: u64,
        limit: u64,
    ) -> Result<RowBatch> {
        let window = format!(" LIMIT {},{}", offset, limit);
        let rows = self
            .query_table("SELECT * FROM ", table, &window)
            .await
            .map_err(|e| Self::query_error("Row read", table, e))?;

        rows.iter().map(decode_row).collect()
    }

    fn escape_rules(&self) -> &EscapeRules {
        &self.rules
    }
}
