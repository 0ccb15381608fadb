//! Backup engine: assembles the dump script and drives it into the sink

use std::io::Write;
use std::path::Path;

use chrono::{Local, NaiveDateTime};
use tracing::{info, warn};

use crate::adapter::{ConnectParams, DumpSource, MySqlSource};
use crate::domain::BackupRequest;
use crate::error::{CoreError, Result};
use crate::progress::ProgressLog;
use crate::serializer::{dump_data, dump_schema, write_err, DEFAULT_BATCH_SIZE};
use crate::sink::{
    artifact_stem, finalize_artifact, prepare_backup_dir, CompressionOptions, DumpWriter,
};

/// Disables referential checks so tables load in listing order
pub const FOREIGN_KEY_CHECKS_OFF: &[u8] = b"SET foreign_key_checks = 0;\n\n";

/// Last statement of every dump, nothing follows it
pub const FOREIGN_KEY_CHECKS_ON: &[u8] = b"SET foreign_key_checks = 1;";

/// Engine tuning
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Rows per ranged read and per INSERT statement
    pub batch_size: u64,
    pub compression: CompressionOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            compression: CompressionOptions::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(CoreError::Validation(
                "batch size must be at least 1".to_string(),
            ));
        }
        if self.compression.level > 9 {
            return Err(CoreError::Validation(format!(
                "compression level {} is outside 0..=9",
                self.compression.level
            )));
        }
        if self.compression.chunk_size == 0 {
            return Err(CoreError::Validation(
                "compression chunk size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Totals of one dump
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DumpStats {
    pub tables: usize,
    pub rows: u64,
}

/// One backup run and its progress log
pub struct BackupEngine {
    config: EngineConfig,
    log: ProgressLog,
}

impl BackupEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            log: ProgressLog::new(),
        }
    }

    pub fn log(&self) -> &ProgressLog {
        &self.log
    }

    pub fn into_log(self) -> ProgressLog {
        self.log
    }

    /// Connect, dump every table into `request.backup_dir` and return the artifact name.
    ///
    /// The connection is opened before the backup directory is touched and
    /// closed again whether or not the dump succeeds.
    pub async fn run(&mut self, request: &BackupRequest) -> Result<String> {
        self.config.validate()?;

        let params = ConnectParams::from_request(request);
        let mut source = MySqlSource::connect(&params).await?;

        let at = Local::now().naive_local();
        let result = self.backup_with_source(&mut source, request, at).await;

        if let Err(e) = source.close().await {
            warn!("Error closing connection: {}", e);
        }
        result
    }

    /// Everything after the connection is open
    pub async fn backup_with_source<S>(
        &mut self,
        source: &mut S,
        request: &BackupRequest,
        at: NaiveDateTime,
    ) -> Result<String>
    where
        S: DumpSource + ?Sized,
    {
        let dir = Path::new(&request.backup_dir);
        prepare_backup_dir(dir)?;

        self.log
            .log(format!("Starting backup of database {}", request.database));
        let stem = artifact_stem(&request.database, &at);
        let artifact = self
            .backup_to_dir(source, dir, &stem, request.compress)
            .await?;
        self.log.log(format!("Backup completed: {}", artifact));
        Ok(artifact)
    }

    /// Stream the dump into `<dir>/<stem>.sql`, then compress it if asked
    pub async fn backup_to_dir<S>(
        &mut self,
        source: &mut S,
        dir: &Path,
        stem: &str,
        compress: bool,
    ) -> Result<String>
    where
        S: DumpSource + ?Sized,
    {
        let mut writer = DumpWriter::create(dir, stem)?;

        let stats = match self.write_dump(source, &mut writer).await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(
                    "Backup aborted, incomplete dump left at {}",
                    writer.path().display()
                );
                return Err(e);
            }
        };
        info!(
            "Dumped {} tables, {} rows, {} bytes",
            stats.tables,
            stats.rows,
            writer.bytes_written()
        );

        let raw = writer.finish()?;
        finalize_artifact(raw, compress, &self.config.compression, &mut self.log)
    }

    /// Write the complete dump script to `out`
    pub async fn write_dump<S, W>(&mut self, source: &mut S, out: &mut W) -> Result<DumpStats>
    where
        S: DumpSource + ?Sized,
        W: Write + ?Sized,
    {
        let tables = source.list_tables().await?;
        let mut stats = DumpStats::default();

        out.write_all(FOREIGN_KEY_CHECKS_OFF).map_err(write_err)?;

        for table in &tables {
            self.log.log(format!("Backing up table: {}", table));
            dump_schema(source, table, out).await?;

            let count = source.count_rows(table).await?;
            if count > 0 {
                stats.rows += dump_data(source, table, count, self.config.batch_size, out).await?;
            }
            stats.tables += 1;
        }

        out.write_all(FOREIGN_KEY_CHECKS_ON).map_err(write_err)?;
        out.flush().map_err(write_err)?;
        Ok(stats)
    }
}
