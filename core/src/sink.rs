//! Backup file persistence and gzip compression

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::{debug, info};

use crate::error::{CoreError, Result};
use crate::progress::ProgressLog;

/// Read size of the second, compressing pass over the raw file
pub const COMPRESSION_CHUNK_SIZE: usize = 256 * 1024;

/// Maximum gzip compression
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 9;

const ARTIFACT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// `backup-<database>-<YYYY-MM-DD-HH-mm-ss>`
pub fn artifact_stem(database: &str, at: &NaiveDateTime) -> String {
    format!("backup-{}-{}", database, at.format(ARTIFACT_TIMESTAMP_FORMAT))
}

/// Make sure `dir` exists and accepts new files
pub fn prepare_backup_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| {
            CoreError::Directory(format!(
                "Failed to create backup directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        info!("Created backup directory {}", dir.display());
    }

    if !dir.is_dir() {
        return Err(CoreError::Directory(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let probe = dir.join(format!(".write-probe-{}", std::process::id()));
    File::create(&probe).map_err(|e| {
        CoreError::Directory(format!(
            "Backup directory {} is not writable: {}",
            dir.display(),
            e
        ))
    })?;
    let _ = fs::remove_file(&probe);
    Ok(())
}

fn file_name_of(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| CoreError::Write(format!("Invalid artifact path {}", path.display())))
}

/// Suffix of a dump that is still being written
pub const PARTIAL_SUFFIX: &str = ".part";

/// Buffered writer for `<dir>/<stem>.sql`.
///
/// Bytes go to `<stem>.sql.part` until [`DumpWriter::finish`] renames the file,
/// so an aborted run never leaves a file under an artifact name.
pub struct DumpWriter {
    path: PathBuf,
    partial: PathBuf,
    writer: BufWriter<File>,
    bytes_written: u64,
}

impl DumpWriter {
    pub fn create(dir: &Path, stem: &str) -> Result<Self> {
        let path = dir.join(format!("{}.sql", stem));
        let partial = dir.join(format!("{}.sql{}", stem, PARTIAL_SUFFIX));
        let file = File::create(&partial).map_err(|e| {
            CoreError::Write(format!("Could not create {}: {}", partial.display(), e))
        })?;
        debug!("Writing dump to {}", partial.display());
        Ok(Self {
            path,
            partial,
            writer: BufWriter::new(file),
            bytes_written: 0,
        })
    }

    /// File currently being written
    pub fn path(&self) -> &Path {
        &self.partial
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Flush everything to disk, move it to `<stem>.sql` and return that path
    pub fn finish(self) -> Result<PathBuf> {
        let DumpWriter {
            path,
            partial,
            writer,
            ..
        } = self;
        let file = writer
            .into_inner()
            .map_err(|e| CoreError::Write(e.error().to_string()))?;
        file.sync_all()
            .map_err(|e| CoreError::Write(e.to_string()))?;
        fs::rename(&partial, &path).map_err(|e| {
            CoreError::Write(format!(
                "Could not move {} to {}: {}",
                partial.display(),
                path.display(),
                e
            ))
        })?;
        Ok(path)
    }
}

impl Write for DumpWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.writer.write(buf)?;
        self.bytes_written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Compression settings for the second pass
#[derive(Debug, Clone, Copy)]
pub struct CompressionOptions {
    pub level: u32,
    pub chunk_size: usize,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            level: DEFAULT_COMPRESSION_LEVEL,
            chunk_size: COMPRESSION_CHUNK_SIZE,
        }
    }
}

fn gzip_path(raw: &Path) -> PathBuf {
    let mut name = raw.as_os_str().to_owned();
    name.push(".gz");
    PathBuf::from(name)
}

fn write_gzip(raw: &Path, gz: &Path, options: &CompressionOptions) -> io::Result<()> {
    let out = File::create(gz)?;
    let mut encoder = GzEncoder::new(BufWriter::new(out), Compression::new(options.level));
    let mut input = File::open(raw)?;

    let mut chunk = vec![0u8; options.chunk_size.max(1)];
    loop {
        let n = input.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        encoder.write_all(&chunk[..n])?;
    }

    let out = encoder.finish()?;
    out.into_inner().map_err(|e| e.into_error())?.sync_all()
}

/// Compress `raw` into `raw.gz` and delete `raw`.
///
/// On failure the partial `.gz` is removed and the raw file is kept.
pub fn compress_file(raw: &Path, options: &CompressionOptions) -> Result<PathBuf> {
    let gz = gzip_path(raw);

    if let Err(e) = write_gzip(raw, &gz, options) {
        let _ = fs::remove_file(&gz);
        return Err(CoreError::Compression(format!(
            "{}; uncompressed backup kept at {}",
            e,
            raw.display()
        )));
    }

    fs::remove_file(raw).map_err(|e| {
        CoreError::Compression(format!(
            "Compressed to {} but could not remove {}: {}",
            gz.display(),
            raw.display(),
            e
        ))
    })?;
    Ok(gz)
}

/// Turn a finished raw script into the final artifact and return its file name
pub fn finalize_artifact(
    raw: PathBuf,
    compress: bool,
    options: &CompressionOptions,
    log: &mut ProgressLog,
) -> Result<String> {
    if !compress {
        return file_name_of(&raw);
    }

    log.log("Compressing backup file...");
    let gz = compress_file(&raw, options)?;
    log.log("Compression complete");
    file_name_of(&gz)
}

/// Write a complete in-memory script as `<dir>/<stem>.sql`, optionally gzip it
pub fn persist(
    script: &[u8],
    dir: &Path,
    stem: &str,
    compress: bool,
    options: &CompressionOptions,
    log: &mut ProgressLog,
) -> Result<String> {
    let mut writer = DumpWriter::create(dir, stem)?;
    writer
        .write_all(script)
        .map_err(|e| CoreError::Write(e.to_string()))?;
    let raw = writer.finish()?;
    finalize_artifact(raw, compress, options, log)
}
