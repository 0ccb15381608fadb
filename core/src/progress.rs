//! Timestamped milestone log of one backup run

use chrono::{DateTime, Local};
use tracing::info;

/// Format of the timestamp prefix of each rendered line
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single progress entry
#[derive(Debug, Clone)]
pub struct ProgressEntry {
    pub at: DateTime<Local>,
    pub message: String,
}

/// Append-only progress log owned by one engine instance
#[derive(Debug, Clone, Default)]
pub struct ProgressLog {
    entries: Vec<ProgressEntry>,
}

impl ProgressLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message stamped with the current local time
    pub fn log(&mut self, message: impl Into<String>) {
        self.log_at(Local::now(), message);
    }

    pub fn log_at(&mut self, at: DateTime<Local>, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        self.entries.push(ProgressEntry { at, message });
    }

    pub fn entries(&self) -> &[ProgressEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the whole log, one `"<timestamp> - <message>"` line per entry
    pub fn drain(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("{} - {}\n", e.at.format(TIMESTAMP_FORMAT), e.message))
            .collect()
    }
}
