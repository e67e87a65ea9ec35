//! Persistent audit log at `~/.agt/agt.log`.
//!
//! One JSON object per line. This is product output, separate from the
//! `tracing` diagnostics in [`crate::logging`]: every external command is
//! recorded here regardless of `AGT_LOG`. Write failures are reported through
//! `tracing` and never fail a workflow.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::core::error::ClassifiedError;
use crate::core::types::CommandSpec;

pub const LOG_FILE_NAME: &str = "agt.log";
pub const MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;
pub const MAX_BACKUPS: usize = 3;
pub const DEFAULT_TAIL_LINES: usize = 50;

/// Overrides the directory holding the log (default `~/.agt`).
pub const HOME_ENV: &str = "AGT_HOME";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: String,
    pub level: Level,
    pub message: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl LogRecord {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            level,
            message: message.into(),
            fields: Map::new(),
        }
    }

    pub fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }
}

/// Outcome of one external command, as recorded.
#[derive(Debug, Clone, Copy)]
pub enum CommandOutcome<'a> {
    Ok { exit_code: i32 },
    Failed(&'a ClassifiedError),
}

#[derive(Debug, Clone)]
pub struct AuditLog {
    dir: PathBuf,
    max_bytes: u64,
    max_backups: usize,
}

impl AuditLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_bytes: MAX_LOG_BYTES,
            max_backups: MAX_BACKUPS,
        }
    }

    pub fn with_limits(mut self, max_bytes: u64, max_backups: usize) -> Self {
        self.max_bytes = max_bytes;
        self.max_backups = max_backups;
        self
    }

    /// `$AGT_HOME`, else `~/.agt`. `None` when no home directory is known.
    pub fn default_dir() -> Option<PathBuf> {
        if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Some(PathBuf::from(dir));
        }
        dirs_next::home_dir().map(|home| home.join(".agt"))
    }

    pub fn at_default_location() -> Option<Self> {
        Self::default_dir().map(Self::new)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(LOG_FILE_NAME)
    }

    /// Append a record, rotating first if the file is over the size limit.
    pub fn append(&self, record: &LogRecord) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create log dir {}", self.dir.display()))?;
        self.rotate_if_needed()?;

        let mut line = serde_json::to_string(record).context("serialize log record")?;
        line.push('\n');
        let path = self.path();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open {}", path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("append {}", path.display()))
    }

    /// Like [`append`](Self::append) but never fails.
    pub fn write(&self, record: LogRecord) {
        if let Err(err) = self.append(&record) {
            warn!(err = %format!("{err:#}"), "failed to write audit log");
        }
    }

    pub fn info(&self, message: &str) {
        self.write(LogRecord::new(Level::Info, message));
    }

    pub fn error(&self, err: &ClassifiedError, operation: &str) {
        let mut record = LogRecord::new(Level::Error, err.message())
            .field("operation", operation)
            .field("kind", err.kind().code());
        for (key, value) in err.context() {
            record = record.field(key, value.as_str());
        }
        self.write(record);
    }

    pub fn command(&self, spec: &CommandSpec, outcome: CommandOutcome<'_>, elapsed: Duration) {
        let mut record = LogRecord::new(Level::Info, format!("Executing command: {spec}"))
            .field("program", spec.program())
            .field("args", spec.args().to_vec())
            .field("duration_ms", elapsed.as_millis() as u64);
        record = match outcome {
            CommandOutcome::Ok { exit_code } => {
                record.field("outcome", "ok").field("exit_code", exit_code)
            }
            CommandOutcome::Failed(err) => {
                record.level = Level::Error;
                let record = record.field("outcome", err.kind().code());
                match err.context().get("exit_code").and_then(|c| c.parse::<i64>().ok()) {
                    Some(code) => record.field("exit_code", code),
                    None => record,
                }
            }
        };
        self.write(record);
    }

    /// Last `n` parseable records, oldest first. Missing file yields none.
    pub fn tail(&self, n: usize) -> Result<Vec<LogRecord>> {
        let path = self.path();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err).with_context(|| format!("read {}", path.display())),
        };
        let records: Vec<LogRecord> = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();
        let skip = records.len().saturating_sub(n);
        Ok(records.into_iter().skip(skip).collect())
    }

    /// Backup files, oldest first.
    pub fn backups(&self) -> Result<Vec<PathBuf>> {
        let mut backups = Vec::new();
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(backups),
            Err(err) => {
                return Err(err).with_context(|| format!("read dir {}", self.dir.display()));
            }
        };
        for entry in entries {
            let entry = entry.context("read dir entry")?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with("agt.log.") && name.ends_with(".bak") {
                backups.push(entry.path());
            }
        }
        backups.sort();
        Ok(backups)
    }

    fn rotate_if_needed(&self) -> Result<()> {
        let path = self.path();
        let size = match fs::metadata(&path) {
            Ok(meta) => meta.len(),
            Err(_) => return Ok(()),
        };
        if size <= self.max_bytes {
            return Ok(());
        }

        let mut millis = Utc::now().timestamp_millis();
        let mut backup = self.dir.join(format!("{LOG_FILE_NAME}.{millis}.bak"));
        while backup.exists() {
            millis += 1;
            backup = self.dir.join(format!("{LOG_FILE_NAME}.{millis}.bak"));
        }
        fs::rename(&path, &backup)
            .with_context(|| format!("rotate {} to {}", path.display(), backup.display()))?;

        let backups = self.backups()?;
        let excess = backups.len().saturating_sub(self.max_backups);
        for old in backups.iter().take(excess) {
            fs::remove_file(old).with_context(|| format!("remove {}", old.display()))?;
        }
        Ok(())
    }
}
