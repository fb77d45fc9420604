//! FILENAME: app/src/logging.rs
//! PURPOSE: Unified logging sink for the service.
//! CONTEXT: The crates log through the `log` facade with their category as the
//! target (see `engine::logging`). This module installs the one logger that
//! turns those records into `seq|level|category|message` lines.

use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};
use log::{Level, LevelFilter, Log, Metadata, Record};
use once_cell::sync::OnceCell;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

// ============================================================================
// UNIFIED LOGGING SYSTEM
// ============================================================================

/// Global sequence counter shared by every log line.
static LOG_SEQ: AtomicU64 = AtomicU64::new(0);

static LOGGER: OnceCell<SeqLogger> = OnceCell::new();

/// Get next sequence number
pub fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst) + 1
}

/// Single-letter level tag used in the unified format.
pub fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Error => "E",
        Level::Warn => "W",
        Level::Info => "I",
        Level::Debug => "D",
        Level::Trace => "T",
    }
}

pub fn format_line(seq: u64, level: Level, category: &str, message: &str) -> String {
    format!("{}|{}|{}|{}", seq, level_tag(level), category, message)
}

/// `log::Log` implementation writing unified lines to a file or stderr.
pub struct SeqLogger {
    level: LevelFilter,
    file: Option<Mutex<File>>,
    path: Option<PathBuf>,
}

impl SeqLogger {
    pub fn new(level: LevelFilter, path: Option<PathBuf>) -> ServiceResult<Self> {
        let file = match &path {
            Some(p) => Some(Mutex::new(
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(p)
                    .map_err(|e| {
                        ServiceError::Config(format!("cannot open log file {}: {}", p.display(), e))
                    })?,
            )),
            None => None,
        };
        Ok(SeqLogger { level, file, path })
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    fn write_line(&self, line: &str) {
        match &self.file {
            Some(file) => {
                let mut file = file.lock().unwrap_or_else(|e| e.into_inner());
                if let Err(e) = writeln!(file, "{}", line) {
                    eprintln!("[LOG_ERROR] Failed to write: {}", e);
                }
                let _ = file.flush();
            }
            None => eprintln!("{}", line),
        }
    }
}

impl Log for SeqLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(
            next_seq(),
            record.level(),
            record.target(),
            &record.args().to_string(),
        );
        self.write_line(&line);
    }

    fn flush(&self) {
        if let Some(file) = &self.file {
            let _ = file.lock().unwrap_or_else(|e| e.into_inner()).flush();
        }
    }
}

/// Installs the unified logger. Only the first call has an effect; later
/// calls (and a logger installed by someone else) are left alone.
pub fn init_logging(config: &ServiceConfig) -> ServiceResult<()> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let level = config.level_filter()?;
    let logger = LOGGER.get_or_try_init(|| SeqLogger::new(level, config.log_file.clone()))?;
    if log::set_logger(logger).is_ok() {
        log::set_max_level(level);
        engine::log_info!("SYS", "logging initialised at {}", level);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unified_line_format() {
        assert_eq!(
            format_line(7, Level::Warn, "RECALC", "cycle at 0!A1"),
            "7|W|RECALC|cycle at 0!A1"
        );
    }

    #[test]
    fn sequence_numbers_increase() {
        let a = next_seq();
        let b = next_seq();
        assert!(b > a);
    }

    #[test]
    fn file_logger_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.log");
        let logger = SeqLogger::new(LevelFilter::Info, Some(path.clone())).unwrap();

        logger.log(
            &Record::builder()
                .level(Level::Info)
                .target("PIVOT")
                .args(format_args!("refreshed pivot {}", 1))
                .build(),
        );
        logger.log(
            &Record::builder()
                .level(Level::Debug)
                .target("PIVOT")
                .args(format_args!("filtered out"))
                .build(),
        );
        logger.flush();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("|I|PIVOT|refreshed pivot 1"));
    }

    #[test]
    fn init_is_idempotent() {
        let config = ServiceConfig::default();
        assert!(init_logging(&config).is_ok());
        assert!(init_logging(&config).is_ok());
    }
}
