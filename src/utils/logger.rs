//! Run log
//!
//! `Logger` writes an audit trail of a run (written tiles, reconciled tiles,
//! written files) to a file. It also implements `log::Log`, so it can stand
//! in for `env_logger` and receive every `log` macro call instead.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;
use log::{Log, Record, Level, Metadata, LevelFilter};

/// File-backed run log
pub struct Logger {
    /// File handle for log output, `None` when the log is disabled
    file: Mutex<Option<File>>,
}

impl Logger {
    /// Creates a new logger writing to `log_file`, truncating it
    ///
    /// # Arguments
    ///
    /// * `log_file` - Path to the log file
    ///
    /// # Returns
    ///
    /// A new Logger instance or an error if the file cannot be created
    pub fn new(log_file: &str) -> io::Result<Self> {
        let file = File::create(Path::new(log_file))?;
        Ok(Logger {
            file: Mutex::new(Some(file)),
        })
    }

    /// Creates a logger that appends to an existing log file
    pub fn append(log_file: &str) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(log_file)?;
        Ok(Logger {
            file: Mutex::new(Some(file)),
        })
    }

    /// A logger that discards every message
    pub fn disabled() -> Self {
        Logger {
            file: Mutex::new(None),
        }
    }

    /// Logs a message to the log file
    ///
    /// # Arguments
    ///
    /// * `message` - The message to log
    pub fn log(&self, message: &str) -> io::Result<()> {
        let mut guard = self.file.lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))?;
        if let Some(file) = guard.as_mut() {
            writeln!(file, "{}", message)?;
            file.flush()?;
        }
        Ok(())
    }

    /// Static method to initialize the global logger
    pub fn init_global_logger(log_file: &str) -> io::Result<()> {
        let global_logger = Logger::new(log_file)?;

        // Only called once at startup, a second call keeps the first logger
        if log::set_boxed_logger(Box::new(global_logger)).is_err() {
            eprintln!("Warning: Global logger was already initialized");
        }

        log::set_max_level(LevelFilter::Debug);
        Ok(())
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Debug
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let message = format!("[{}] {}", record.level(), record.args());
            let _ = self.log(&message);

            // Also print to console
            println!("{}", message);
        }
    }

    fn flush(&self) {
        // Already flushing in the log method
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_log_lines_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let path_str = path.to_str().unwrap();

        let logger = Logger::new(path_str).unwrap();
        logger.log("Wrote tile_0_0.tif").unwrap();
        logger.log("Wrote tile_0_10.tif").unwrap();
        drop(logger);

        let appended = Logger::append(path_str).unwrap();
        appended.log("Stitched mosaic.tif").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().collect::<Vec<_>>(),
                   vec!["Wrote tile_0_0.tif", "Wrote tile_0_10.tif", "Stitched mosaic.tif"]);
    }

    #[test]
    fn test_disabled_logger_accepts_messages() {
        assert!(Logger::disabled().log("ignored").is_ok());
    }
}
