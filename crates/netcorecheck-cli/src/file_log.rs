//! Append-only log file sink.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use netcorecheck_shared::{LogLevel, LogSink};

/// Writes one `[LEVEL] message` line per call to a file opened in append mode.
#[derive(Debug)]
pub struct FileLog {
    file: Mutex<File>,
}

impl FileLog {
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl LogSink for FileLog {
    fn log(&self, level: LogLevel, message: &str) {
        let mut file = match self.file.lock() {
            Ok(file) => file,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Err(e) = writeln!(file, "[{}] {}", level, message).and_then(|()| file.flush()) {
            tracing::warn!("Failed to write log file: {}", e);
        }
    }
}
