//! Log sinks for probe diagnostics.
//!
//! A probe writes one line per step to a [`LogSink`]. The sink is handed to
//! the probe explicitly; there is no process-wide logger. Every line is also
//! emitted as a `tracing` event so a developer can watch a probe on stderr.

use std::fmt;
use std::sync::Mutex;

/// Severity of a log line.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Debug message
    Debug = 0,
    /// Informational message
    Info = 1,
    /// Warning message
    Warning = 2,
    /// Error message
    Error = 3,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only, line-oriented destination for probe messages.
///
/// Sinks take `&self` so cleanup guards can share one with the probe.
/// Writing must never fail the caller; a sink that cannot write drops the line.
pub trait LogSink {
    fn log(&self, level: LogLevel, message: &str);
}

impl<T: LogSink + ?Sized> LogSink for &T {
    fn log(&self, level: LogLevel, message: &str) {
        (**self).log(level, message)
    }
}

/// Sink used when no log destination is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLog;

impl LogSink for NullLog {
    fn log(&self, _level: LogLevel, _message: &str) {}
}

/// Sink that keeps every line in memory.
#[derive(Debug, Default)]
pub struct MemoryLog {
    lines: Mutex<Vec<(LogLevel, String)>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything logged so far.
    pub fn lines(&self) -> Vec<(LogLevel, String)> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|(_, line)| line.contains(needle))
    }
}

impl LogSink for MemoryLog {
    fn log(&self, level: LogLevel, message: &str) {
        let mut lines = match self.lines.lock() {
            Ok(lines) => lines,
            Err(poisoned) => poisoned.into_inner(),
        };
        lines.push((level, message.to_owned()));
    }
}

/// Logging handle passed through the probe.
///
/// Wraps the configured sink and mirrors each line to `tracing`.
#[derive(Clone, Copy)]
pub struct ProbeLog<'a> {
    sink: &'a dyn LogSink,
}

impl<'a> ProbeLog<'a> {
    pub fn new(sink: &'a dyn LogSink) -> Self {
        Self { sink }
    }

    pub fn debug(&self, msg: &str) {
        tracing::debug!("{}", msg);
        self.sink.log(LogLevel::Debug, msg);
    }

    pub fn info(&self, msg: &str) {
        tracing::info!("{}", msg);
        self.sink.log(LogLevel::Info, msg);
    }

    pub fn warn(&self, msg: &str) {
        tracing::warn!("{}", msg);
        self.sink.log(LogLevel::Warning, msg);
    }

    pub fn error(&self, msg: &str) {
        tracing::error!("{}", msg);
        self.sink.log(LogLevel::Error, msg);
    }
}

impl fmt::Debug for ProbeLog<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeLog").finish_non_exhaustive()
    }
}
