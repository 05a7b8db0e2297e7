//! Installer session abstraction and the log sink that writes through it.

use netcorecheck_shared::{LogLevel, LogSink};
use thiserror::Error;

/// `E_INVALIDARG`
pub const E_INVALIDARG: u32 = 0x8007_0057;

/// Failure reported by the installer engine, as an HRESULT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("installer error 0x{code:x}")]
pub struct SessionError {
    pub code: u32,
}

impl SessionError {
    pub fn new(code: u32) -> Self {
        Self { code }
    }

    /// HRESULT_FROM_WIN32
    pub fn from_win32(error: u32) -> Self {
        let code = if error as i32 <= 0 {
            error
        } else {
            (error & 0x0000_FFFF) | 0x8007_0000
        };
        Self { code }
    }
}

/// Property table and message queue of a running installation.
pub trait InstallerSession {
    /// Read a property. Unset and empty properties are `None`.
    fn get_property(&self, name: &str) -> Result<Option<String>, SessionError>;

    /// Write a property.
    fn set_property(&self, name: &str, value: &str) -> Result<(), SessionError>;

    /// Send an informational message to the installer log.
    fn log(&self, message: &str);

    /// Log a failure with its HRESULT.
    fn log_failure(&self, error: SessionError, message: &str) {
        self.log(&format!("FAILURE: 0x{:x}. {}", error.code, message));
    }
}

/// Log sink that forwards probe messages to the installer log.
pub struct SessionLog<'a, S: InstallerSession + ?Sized> {
    session: &'a S,
}

impl<'a, S: InstallerSession + ?Sized> SessionLog<'a, S> {
    pub fn new(session: &'a S) -> Self {
        Self { session }
    }
}

impl<S: InstallerSession + ?Sized> LogSink for SessionLog<'_, S> {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug | LogLevel::Info => self.session.log(message),
            LogLevel::Warning | LogLevel::Error => {
                self.session.log(&format!("{}: {}", level, message))
            }
        }
    }
}
