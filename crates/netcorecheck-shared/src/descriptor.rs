//! Runtime config (`*.runtimeconfig.json`) location and synthesis.
//!
//! A probe either resolves a caller-supplied runtime config, or writes a
//! minimal one naming a single framework and resolves that instead.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::log::ProbeLog;
use crate::runtime::{RollForward, RuntimeQuery};
use crate::{Error, Result};

/// File name of a synthesized runtime config.
pub const RUNTIME_CONFIG_FILE_NAME: &str = "Test.runtimeconfig.json";

/// Hard ceiling on rendered runtime config text, in UTF-16 code units,
/// including the terminator. Longer names or versions are rejected, never
/// truncated.
pub const MAX_CONFIG_TEXT_LEN: usize = 260;

#[cfg(windows)]
const MAX_PATH_LEN: usize = 260; // MAX_PATH
#[cfg(not(windows))]
const MAX_PATH_LEN: usize = 4096; // PATH_MAX

/// Directory a synthesized runtime config is written to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DescriptorLocation {
    /// Next to the running executable.
    #[default]
    ExecutableDir,
    /// An explicit directory.
    Directory(PathBuf),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RuntimeConfig<'a> {
    runtime_options: RuntimeOptions<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RuntimeOptions<'a> {
    framework: FrameworkReference<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    roll_forward: Option<RollForward>,
}

#[derive(Serialize)]
struct FrameworkReference<'a> {
    name: &'a str,
    version: &'a str,
}

/// Compute the runtime config path a query resolves against.
///
/// Existing config paths are returned verbatim; a missing or malformed file
/// is reported later by hostfxr, not here.
pub fn resolve_descriptor_path(
    query: &RuntimeQuery,
    location: &DescriptorLocation,
    log: ProbeLog<'_>,
) -> Result<PathBuf> {
    match query {
        RuntimeQuery::ExistingDescriptor { path } => {
            log.info(&format!(
                "Using existing runtimeconfig file '{}'",
                path.display()
            ));
            Ok(path.clone())
        }
        RuntimeQuery::Synthesized { .. } => {
            let dir = match location {
                DescriptorLocation::ExecutableDir => executable_dir(log)?,
                DescriptorLocation::Directory(dir) => dir.clone(),
            };
            let path = dir.join(RUNTIME_CONFIG_FILE_NAME);
            if path_len(&path) >= MAX_PATH_LEN {
                log.error("Couldn't append file.");
                return Err(Error::PathComputation(format!(
                    "'{}' exceeds the platform path limit of {} characters",
                    path.display(),
                    MAX_PATH_LEN
                )));
            }

            log.info(&format!(
                "Temporary runtime config file path: '{}'.",
                path.display()
            ));
            Ok(path)
        }
    }
}

fn executable_dir(log: ProbeLog<'_>) -> Result<PathBuf> {
    let exe = std::env::current_exe().map_err(|e| {
        log.error("Couldn't get module name.");
        Error::PathComputation(format!("current executable path unavailable: {}", e))
    })?;

    exe.parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .ok_or_else(|| {
            log.error("Couldn't get module directory.");
            Error::PathComputation(format!("'{}' has no parent directory", exe.display()))
        })
}

#[cfg(windows)]
fn path_len(path: &Path) -> usize {
    use std::os::windows::ffi::OsStrExt;
    path.as_os_str().encode_wide().count()
}

#[cfg(not(windows))]
fn path_len(path: &Path) -> usize {
    path.as_os_str().len()
}

/// Render the runtime config text for a single framework reference.
pub fn render_runtime_config(
    framework_name: &str,
    framework_version: &str,
    roll_forward: Option<RollForward>,
) -> Result<String> {
    let config = RuntimeConfig {
        runtime_options: RuntimeOptions {
            framework: FrameworkReference {
                name: framework_name,
                version: framework_version,
            },
            roll_forward,
        },
    };

    let text = serde_json::to_string(&config).map_err(|e| Error::Format(e.to_string()))?;

    let len = text.encode_utf16().count();
    if len >= MAX_CONFIG_TEXT_LEN {
        return Err(Error::Format(format!(
            "text is {} characters, limit is {}",
            len,
            MAX_CONFIG_TEXT_LEN - 1
        )));
    }

    Ok(text)
}

/// Replace whatever is at `path` with a runtime config for one framework.
///
/// An existing file is deleted first, so a text that fails to render leaves
/// nothing behind from a previous run.
pub fn write_runtime_config(
    path: &Path,
    framework_name: &str,
    framework_version: &str,
    roll_forward: Option<RollForward>,
    log: ProbeLog<'_>,
) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).map_err(|e| {
            log.error(&format!(
                "Failed to delete existing file '{}'.",
                path.display()
            ));
            Error::file_write(path, e)
        })?;
    }

    let text = render_runtime_config(framework_name, framework_version, roll_forward)
        .inspect_err(|_| log.error("Failed to format file text."))?;
    log.info(&format!("Temp runtime config file text: '{}'.", text));

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| {
            log.error(&format!("Open file failed : '{}'.", e));
            Error::file_write(path, e)
        })?;

    writeln!(file, "{}", text)
        .and_then(|()| file.flush())
        .map_err(|e| {
            log.error(&format!("Write file failed : '{}'.", e));
            Error::file_write(path, e)
        })
}
