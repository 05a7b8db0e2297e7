//! Process exit codes.
//!
//! Installer tooling inspects these codes, so the values are fixed.
//!
//! | Outcome | Code |
//! |---------|------|
//! | Success | 0 |
//! | `InvalidArguments` | 2 |
//! | `ResolverNotFound` | 3 |
//! | `ExportResolution` | 4 |
//! | `PathComputation` | 5 |
//! | `Format` / `FileWrite` | 6 |
//! | `Initialize` | 7 |

use crate::Error;
use crate::probe::ProbeOutcome;

pub mod codes {
    /// A compatible runtime was resolved.
    pub const SUCCESS: i32 = 0;
    /// Missing or contradictory arguments.
    pub const INVALID_ARGS: i32 = 2;
    /// hostfxr could not be found.
    pub const LOAD_HOSTFXR: i32 = 3;
    /// hostfxr is missing a required export.
    pub const HOSTFXR_EXPORTS: i32 = 4;
    /// The temporary runtime config path could not be computed.
    pub const TEMP_RUNTIME_CONFIG_PATH: i32 = 5;
    /// The temporary runtime config could not be written.
    pub const TEMP_RUNTIME_CONFIG_FILE: i32 = 6;
    /// hostfxr could not resolve a runtime for the config.
    pub const INIT_HOSTFXR: i32 = 7;
}

/// Exit code for a probe error.
pub fn error_exit_code(error: &Error) -> i32 {
    match error {
        Error::InvalidArguments(_) => codes::INVALID_ARGS,
        Error::ResolverNotFound { .. } => codes::LOAD_HOSTFXR,
        Error::ExportResolution(_) => codes::HOSTFXR_EXPORTS,
        Error::PathComputation(_) => codes::TEMP_RUNTIME_CONFIG_PATH,
        Error::Format(_) | Error::FileWrite { .. } => codes::TEMP_RUNTIME_CONFIG_FILE,
        Error::Initialize { .. } => codes::INIT_HOSTFXR,
    }
}

/// Exit code for a probe outcome.
pub fn exit_code(outcome: &ProbeOutcome) -> i32 {
    match outcome {
        Ok(()) => codes::SUCCESS,
        Err(error) => error_exit_code(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_kind_has_a_distinct_nonzero_code() {
        let errors = [
            Error::InvalidArguments("both".into()),
            Error::ResolverNotFound { status: -1 },
            Error::ExportResolution("hostfxr_close not found".into()),
            Error::PathComputation("too long".into()),
            Error::FileWrite {
                path: "Test.runtimeconfig.json".into(),
                source: std::io::Error::other("denied"),
            },
            Error::Initialize { status: -2147450730 },
        ];

        let codes: HashSet<i32> = errors.iter().map(error_exit_code).collect();
        assert_eq!(codes.len(), errors.len());
        assert!(!codes.contains(&codes::SUCCESS));
    }

    #[test]
    fn test_format_and_write_failures_share_a_code() {
        assert_eq!(
            error_exit_code(&Error::Format("text too long".into())),
            codes::TEMP_RUNTIME_CONFIG_FILE
        );
        assert_eq!(exit_code(&Ok(())), codes::SUCCESS);
        assert_eq!(
            exit_code(&Err(Error::Initialize { status: 1 })),
            codes::INIT_HOSTFXR
        );
    }
}
