//! The runtime identity a probe is asked to resolve.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;

use crate::{Error, Result};

/// Roll-forward policy written into a synthesized runtime config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RollForward {
    LatestPatch,
    Minor,
    Major,
    LatestMinor,
    LatestMajor,
    Disable,
}

impl RollForward {
    pub const ALL: [RollForward; 6] = [
        RollForward::LatestPatch,
        RollForward::Minor,
        RollForward::Major,
        RollForward::LatestMinor,
        RollForward::LatestMajor,
        RollForward::Disable,
    ];

    /// Name as it appears in `runtimeconfig.json`.
    pub fn as_str(&self) -> &'static str {
        match self {
            RollForward::LatestPatch => "LatestPatch",
            RollForward::Minor => "Minor",
            RollForward::Major => "Major",
            RollForward::LatestMinor => "LatestMinor",
            RollForward::LatestMajor => "LatestMajor",
            RollForward::Disable => "Disable",
        }
    }
}

impl fmt::Display for RollForward {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RollForward {
    type Err = Error;

    /// Policies are matched case-insensitively, like the host does.
    fn from_str(s: &str) -> Result<Self> {
        RollForward::ALL
            .into_iter()
            .find(|policy| policy.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidArguments(format!("unknown roll forward policy '{}'", s)))
    }
}

/// What to resolve: an existing runtime config file, or a framework reference
/// to synthesize one from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeQuery {
    /// Use a caller-supplied `*.runtimeconfig.json` as-is.
    ExistingDescriptor { path: PathBuf },
    /// Write a minimal runtime config for this framework and resolve that.
    Synthesized {
        framework_name: String,
        framework_version: String,
        roll_forward: Option<RollForward>,
    },
}

impl RuntimeQuery {
    /// Build a query from independently supplied inputs.
    ///
    /// An existing config path excludes every framework input; without one,
    /// both the framework name and version are required.
    pub fn from_parts(
        existing: Option<PathBuf>,
        framework_name: Option<String>,
        framework_version: Option<String>,
        roll_forward: Option<RollForward>,
    ) -> Result<Self> {
        let query = match (existing, framework_name, framework_version) {
            (Some(_), name, version)
                if name.is_some() || version.is_some() || roll_forward.is_some() =>
            {
                return Err(Error::InvalidArguments(
                    "a runtime config file cannot be combined with runtime name, version or roll forward policy".into(),
                ));
            }
            (Some(path), None, None) => RuntimeQuery::ExistingDescriptor { path },
            (None, Some(framework_name), Some(framework_version)) => RuntimeQuery::Synthesized {
                framework_name,
                framework_version,
                roll_forward,
            },
            _ => {
                return Err(Error::InvalidArguments(
                    "either a runtime config file or both runtime name and version are required"
                        .into(),
                ));
            }
        };

        query.validate()?;
        Ok(query)
    }

    /// Reject queries whose fields are present but empty.
    pub fn validate(&self) -> Result<()> {
        match self {
            RuntimeQuery::ExistingDescriptor { path } => {
                if path.as_os_str().is_empty() {
                    return Err(Error::InvalidArguments("runtime config path is empty".into()));
                }
            }
            RuntimeQuery::Synthesized {
                framework_name,
                framework_version,
                ..
            } => {
                if framework_name.trim().is_empty() {
                    return Err(Error::InvalidArguments("runtime name is empty".into()));
                }
                if framework_version.trim().is_empty() {
                    return Err(Error::InvalidArguments("runtime version is empty".into()));
                }
            }
        }
        Ok(())
    }
}
