//! hostfxr discovery.
//!
//! Mirrors the native host's choice of root: an explicit `DOTNET_ROOT`,
//! else the registered global install location, else the platform default
//! install directory. Inside a dotnet root the resolver lives at
//! `host/fxr/<version>/`, and the highest version wins.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use crate::log::ProbeLog;
use crate::{Error, Result};

/// Native host status: the hostfxr library could not be found.
pub const CORE_HOST_LIB_MISSING_FAILURE: i32 = 0x8000_8083_u32 as i32;

#[cfg(windows)]
pub const HOSTFXR_LIBRARY_NAME: &str = "hostfxr.dll";
#[cfg(target_os = "macos")]
pub const HOSTFXR_LIBRARY_NAME: &str = "libhostfxr.dylib";
#[cfg(all(unix, not(target_os = "macos")))]
pub const HOSTFXR_LIBRARY_NAME: &str = "libhostfxr.so";

/// Inputs to hostfxr discovery, gathered once from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// `DOTNET_ROOT_<ARCH>` or `DOTNET_ROOT`.
    pub dotnet_root: Option<PathBuf>,
    /// Globally registered install location.
    pub install_location: Option<PathBuf>,
    /// Platform default install directory.
    pub default_root: Option<PathBuf>,
}

impl DiscoveryConfig {
    /// Read discovery inputs from the current process environment.
    pub fn from_env() -> Self {
        let arch = dotnet_arch();
        let dotnet_root = [format!("DOTNET_ROOT_{}", arch.to_uppercase()), "DOTNET_ROOT".into()]
            .iter()
            .filter_map(std::env::var_os)
            .find(|value| !value.is_empty())
            .map(PathBuf::from);

        Self {
            dotnet_root,
            install_location: registered_install_location(arch),
            default_root: default_install_dir(),
        }
    }

    /// The dotnet root hostfxr is taken from: the first one configured.
    pub fn root(&self) -> Option<&Path> {
        [&self.dotnet_root, &self.install_location, &self.default_root]
            .into_iter()
            .find_map(|root| root.as_deref())
    }
}

/// Find the hostfxr library to load.
///
/// Only the first configured root is searched, as the native host does; a
/// root without a hostfxr fails with [`Error::ResolverNotFound`] carrying
/// [`CORE_HOST_LIB_MISSING_FAILURE`] even when a later root has one.
pub fn locate_hostfxr(config: &DiscoveryConfig, log: ProbeLog<'_>) -> Result<PathBuf> {
    let missing = Error::ResolverNotFound {
        status: CORE_HOST_LIB_MISSING_FAILURE,
    };
    let Some(root) = config.root() else {
        log.debug("No dotnet root configured");
        return Err(missing);
    };

    log.debug(&format!("Looking for hostfxr under '{}'", root.display()));
    find_hostfxr_in_root(root).ok_or(missing)
}

/// Highest-versioned hostfxr under `<root>/host/fxr`, if any.
pub fn find_hostfxr_in_root(root: &Path) -> Option<PathBuf> {
    let fxr_dir = root.join("host").join("fxr");
    let entries = std::fs::read_dir(&fxr_dir).ok()?;

    let mut candidates: Vec<(String, PathBuf)> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let version = e.file_name().to_str()?.to_owned();
            parse_version(&version)?;
            let library = e.path().join(HOSTFXR_LIBRARY_NAME);
            library.is_file().then_some((version, library))
        })
        .collect();

    candidates.sort_by(|(a, _), (b, _)| compare_versions(b, a));
    candidates.into_iter().next().map(|(_, library)| library)
}

/// Split `8.0.1-preview.2` into numeric components and pre-release label.
fn parse_version(s: &str) -> Option<(Vec<u32>, Option<&str>)> {
    let (numeric, pre) = match s.split_once('-') {
        Some((numeric, pre)) => (numeric, Some(pre)),
        None => (s, None),
    };

    let parts = numeric
        .split('.')
        .map(|p| p.parse::<u32>().ok())
        .collect::<Option<Vec<u32>>>()?;

    Some((parts, pre))
}

/// Compare version strings (e.g., "8.0.23" vs "9.0.12").
///
/// A release outranks any pre-release with the same numeric components.
fn compare_versions(a: &str, b: &str) -> Ordering {
    let (Some((pa, pre_a)), Some((pb, pre_b))) = (parse_version(a), parse_version(b)) else {
        return a.cmp(b);
    };

    for (a, b) in pa.iter().zip(pb.iter()) {
        match a.cmp(b) {
            Ordering::Equal => continue,
            other => return other,
        }
    }

    pa.len().cmp(&pb.len()).then_with(|| match (pre_a, pre_b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => a.cmp(b),
    })
}

/// Architecture name as used in dotnet install metadata.
fn dotnet_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "x64",
        "x86" => "x86",
        "aarch64" => "arm64",
        "arm" => "arm",
        other => other,
    }
}

/// First non-empty line of an `install_location` file.
fn parse_install_location(contents: &str) -> Option<PathBuf> {
    contents
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(PathBuf::from)
}

#[cfg(windows)]
fn registered_install_location(arch: &str) -> Option<PathBuf> {
    use windows::Win32::Foundation::ERROR_SUCCESS;
    use windows::Win32::System::Registry::{
        HKEY_LOCAL_MACHINE, RRF_RT_REG_SZ, RRF_SUBKEY_WOW6432KEY, RegGetValueW,
    };
    use windows::core::{PCWSTR, w};

    let subkey: Vec<u16> = format!("SOFTWARE\\dotnet\\Setup\\InstalledVersions\\{}", arch)
        .encode_utf16()
        .chain(std::iter::once(0))
        .collect();

    let mut buf = [0u16; 1024];
    let mut size = std::mem::size_of_val(&buf) as u32;

    let status = unsafe {
        RegGetValueW(
            HKEY_LOCAL_MACHINE,
            PCWSTR(subkey.as_ptr()),
            w!("InstallLocation"),
            RRF_RT_REG_SZ | RRF_SUBKEY_WOW6432KEY,
            None,
            Some(buf.as_mut_ptr().cast()),
            Some(&mut size),
        )
    };

    if status != ERROR_SUCCESS {
        return None;
    }

    let len = (size as usize / 2).min(buf.len());
    let value = String::from_utf16_lossy(&buf[..len]);
    parse_install_location(value.trim_end_matches('\0'))
}

#[cfg(not(windows))]
fn registered_install_location(arch: &str) -> Option<PathBuf> {
    [
        format!("/etc/dotnet/install_location_{}", arch),
        "/etc/dotnet/install_location".to_string(),
    ]
    .iter()
    .filter_map(|file| std::fs::read_to_string(file).ok())
    .find_map(|contents| parse_install_location(&contents))
}

#[cfg(windows)]
fn default_install_dir() -> Option<PathBuf> {
    std::env::var_os("ProgramFiles").map(|dir| PathBuf::from(dir).join("dotnet"))
}

#[cfg(target_os = "macos")]
fn default_install_dir() -> Option<PathBuf> {
    Some(PathBuf::from("/usr/local/share/dotnet"))
}

#[cfg(all(unix, not(target_os = "macos")))]
fn default_install_dir() -> Option<PathBuf> {
    Some(PathBuf::from("/usr/share/dotnet"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::NullLog;
    use std::fs;

    fn install_fxr(root: &Path, version: &str) -> PathBuf {
        let dir = root.join("host").join("fxr").join(version);
        fs::create_dir_all(&dir).unwrap();
        let library = dir.join(HOSTFXR_LIBRARY_NAME);
        fs::write(&library, b"").unwrap();
        library
    }

    #[test]
    fn test_compare_versions() {
        assert_eq!(compare_versions("8.0.23", "9.0.12"), Ordering::Less);
        assert_eq!(compare_versions("10.0.0", "9.0.12"), Ordering::Greater);
        assert_eq!(compare_versions("6.0.0", "6.0.0"), Ordering::Equal);
        assert_eq!(compare_versions("6.0", "6.0.1"), Ordering::Less);
        assert_eq!(compare_versions("8.0.0-rc.1", "8.0.0"), Ordering::Less);
        assert_eq!(compare_versions("8.0.0-rc.2", "8.0.0-rc.1"), Ordering::Greater);
    }

    #[test]
    fn test_highest_fxr_version_wins() {
        let root = tempfile::tempdir().unwrap();
        install_fxr(root.path(), "6.0.25");
        let expected = install_fxr(root.path(), "8.0.1");
        install_fxr(root.path(), "8.0.1-preview.3");
        install_fxr(root.path(), "7.0.14");

        assert_eq!(find_hostfxr_in_root(root.path()), Some(expected));
    }

    #[test]
    fn test_version_dirs_without_library_are_skipped() {
        let root = tempfile::tempdir().unwrap();
        let expected = install_fxr(root.path(), "6.0.0");
        fs::create_dir_all(root.path().join("host/fxr/9.0.0")).unwrap();
        fs::create_dir_all(root.path().join("host/fxr/not-a-version")).unwrap();

        assert_eq!(find_hostfxr_in_root(root.path()), Some(expected));
    }

    #[test]
    fn test_locate_uses_first_configured_root() {
        let env_root = tempfile::tempdir().unwrap();
        let default_root = tempfile::tempdir().unwrap();
        install_fxr(default_root.path(), "6.0.0");

        let config = DiscoveryConfig {
            dotnet_root: Some(env_root.path().to_path_buf()),
            install_location: None,
            default_root: Some(default_root.path().to_path_buf()),
        };
        assert!(matches!(
            locate_hostfxr(&config, ProbeLog::new(&NullLog)),
            Err(Error::ResolverNotFound { status }) if status == CORE_HOST_LIB_MISSING_FAILURE
        ));

        let preferred = install_fxr(env_root.path(), "5.0.0");
        assert_eq!(locate_hostfxr(&config, ProbeLog::new(&NullLog)).unwrap(), preferred);
    }

    #[test]
    fn test_root_precedence() {
        let config = DiscoveryConfig {
            dotnet_root: None,
            install_location: Some(PathBuf::from("/opt/dotnet")),
            default_root: Some(PathBuf::from("/usr/share/dotnet")),
        };
        assert_eq!(config.root(), Some(Path::new("/opt/dotnet")));
        assert_eq!(DiscoveryConfig::default().root(), None);
        assert!(locate_hostfxr(&DiscoveryConfig::default(), ProbeLog::new(&NullLog)).is_err());
    }

    #[test]
    fn test_locate_reports_missing_library_status() {
        let empty = tempfile::tempdir().unwrap();
        let config = DiscoveryConfig {
            dotnet_root: Some(empty.path().to_path_buf()),
            ..Default::default()
        };

        match locate_hostfxr(&config, ProbeLog::new(&NullLog)) {
            Err(Error::ResolverNotFound { status }) => {
                assert_eq!(status, CORE_HOST_LIB_MISSING_FAILURE)
            }
            other => panic!("expected ResolverNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_install_location() {
        assert_eq!(
            parse_install_location("\n  /opt/dotnet  \n"),
            Some(PathBuf::from("/opt/dotnet"))
        );
        assert_eq!(parse_install_location("   \n"), None);
    }
}
