//! Windows Installer custom action that checks for a .NET runtime.
//!
//! The framework reference comes from installer properties instead of the
//! command line; the probe itself is the same one the CLI runs. The probe's
//! exit code is written back to `CheckNETRuntime_Result`.

mod context;
#[cfg(windows)]
mod msi;

use netcorecheck_shared::exit::error_exit_code;
use netcorecheck_shared::{
    DescriptorLocation, Probe, ResolverLoader, RollForward, RuntimeQuery, codes, exit_code,
};

pub use context::{E_INVALIDARG, InstallerSession, SessionError, SessionLog};

pub const FRAMEWORK_PROPERTY: &str = "CheckNETRuntime_Framework";
pub const VERSION_PROPERTY: &str = "CheckNETRuntime_Version";
pub const ROLL_FORWARD_PROPERTY: &str = "CheckNETRuntime_RollForward";
pub const RESULT_PROPERTY: &str = "CheckNETRuntime_Result";

pub const ERROR_SUCCESS: u32 = 0;
pub const ERROR_INSTALL_FAILURE: u32 = 1603;

/// Run the probe for the framework named by the session's properties.
///
/// Synthesized runtime configs go to the system temp directory; the
/// installer engine's own directory is not writable from a custom action.
pub fn check_net_runtime<S, L>(session: &S, loader: &L) -> u32
where
    S: InstallerSession + ?Sized,
    L: ResolverLoader,
{
    check_net_runtime_in(
        session,
        loader,
        DescriptorLocation::Directory(std::env::temp_dir()),
    )
}

/// [`check_net_runtime`] with an explicit runtime config directory.
pub fn check_net_runtime_in<S, L>(session: &S, loader: &L, location: DescriptorLocation) -> u32
where
    S: InstallerSession + ?Sized,
    L: ResolverLoader,
{
    let Some(framework_name) = required_property(session, FRAMEWORK_PROPERTY, "framework name")
    else {
        return ERROR_INSTALL_FAILURE;
    };
    let Some(framework_version) =
        required_property(session, VERSION_PROPERTY, "framework version")
    else {
        return ERROR_INSTALL_FAILURE;
    };
    let roll_forward = match session.get_property(ROLL_FORWARD_PROPERTY) {
        Ok(value) => value,
        Err(e) => {
            session.log_failure(
                e,
                &format!(
                    "Failed to read roll forward policy from property '{}'.",
                    ROLL_FORWARD_PROPERTY
                ),
            );
            return ERROR_INSTALL_FAILURE;
        }
    };

    let log = SessionLog::new(session);
    let code = match build_query(framework_name, framework_version, roll_forward.as_deref()) {
        Ok(query) => {
            let outcome = Probe::new(loader, &log)
                .descriptor_location(location)
                .run(&query);
            exit_code(&outcome)
        }
        Err(e) => {
            session.log_failure(SessionError::new(E_INVALIDARG), &e.to_string());
            error_exit_code(&e)
        }
    };

    tracing::debug!(code, "runtime check finished");
    if let Err(e) = session.set_property(RESULT_PROPERTY, &code.to_string()) {
        session.log_failure(
            e,
            &format!("Failed setting result property '{}'.", RESULT_PROPERTY),
        );
        return ERROR_INSTALL_FAILURE;
    }

    if code == codes::SUCCESS {
        ERROR_SUCCESS
    } else {
        ERROR_INSTALL_FAILURE
    }
}

fn required_property<S>(session: &S, name: &str, what: &str) -> Option<String>
where
    S: InstallerSession + ?Sized,
{
    match session.get_property(name) {
        Ok(Some(value)) => Some(value),
        Ok(None) => {
            session.log_failure(
                SessionError::new(E_INVALIDARG),
                &format!("Missing {} property '{}'.", what, name),
            );
            None
        }
        Err(e) => {
            session.log_failure(
                e,
                &format!("Failed to read {} from property '{}'.", what, name),
            );
            None
        }
    }
}

fn build_query(
    framework_name: String,
    framework_version: String,
    roll_forward: Option<&str>,
) -> netcorecheck_shared::Result<RuntimeQuery> {
    let roll_forward = roll_forward
        .map(str::parse::<RollForward>)
        .transpose()?;
    RuntimeQuery::from_parts(
        None,
        Some(framework_name),
        Some(framework_version),
        roll_forward,
    )
}

/// Custom action entry point.
#[cfg(windows)]
#[unsafe(no_mangle)]
pub extern "system" fn CheckNETRuntime(
    h_install: windows::Win32::System::ApplicationInstallationAndServicing::MSIHANDLE,
) -> u32 {
    let session = msi::MsiSession::new(h_install);
    let loader = netcorecheck_shared::HostfxrLoader::from_env();
    check_net_runtime(&session, &loader)
}

/// DLL entry point for Windows.
#[cfg(windows)]
#[unsafe(no_mangle)]
pub unsafe extern "system" fn DllMain(
    _hinst_dll: *mut std::ffi::c_void,
    _fdw_reason: u32,
    _lpv_reserved: *mut std::ffi::c_void,
) -> i32 {
    1 // TRUE
}

#[cfg(test)]
mod tests {
    use super::*;
    use netcorecheck_shared::{CleanupWarning, Initialized, ResolverBackend, ResolverLibrary};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    #[derive(Default)]
    struct FakeSession {
        properties: RefCell<HashMap<String, String>>,
        messages: RefCell<Vec<String>>,
        read_only: bool,
    }

    impl FakeSession {
        fn with(properties: &[(&str, &str)]) -> Self {
            let session = Self::default();
            for (name, value) in properties {
                session
                    .properties
                    .borrow_mut()
                    .insert(name.to_string(), value.to_string());
            }
            session
        }

        fn property(&self, name: &str) -> Option<String> {
            self.properties.borrow().get(name).cloned()
        }

        fn logged(&self, needle: &str) -> bool {
            self.messages.borrow().iter().any(|m| m.contains(needle))
        }
    }

    impl InstallerSession for FakeSession {
        fn get_property(&self, name: &str) -> Result<Option<String>, SessionError> {
            Ok(self.property(name).filter(|v| !v.is_empty()))
        }

        fn set_property(&self, name: &str, value: &str) -> Result<(), SessionError> {
            if self.read_only {
                return Err(SessionError::from_win32(6));
            }
            self.properties
                .borrow_mut()
                .insert(name.to_string(), value.to_string());
            Ok(())
        }

        fn log(&self, message: &str) {
            self.messages.borrow_mut().push(message.to_string());
        }
    }

    /// Resolver that answers every config with a fixed status.
    struct FakeResolver {
        status: i32,
    }

    struct FakeLibrary {
        status: i32,
    }

    impl ResolverLoader for FakeResolver {
        type Library = FakeLibrary;

        fn locate(
            &self,
            _log: netcorecheck_shared::ProbeLog<'_>,
        ) -> netcorecheck_shared::Result<PathBuf> {
            Ok(PathBuf::from("hostfxr.dll"))
        }

        fn load(&self, _path: &Path) -> netcorecheck_shared::Result<FakeLibrary> {
            Ok(FakeLibrary {
                status: self.status,
            })
        }
    }

    impl ResolverBackend for FakeLibrary {
        type Context = ();

        fn initialize_for_descriptor(&self, _descriptor: &Path) -> Initialized<()> {
            Initialized {
                status: self.status,
                context: (self.status == 0).then_some(()),
            }
        }

        fn close(&self, _context: ()) -> i32 {
            0
        }
    }

    impl ResolverLibrary for FakeLibrary {
        fn unload(self) -> Result<(), CleanupWarning> {
            Ok(())
        }
    }

    fn check(session: &FakeSession, status: i32) -> (u32, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let rc = check_net_runtime_in(
            session,
            &FakeResolver { status },
            DescriptorLocation::Directory(dir.path().to_path_buf()),
        );
        (rc, dir)
    }

    #[test]
    fn test_resolved_runtime_sets_success_result() {
        let session = FakeSession::with(&[
            (FRAMEWORK_PROPERTY, "Microsoft.WindowsDesktop.App"),
            (VERSION_PROPERTY, "6.0.0"),
        ]);

        let (rc, dir) = check(&session, 0);

        assert_eq!(rc, ERROR_SUCCESS);
        assert_eq!(session.property(RESULT_PROPERTY).as_deref(), Some("0"));
        assert!(session.logged("hostfxr_initialize_for_runtime_config succeeded."));
        assert!(dir.path().join("Test.runtimeconfig.json").exists());
    }

    #[test]
    fn test_missing_runtime_sets_failure_result() {
        let session = FakeSession::with(&[
            (FRAMEWORK_PROPERTY, "Microsoft.WindowsDesktop.App"),
            (VERSION_PROPERTY, "99.0.0"),
        ]);

        let (rc, _dir) = check(&session, 0x8000_8096_u32 as i32);

        assert_eq!(rc, ERROR_INSTALL_FAILURE);
        assert_eq!(
            session.property(RESULT_PROPERTY),
            Some(codes::INIT_HOSTFXR.to_string())
        );
        assert!(session.logged("-2147450730"));
    }

    #[test]
    fn test_missing_property_fails_without_result() {
        let session = FakeSession::with(&[(FRAMEWORK_PROPERTY, "Microsoft.NETCore.App")]);

        let (rc, _dir) = check(&session, 0);

        assert_eq!(rc, ERROR_INSTALL_FAILURE);
        assert_eq!(session.property(RESULT_PROPERTY), None);
        assert!(session.logged("FAILURE: 0x80070057. Missing framework version property"));
    }

    #[test]
    fn test_invalid_roll_forward_is_invalid_arguments() {
        let session = FakeSession::with(&[
            (FRAMEWORK_PROPERTY, "Microsoft.NETCore.App"),
            (VERSION_PROPERTY, "6.0.0"),
            (ROLL_FORWARD_PROPERTY, "Sideways"),
        ]);

        let (rc, _dir) = check(&session, 0);

        assert_eq!(rc, ERROR_INSTALL_FAILURE);
        assert_eq!(
            session.property(RESULT_PROPERTY),
            Some(codes::INVALID_ARGS.to_string())
        );
    }

    #[test]
    fn test_roll_forward_property_reaches_runtime_config() {
        let session = FakeSession::with(&[
            (FRAMEWORK_PROPERTY, "Microsoft.NETCore.App"),
            (VERSION_PROPERTY, "6.0.0"),
            (ROLL_FORWARD_PROPERTY, "LatestMajor"),
        ]);

        let (rc, dir) = check(&session, 0);

        assert_eq!(rc, ERROR_SUCCESS);
        let text = std::fs::read_to_string(dir.path().join("Test.runtimeconfig.json")).unwrap();
        assert!(text.contains(r#""rollForward":"LatestMajor""#));
    }

    #[test]
    fn test_result_write_failure_fails_action() {
        let session = FakeSession {
            read_only: true,
            ..FakeSession::with(&[
                (FRAMEWORK_PROPERTY, "Microsoft.NETCore.App"),
                (VERSION_PROPERTY, "6.0.0"),
            ])
        };

        let (rc, _dir) = check(&session, 0);

        assert_eq!(rc, ERROR_INSTALL_FAILURE);
        assert!(session.logged("FAILURE: 0x80070006. Failed setting result property"));
    }
}
