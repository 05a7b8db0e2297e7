//! hostfxr bindings.
//!
//! Only the two exports needed for a dry-run resolution are bound:
//! `hostfxr_initialize_for_runtime_config` and `hostfxr_close`.

use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

use crate::error::CleanupWarning;
use crate::library::Library;
use crate::locate::{DiscoveryConfig, locate_hostfxr};
use crate::log::ProbeLog;
use crate::resolver::{Initialized, ResolverBackend, ResolverLibrary, ResolverLoader};
use crate::{Error, Result};

/// hostfxr's `char_t`: UTF-16 on Windows, bytes elsewhere.
#[cfg(windows)]
pub type CharT = u16;
#[cfg(not(windows))]
pub type CharT = std::ffi::c_char;

/// `hostfxr_handle`
pub type HostfxrHandle = *mut c_void;

pub const INITIALIZE_FOR_RUNTIME_CONFIG: &str = "hostfxr_initialize_for_runtime_config";
pub const CLOSE: &str = "hostfxr_close";

/// hostfxr_initialize_for_runtime_config function type
pub type InitializeForRuntimeConfigFn = unsafe extern "C" fn(
    runtime_config_path: *const CharT,
    parameters: *const c_void, // const hostfxr_initialize_parameters*
    host_context_handle: *mut HostfxrHandle,
) -> i32;

/// hostfxr_close function type
pub type CloseFn = unsafe extern "C" fn(host_context_handle: HostfxrHandle) -> i32;

/// Production loader: discovers hostfxr like the native host does.
#[derive(Debug, Clone, Default)]
pub struct HostfxrLoader {
    config: DiscoveryConfig,
}

impl HostfxrLoader {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self { config }
    }

    /// Loader configured from the process environment.
    pub fn from_env() -> Self {
        Self::new(DiscoveryConfig::from_env())
    }
}

impl ResolverLoader for HostfxrLoader {
    type Library = Hostfxr;

    fn locate(&self, log: ProbeLog<'_>) -> Result<PathBuf> {
        locate_hostfxr(&self.config, log)
    }

    fn load(&self, path: &Path) -> Result<Hostfxr> {
        Hostfxr::load(path)
    }
}

/// A loaded hostfxr with its exports resolved.
#[derive(Debug)]
pub struct Hostfxr {
    library: Library,
    initialize: InitializeForRuntimeConfigFn,
    close: CloseFn,
}

impl Hostfxr {
    /// Load hostfxr from `path`. Both exports must resolve; otherwise the
    /// library is released again and nothing is returned.
    pub fn load(path: &Path) -> Result<Self> {
        let library = Library::open(path).map_err(|e| Error::ExportResolution(e.to_string()))?;

        // SAFETY: the function types match hostfxr.h.
        let initialize = unsafe {
            library.symbol::<InitializeForRuntimeConfigFn>(INITIALIZE_FOR_RUNTIME_CONFIG)
        }
        .map_err(|e| Error::ExportResolution(e.to_string()))?;
        let close = unsafe { library.symbol::<CloseFn>(CLOSE) }
            .map_err(|e| Error::ExportResolution(e.to_string()))?;

        Ok(Self {
            library,
            initialize,
            close,
        })
    }
}

/// An initialized hostfxr host context.
#[derive(Debug)]
pub struct HostContext(NonNull<c_void>);

impl ResolverBackend for Hostfxr {
    type Context = HostContext;

    fn initialize_for_descriptor(&self, descriptor: &Path) -> Initialized<HostContext> {
        let path = to_char_t(descriptor);
        let mut handle: HostfxrHandle = std::ptr::null_mut();

        // SAFETY: path is nul-terminated and outlives the call; a null
        // parameters pointer is accepted by hostfxr.
        let status = unsafe { (self.initialize)(path.as_ptr(), std::ptr::null(), &mut handle) };

        Initialized {
            status,
            context: NonNull::new(handle).map(HostContext),
        }
    }

    fn close(&self, context: HostContext) -> i32 {
        // SAFETY: the handle came from initialize and is closed exactly once
        // because HostContext is consumed here.
        unsafe { (self.close)(context.0.as_ptr()) }
    }
}

impl ResolverLibrary for Hostfxr {
    fn unload(self) -> std::result::Result<(), CleanupWarning> {
        self.library
            .close()
            .map_err(|e| CleanupWarning::UnloadFailed(e.to_string()))
    }
}

#[cfg(windows)]
fn to_char_t(path: &Path) -> Vec<CharT> {
    use std::os::windows::ffi::OsStrExt;
    path.as_os_str()
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}

#[cfg(not(windows))]
fn to_char_t(path: &Path) -> Vec<CharT> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str()
        .as_bytes()
        .iter()
        .map(|&b| b as CharT)
        .chain(std::iter::once(0))
        .collect()
}
