//! Dynamic library loading.
//!
//! `LoadLibraryW`/`GetProcAddress`/`FreeLibrary` on Windows,
//! `dlopen`/`dlsym`/`dlclose` elsewhere. A [`Library`] is freed exactly once:
//! explicitly through [`Library::close`], or on drop if never closed.

use std::ffi::{CString, c_void};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Failed to load '{}': {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    #[error("{0} not found")]
    MissingExport(String),

    #[error("{0}")]
    Unload(String),
}

/// A loaded shared library.
#[derive(Debug)]
pub struct Library {
    handle: imp::Handle,
}

impl Library {
    /// Load the library at `path`.
    pub fn open(path: &Path) -> Result<Self, LibraryError> {
        imp::open(path)
            .map(|handle| Self { handle })
            .map_err(|reason| LibraryError::Load {
                path: path.to_path_buf(),
                reason,
            })
    }

    /// Resolve an export by exact name.
    ///
    /// # Safety
    ///
    /// `F` must be a function pointer type matching the export's real signature.
    pub unsafe fn symbol<F: Copy>(&self, name: &str) -> Result<F, LibraryError> {
        debug_assert_eq!(
            std::mem::size_of::<F>(),
            std::mem::size_of::<*mut c_void>(),
            "exports can only be read as pointer-sized function types"
        );

        let c_name = CString::new(name).map_err(|_| LibraryError::MissingExport(name.into()))?;
        let ptr = imp::symbol(self.handle, &c_name)
            .ok_or_else(|| LibraryError::MissingExport(name.into()))?;

        Ok(unsafe { std::mem::transmute_copy::<*mut c_void, F>(&ptr) })
    }

    /// Unload the library, reporting failure instead of ignoring it.
    pub fn close(self) -> Result<(), LibraryError> {
        let handle = self.handle;
        std::mem::forget(self);
        imp::close(handle).map_err(LibraryError::Unload)
    }
}

impl Drop for Library {
    fn drop(&mut self) {
        let _ = imp::close(self.handle);
    }
}

#[cfg(windows)]
mod imp {
    use std::ffi::{CStr, c_void};
    use std::os::windows::ffi::OsStrExt;
    use std::path::Path;

    use windows::Win32::Foundation::{FreeLibrary, HMODULE};
    use windows::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryW};
    use windows::core::{PCSTR, PCWSTR};

    pub type Handle = HMODULE;

    pub fn open(path: &Path) -> Result<Handle, String> {
        let path_wide: Vec<u16> = path
            .as_os_str()
            .encode_wide()
            .chain(std::iter::once(0))
            .collect();

        unsafe { LoadLibraryW(PCWSTR::from_raw(path_wide.as_ptr())) }.map_err(|e| e.to_string())
    }

    pub fn symbol(handle: Handle, name: &CStr) -> Option<*mut c_void> {
        unsafe { GetProcAddress(handle, PCSTR::from_raw(name.as_ptr().cast())) }
            .map(|proc| proc as *mut c_void)
    }

    pub fn close(handle: Handle) -> Result<(), String> {
        unsafe { FreeLibrary(handle) }.map_err(|e| format!("FreeLibrary failed: {}", e))
    }
}

#[cfg(unix)]
mod imp {
    use std::ffi::{CStr, CString, c_void};
    use std::os::unix::ffi::OsStrExt;
    use std::path::Path;

    pub type Handle = *mut c_void;

    pub fn open(path: &Path) -> Result<Handle, String> {
        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|_| "path contains a nul byte".to_string())?;

        // SAFETY: c_path is a valid nul-terminated string for the duration of the call.
        let handle = unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_LAZY | libc::RTLD_LOCAL) };
        if handle.is_null() {
            Err(last_error())
        } else {
            Ok(handle)
        }
    }

    pub fn symbol(handle: Handle, name: &CStr) -> Option<*mut c_void> {
        // SAFETY: handle came from a successful dlopen and has not been closed.
        let ptr = unsafe { libc::dlsym(handle, name.as_ptr()) };
        (!ptr.is_null()).then_some(ptr)
    }

    pub fn close(handle: Handle) -> Result<(), String> {
        // SAFETY: handle came from a successful dlopen and is closed only once.
        if unsafe { libc::dlclose(handle) } == 0 {
            Ok(())
        } else {
            Err(format!("dlclose failed: {}", last_error()))
        }
    }

    fn last_error() -> String {
        // SAFETY: dlerror returns null or a thread-local nul-terminated string.
        let msg = unsafe { libc::dlerror() };
        if msg.is_null() {
            "unknown dynamic loader error".to_string()
        } else {
            unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned()
        }
    }
}
