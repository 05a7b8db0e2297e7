//! Seams between the probe and the runtime resolver library.
//!
//! The probe only sees these traits. [`crate::hostfxr`] implements them on top
//! of the real hostfxr; tests implement them in memory.

use std::path::{Path, PathBuf};

use crate::error::CleanupWarning;
use crate::log::ProbeLog;
use crate::Result;

/// Outcome of an "initialize for runtime config" call.
#[derive(Debug)]
pub struct Initialized<C> {
    /// Raw status returned by the resolver.
    pub status: i32,
    /// Context handle, if the resolver produced one.
    pub context: Option<C>,
}

/// The two resolver entry points a probe needs.
pub trait ResolverBackend {
    /// Opaque handle returned by initialization.
    type Context;

    /// Dry-run initialization against a runtime config file.
    fn initialize_for_descriptor(&self, descriptor: &Path) -> Initialized<Self::Context>;

    /// Release a context obtained from [`Self::initialize_for_descriptor`].
    /// Returns the resolver's raw status.
    fn close(&self, context: Self::Context) -> i32;
}

/// A loaded resolver library with both entry points resolved.
pub trait ResolverLibrary: ResolverBackend {
    /// Unload the library. Consumes it so it cannot be used afterwards.
    fn unload(self) -> std::result::Result<(), CleanupWarning>;
}

/// Finds and loads the resolver library.
pub trait ResolverLoader {
    type Library: ResolverLibrary;

    /// Locate the resolver library. Fails with `ResolverNotFound`.
    fn locate(&self, log: ProbeLog<'_>) -> Result<PathBuf>;

    /// Load the library and resolve both entry points. Fails with
    /// `ExportResolution`; a library loaded before the failure is released
    /// before returning.
    fn load(&self, path: &Path) -> Result<Self::Library>;
}
