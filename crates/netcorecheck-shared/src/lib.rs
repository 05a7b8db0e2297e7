//! Runtime resolution probe shared by the netcorecheck CLI and custom action.
//!
//! Answers "is a runtime that satisfies this framework reference installed?"
//! without launching an application: hostfxr is loaded and asked to
//! initialize for a runtime config, and the outcome becomes an exit code.
//!
//! # Architecture
//!
//! - [`RuntimeQuery`] - what to resolve: an existing runtime config, or a
//!   framework name and version to synthesize one from
//! - [`Probe`] - the step sequence, with guaranteed hostfxr cleanup
//! - [`ResolverLoader`] / [`ResolverBackend`] - the seam hostfxr sits behind
//! - [`exit`] - outcome to exit code mapping

pub mod descriptor;
pub mod error;
pub mod exit;
pub mod hostfxr;
pub mod library;
pub mod locate;
pub mod log;
pub mod probe;
pub mod resolver;
pub mod runtime;

pub use descriptor::DescriptorLocation;
pub use error::{CleanupWarning, Error, Result};
pub use exit::{codes, exit_code};
pub use hostfxr::HostfxrLoader;
pub use locate::DiscoveryConfig;
pub use log::{LogLevel, LogSink, MemoryLog, NullLog, ProbeLog};
pub use probe::{Probe, ProbeOutcome};
pub use resolver::{Initialized, ResolverBackend, ResolverLibrary, ResolverLoader};
pub use runtime::{RollForward, RuntimeQuery};
