//! The runtime resolution probe.
//!
//! Steps run in a fixed order and the first failure ends the probe:
//!
//! 1. validate the query
//! 2. locate hostfxr
//! 3. load hostfxr and resolve its exports
//! 4. compute the runtime config path
//! 5. write the runtime config (synthesized queries only)
//! 6. `hostfxr_initialize_for_runtime_config`
//!
//! The context from step 6 and the library from step 3 are held by guards, so
//! they are closed and unloaded on every path out of [`Probe::run`]. Cleanup
//! failures are logged and never change the outcome.

use std::ops::Deref;

use crate::descriptor::{DescriptorLocation, resolve_descriptor_path, write_runtime_config};
use crate::error::CleanupWarning;
use crate::log::{LogSink, ProbeLog};
use crate::resolver::{Initialized, ResolverBackend, ResolverLibrary, ResolverLoader};
use crate::runtime::RuntimeQuery;
use crate::{Error, Result};

/// Final result of one probe. Consumed by [`crate::exit::exit_code`].
pub type ProbeOutcome = Result<()>;

/// One dry-run resolution against a resolver loader.
pub struct Probe<'a, L: ResolverLoader> {
    loader: &'a L,
    log: ProbeLog<'a>,
    descriptor_location: DescriptorLocation,
}

impl<'a, L: ResolverLoader> Probe<'a, L> {
    pub fn new(loader: &'a L, sink: &'a dyn LogSink) -> Self {
        Self {
            loader,
            log: ProbeLog::new(sink),
            descriptor_location: DescriptorLocation::default(),
        }
    }

    /// Where synthesized runtime configs are written.
    pub fn descriptor_location(mut self, location: DescriptorLocation) -> Self {
        self.descriptor_location = location;
        self
    }

    /// Run the probe to completion.
    pub fn run(&self, query: &RuntimeQuery) -> ProbeOutcome {
        query.validate().map_err(|e| self.fail(e))?;

        let hostfxr_path = self.loader.locate(self.log).map_err(|e| self.fail(e))?;
        self.log
            .info(&format!("Found HostFxr: '{}'", hostfxr_path.display()));

        let hostfxr = self.loader.load(&hostfxr_path).map_err(|e| self.fail(e))?;
        let hostfxr = LoadedLibrary::new(hostfxr, self.log);

        let runtime_config = resolve_descriptor_path(query, &self.descriptor_location, self.log)
            .map_err(|e| self.fail(e))?;

        if let RuntimeQuery::Synthesized {
            framework_name,
            framework_version,
            roll_forward,
        } = query
        {
            self.log
                .info(&format!("Framework Name:    '{}'", framework_name));
            self.log
                .info(&format!("Framework Version: '{}'", framework_version));
            if let Some(policy) = roll_forward {
                self.log.info(&format!("Roll Forward:      '{}'", policy));
            }

            write_runtime_config(
                &runtime_config,
                framework_name,
                framework_version,
                *roll_forward,
                self.log,
            )
            .map_err(|e| self.fail(e))?;
        }

        self.log
            .info("Calling hostfxr_initialize_for_runtime_config...");
        let Initialized { status, context } = hostfxr.initialize_for_descriptor(&runtime_config);
        let context = OpenContext::new(&*hostfxr, context, self.log);

        if status != 0 || !context.is_open() {
            return Err(self.fail(Error::Initialize { status }));
        }

        self.log
            .info("hostfxr_initialize_for_runtime_config succeeded.");
        Ok(())
    }

    fn fail(&self, error: Error) -> Error {
        self.log.error(&error.to_string());
        error
    }
}

/// Unloads the resolver library when dropped.
struct LoadedLibrary<'a, R: ResolverLibrary> {
    library: Option<R>,
    log: ProbeLog<'a>,
}

impl<'a, R: ResolverLibrary> LoadedLibrary<'a, R> {
    fn new(library: R, log: ProbeLog<'a>) -> Self {
        Self {
            library: Some(library),
            log,
        }
    }
}

impl<R: ResolverLibrary> Deref for LoadedLibrary<'_, R> {
    type Target = R;

    fn deref(&self) -> &R {
        // Only `drop` takes the library out.
        self.library.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl<R: ResolverLibrary> Drop for LoadedLibrary<'_, R> {
    fn drop(&mut self) {
        if let Some(library) = self.library.take() {
            match library.unload() {
                Ok(()) => self.log.debug("Unloaded hostfxr."),
                Err(warning) => self.log.warn(&warning.to_string()),
            }
        }
    }
}

/// Closes a resolver context, if one was produced, when dropped.
struct OpenContext<'a, B: ResolverBackend> {
    backend: &'a B,
    context: Option<B::Context>,
    log: ProbeLog<'a>,
}

impl<'a, B: ResolverBackend> OpenContext<'a, B> {
    fn new(backend: &'a B, context: Option<B::Context>, log: ProbeLog<'a>) -> Self {
        Self {
            backend,
            context,
            log,
        }
    }

    fn is_open(&self) -> bool {
        self.context.is_some()
    }
}

impl<B: ResolverBackend> Drop for OpenContext<'_, B> {
    fn drop(&mut self) {
        if let Some(context) = self.context.take() {
            let status = self.backend.close(context);
            if status != 0 {
                self.log
                    .warn(&CleanupWarning::CloseFailed { status }.to_string());
            }
        }
    }
}
