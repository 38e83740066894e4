//! Plugin loading orchestration.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use zenith_core::{Result, ServiceDescriptor, ServiceIdentity, ServiceRef, ZenithError};
use zenith_registry::ServiceRegistry;

use crate::abi;
use crate::foreign;
use crate::module::{ModuleHandle, ModuleLoader};
use crate::wrapper::ServiceWrapper;

/// Platform-native dynamic module extension, matched case-insensitively
/// during directory scans.
#[cfg(target_os = "windows")]
pub const MODULE_EXTENSION: &str = "dll";
#[cfg(target_os = "macos")]
pub const MODULE_EXTENSION: &str = "dylib";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub const MODULE_EXTENSION: &str = "so";

/// Record of one loaded module.
#[derive(Debug, Clone)]
pub struct ModuleRecord {
    pub path: PathBuf,
    pub handle: Option<ModuleHandle>,
    pub loaded: bool,
    pub name: String,
    pub version: String,
    pub error: Option<String>,
    pub service_count: u32,
    pub load_time_ms: u64,
}

/// Tally of a directory load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectoryReport {
    pub loaded: usize,
    pub failed: usize,
}

struct LoaderState {
    modules: Vec<ModuleRecord>,
    /// Wrappers created per module; dropped (and thereby released)
    /// before the owning module's handle is closed.
    wrappers: HashMap<PathBuf, Vec<ServiceRef>>,
    /// Identities each module registered, for teardown purging.
    registered: HashMap<PathBuf, Vec<ServiceIdentity>>,
    /// Descriptors of everything registered, kept for introspection.
    services: Vec<ServiceDescriptor>,
    last_error: Option<String>,
}

/// Loads single modules, wraps their exported factories, and registers
/// the wrappers into the service registry.
///
/// Every mutating operation holds one internal lock for its entire
/// duration, so concurrent loads are serialized, never interleaved.
/// Loading is fully synchronous with no timeout: a module that hangs in
/// its initializers hangs the calling thread.
pub struct PluginLoader {
    modules: Arc<dyn ModuleLoader>,
    registry: Arc<ServiceRegistry>,
    state: Mutex<LoaderState>,
}

impl PluginLoader {
    /// Creates a loader over the given module loader and registry.
    pub fn new(modules: Arc<dyn ModuleLoader>, registry: Arc<ServiceRegistry>) -> Self {
        Self {
            modules,
            registry,
            state: Mutex::new(LoaderState {
                modules: Vec::new(),
                wrappers: HashMap::new(),
                registered: HashMap::new(),
                services: Vec::new(),
                last_error: None,
            }),
        }
    }

    /// The registry this loader registers services into.
    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    fn lock(&self) -> MutexGuard<'_, LoaderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records `error` as the last failure and returns it.
    fn fail(state: &mut LoaderState, error: ZenithError) -> ZenithError {
        state.last_error = Some(error.to_string());
        error
    }

    /// Loads the module at `path` and registers its exported services.
    ///
    /// On any failure the module is closed and every wrapper already
    /// created for it is released; the registry never retains a service
    /// from a module that failed to load.
    pub fn load_plugin(&self, path: &Path) -> Result<()> {
        let mut state = self.lock();

        if path.as_os_str().is_empty() {
            return Err(Self::fail(
                &mut state,
                ZenithError::InvalidParameter("plugin path is empty".to_string()),
            ));
        }

        if state.modules.iter().any(|m| m.path == path) {
            return Err(Self::fail(
                &mut state,
                ZenithError::AlreadyLoaded(path.to_path_buf()),
            ));
        }

        let started = Instant::now();

        let handle = match self.modules.open(path) {
            Ok(handle) => handle,
            Err(error) => return Err(Self::fail(&mut state, error)),
        };

        if !abi::validate(self.modules.as_ref(), handle) {
            self.modules.close(handle);
            return Err(Self::fail(
                &mut state,
                ZenithError::NotSupported(path.to_path_buf()),
            ));
        }

        let Some(address) = self.modules.find_symbol(handle, abi::ENTRY_SYMBOL) else {
            self.modules.close(handle);
            return Err(Self::fail(
                &mut state,
                ZenithError::NotSupported(path.to_path_buf()),
            ));
        };

        let entry = unsafe { foreign::entry_from_address(address) };
        let head = match panic::catch_unwind(AssertUnwindSafe(|| unsafe { entry() })) {
            Ok(head) => head,
            Err(_) => {
                self.modules.close(handle);
                return Err(Self::fail(
                    &mut state,
                    ZenithError::EntryCrashed(path.to_path_buf()),
                ));
            }
        };

        let factories = unsafe { foreign::walk_chain(head) };

        let mut descriptors = Vec::new();
        let mut wrappers: Vec<ServiceRef> = Vec::new();
        let mut identities: Vec<ServiceIdentity> = Vec::new();

        for factory in factories {
            let identity = factory.class_identity();
            if identity.is_null() {
                log::warn!("skipping export with null identity in {}", path.display());
                descriptors.push(ServiceDescriptor::new(identity, factory.name()).unavailable());
                continue;
            }

            let wrapper = ServiceRef::adopt(Arc::new(ServiceWrapper::new(factory)));
            let descriptor = ServiceDescriptor::new(identity, wrapper.name());

            if let Err(error) = self.registry.register_service(identity, wrapper.clone()) {
                // Abort the whole load: roll back what this module
                // already registered, then close it.
                for registered in &identities {
                    let _ = self.registry.unregister_service(registered);
                }
                drop(wrappers);
                drop(wrapper);
                self.modules.close(handle);
                return Err(Self::fail(
                    &mut state,
                    ZenithError::RegistrationFailure {
                        identity,
                        reason: error.to_string(),
                    },
                ));
            }

            identities.push(identity);
            wrappers.push(wrapper);
            descriptors.push(descriptor);
        }

        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let record = ModuleRecord {
            path: path.to_path_buf(),
            handle: Some(handle),
            loaded: true,
            name,
            version: "1.0.0".to_string(),
            error: None,
            service_count: identities.len() as u32,
            load_time_ms: started.elapsed().as_millis() as u64,
        };

        log::info!(
            "loaded plugin {} ({} services, {}ms)",
            path.display(),
            record.service_count,
            record.load_time_ms
        );

        state.modules.push(record);
        state.wrappers.insert(path.to_path_buf(), wrappers);
        state.registered.insert(path.to_path_buf(), identities);
        state.services.extend(descriptors);
        Ok(())
    }

    /// Unloads the module at `path`.
    ///
    /// The module's registered services are purged from the registry and
    /// its wrappers released *before* the handle is closed: a registered
    /// service must never outlive the code it points into.
    pub fn unload_plugin(&self, path: &Path) -> Result<()> {
        let mut state = self.lock();

        if path.as_os_str().is_empty() {
            return Err(Self::fail(
                &mut state,
                ZenithError::InvalidParameter("plugin path is empty".to_string()),
            ));
        }

        let Some(index) = state.modules.iter().position(|m| m.path == path) else {
            return Err(Self::fail(
                &mut state,
                ZenithError::FileNotFound(path.to_path_buf()),
            ));
        };

        Self::purge_module(&mut state, &self.registry, path);

        let mut record = state.modules.remove(index);
        if let Some(handle) = record.handle.take() {
            self.modules.close(handle);
        }

        log::info!("unloaded plugin {}", path.display());
        Ok(())
    }

    /// Unregisters a module's services and releases its wrappers.
    fn purge_module(state: &mut LoaderState, registry: &ServiceRegistry, path: &Path) {
        if let Some(identities) = state.registered.remove(path) {
            for identity in &identities {
                // NotFound is fine: a later registration may have
                // replaced (and thereby released) this slot already.
                let _ = registry.unregister_service(identity);
            }
            state
                .services
                .retain(|descriptor| !identities.contains(&descriptor.identity));
        }
        state.wrappers.remove(path);
    }

    /// Attempts to load every module file in `dir`.
    ///
    /// Files are selected by the platform module extension, compared
    /// case-insensitively. Individual failures are tallied and logged,
    /// not propagated; the batch succeeds iff at least one module
    /// loaded.
    pub fn load_plugins_from_directory(&self, dir: &Path) -> Result<DirectoryReport> {
        if dir.as_os_str().is_empty() {
            let mut state = self.lock();
            return Err(Self::fail(
                &mut state,
                ZenithError::InvalidParameter("plugin directory is empty".to_string()),
            ));
        }

        if !dir.is_dir() {
            let mut state = self.lock();
            return Err(Self::fail(
                &mut state,
                ZenithError::FileNotFound(dir.to_path_buf()),
            ));
        }

        let mut report = DirectoryReport::default();

        let mut candidates: Vec<PathBuf> = std::fs::read_dir(dir)?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && has_module_extension(path))
            .collect();
        candidates.sort();

        for path in candidates {
            match self.load_plugin(&path) {
                Ok(()) => report.loaded += 1,
                Err(error) => {
                    log::warn!("failed to load {}: {}", path.display(), error);
                    report.failed += 1;
                }
            }
        }

        log::info!(
            "scanned {}: {} loaded, {} failed",
            dir.display(),
            report.loaded,
            report.failed
        );

        if report.loaded == 0 {
            let mut state = self.lock();
            return Err(Self::fail(
                &mut state,
                ZenithError::NoModulesLoaded(dir.to_path_buf()),
            ));
        }

        Ok(report)
    }

    /// Unloads everything: releases every wrapper and registry entry,
    /// then closes every module handle, then clears the module list.
    pub fn unload_all(&self) {
        let mut state = self.lock();

        let paths: Vec<PathBuf> = state.modules.iter().map(|m| m.path.clone()).collect();
        for path in &paths {
            Self::purge_module(&mut state, &self.registry, path);
        }

        for record in &mut state.modules {
            if let Some(handle) = record.handle.take() {
                self.modules.close(handle);
            }
        }

        state.modules.clear();
        state.wrappers.clear();
        state.services.clear();
        log::info!("unloaded all plugins");
    }

    /// Number of loaded modules.
    pub fn module_count(&self) -> usize {
        self.lock().modules.len()
    }

    /// Snapshot of all module records.
    pub fn modules(&self) -> Vec<ModuleRecord> {
        self.lock().modules.clone()
    }

    /// Record for the module at `path`, when loaded.
    pub fn module(&self, path: &Path) -> Option<ModuleRecord> {
        self.lock()
            .modules
            .iter()
            .find(|m| m.path == path)
            .cloned()
    }

    /// True when the module at `path` is loaded.
    pub fn is_plugin_loaded(&self, path: &Path) -> bool {
        self.lock().modules.iter().any(|m| m.path == path)
    }

    /// Snapshot of every registered service descriptor.
    pub fn services(&self) -> Vec<ServiceDescriptor> {
        self.lock().services.clone()
    }

    /// Human-readable description of the most recent failure.
    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }
}

fn has_module_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(MODULE_EXTENSION))
        .unwrap_or(false)
}
