//! Platform-abstracted dynamic module loading.
//!
//! Everything above the OS loader is written against the narrow
//! three-operation [`ModuleLoader`] contract, so the host logic stays
//! testable with a substitute loader and only [`NativeModuleLoader`]
//! ever talks to the operating system.

use std::collections::HashMap;
use std::ffi::c_void;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use zenith_core::{Result, ZenithError};

/// Opaque handle to an opened module.
///
/// Owned exclusively by the record that opened it and closed explicitly;
/// never left to a finalizer, so unload timing is deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleHandle(u64);

impl ModuleHandle {
    /// Wraps a loader-assigned handle id. Only [`ModuleLoader`]
    /// implementations mint handles.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The loader-assigned id.
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Raw address of a symbol inside an opened module.
///
/// Only valid while the owning module stays open.
#[derive(Debug, Clone, Copy)]
pub struct SymbolAddress(*const c_void);

// The address is an inert value until reinterpreted inside the foreign
// adapter layer; carrying it across threads is fine.
unsafe impl Send for SymbolAddress {}
unsafe impl Sync for SymbolAddress {}

impl SymbolAddress {
    /// Wraps a raw symbol address.
    pub fn new(address: *const c_void) -> Self {
        Self(address)
    }

    /// Returns the raw address.
    pub fn as_ptr(self) -> *const c_void {
        self.0
    }
}

/// Open/close/lookup contract over the platform's dynamic loader.
pub trait ModuleLoader: Send + Sync {
    /// Opens the module at `path`.
    ///
    /// The path must be non-empty. Failures never panic; they surface as
    /// a typed error carrying the platform loader's diagnostic string.
    fn open(&self, path: &Path) -> Result<ModuleHandle>;

    /// Closes a previously opened module. Never fails observably;
    /// closing an unknown handle is a no-op.
    fn close(&self, handle: ModuleHandle);

    /// Looks up `name` inside the module, returning its address when
    /// present.
    fn find_symbol(&self, handle: ModuleHandle, name: &str) -> Option<SymbolAddress>;
}

/// [`ModuleLoader`] over the platform's native loader via `libloading`.
pub struct NativeModuleLoader {
    libraries: Mutex<HashMap<u64, libloading::Library>>,
    next_handle: AtomicU64,
}

impl NativeModuleLoader {
    /// Creates a loader with an empty handle table.
    pub fn new() -> Self {
        Self {
            libraries: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, libloading::Library>> {
        self.libraries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for NativeModuleLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleLoader for NativeModuleLoader {
    fn open(&self, path: &Path) -> Result<ModuleHandle> {
        if path.as_os_str().is_empty() {
            return Err(ZenithError::InvalidParameter(
                "module path is empty".to_string(),
            ));
        }

        let library =
            unsafe { libloading::Library::new(path) }.map_err(|e| ZenithError::FileError {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;

        let id = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(id, library);
        Ok(ModuleHandle::new(id))
    }

    fn close(&self, handle: ModuleHandle) {
        // Dropping the library unmaps the module.
        self.lock().remove(&handle.id());
    }

    fn find_symbol(&self, handle: ModuleHandle, name: &str) -> Option<SymbolAddress> {
        let mut symbol_name = name.as_bytes().to_vec();
        symbol_name.push(0);

        let libraries = self.lock();
        let library = libraries.get(&handle.id())?;

        // Requesting the symbol as a raw pointer yields its address; the
        // foreign adapter layer reinterprets it.
        let symbol = unsafe { library.get::<*mut c_void>(&symbol_name) }.ok()?;
        Some(SymbolAddress::new(*symbol))
    }
}
