//! Zenith Host - native module loading and plugin orchestration.
//!
//! This crate owns the interop boundary: opening externally-compiled
//! dynamic modules, validating their entry contract, wrapping the
//! foreign factory objects they export, and registering the wrappers
//! into a [`zenith_registry::ServiceRegistry`].

mod abi;
mod foreign;
mod loader;
mod module;
mod wrapper;

pub use abi::{ENTRY_SYMBOL, validate};
pub use foreign::{EntryFn, ForeignObject, ForeignRef, ForeignVTable};
pub use loader::{DirectoryReport, MODULE_EXTENSION, ModuleRecord, PluginLoader};
pub use module::{ModuleHandle, ModuleLoader, NativeModuleLoader, SymbolAddress};
pub use wrapper::ServiceWrapper;
