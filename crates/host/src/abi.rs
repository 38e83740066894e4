//! Entry-point ABI validation.

use crate::module::{ModuleHandle, ModuleLoader};

/// The one well-known symbol every loadable module must export: a
/// zero-argument function returning the head of its factory chain.
pub const ENTRY_SYMBOL: &str = "zenith_client_entry";

/// Checks that the module exposes [`ENTRY_SYMBOL`].
///
/// This is a cheap smoke test, necessary but not sufficient: presence of
/// the symbol is taken as evidence the module was built against the
/// expected plugin contract, nothing more. A module failing this check
/// must be closed immediately and never have its entry invoked.
pub fn validate(loader: &dyn ModuleLoader, handle: ModuleHandle) -> bool {
    loader.find_symbol(handle, ENTRY_SYMBOL).is_some()
}
