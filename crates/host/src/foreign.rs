//! The foreign object ABI.
//!
//! Modules export vtable-shaped objects through a raw C layout. All
//! unsafe pointer interpretation for those objects lives in this module;
//! the rest of the host only ever sees [`ForeignRef`] values and never a
//! raw address.

use std::ffi::{CStr, c_char, c_void};
use std::ptr::NonNull;

use zenith_core::ServiceIdentity;

use crate::module::SymbolAddress;

/// Function table shared by all foreign service objects.
///
/// Factories and the instances they create carry the same base table;
/// the `create` slot is null for objects that are not factories.
#[repr(C)]
pub struct ForeignVTable {
    /// Increments the foreign reference count, returns the new count.
    pub add_ref: unsafe extern "C" fn(object: *mut ForeignObject) -> u32,

    /// Decrements the foreign reference count, returns the new count.
    pub release: unsafe extern "C" fn(object: *mut ForeignObject) -> u32,

    /// Identity of the service class this object belongs to.
    pub class_identity: unsafe extern "C" fn(object: *const ForeignObject) -> ServiceIdentity,

    /// NUL-terminated service name; may be null.
    pub name: unsafe extern "C" fn(object: *const ForeignObject) -> *const c_char,

    /// Creates a service instance owned by the caller; null slot when
    /// the object is not a factory.
    pub create: Option<unsafe extern "C" fn(object: *mut ForeignObject) -> *mut ForeignObject>,
}

/// Header every foreign service object starts with.
#[repr(C)]
pub struct ForeignObject {
    pub vtable: *const ForeignVTable,

    /// Next factory in the module's export chain; null terminates.
    pub next: *mut ForeignObject,
}

/// Signature of the function exported under
/// [`crate::abi::ENTRY_SYMBOL`].
///
/// `extern "C-unwind"` so a panic escaping a Rust-built plugin can be
/// caught at the loader boundary instead of aborting the host.
pub type EntryFn = unsafe extern "C-unwind" fn() -> *mut ForeignObject;

/// Upper bound on factory-chain length, guarding against corrupt `next`
/// pointers that cycle.
const CHAIN_LIMIT: usize = 4096;

/// Owning reference to a foreign object.
///
/// Holds exactly one foreign reference: counted on construction,
/// released on drop. The underlying pointers are only valid while the
/// originating module stays mapped; the loader's teardown ordering keeps
/// that true.
pub struct ForeignRef {
    object: NonNull<ForeignObject>,
}

// The foreign contract requires add_ref/release to be callable from any
// thread; the wrapper adds nothing thread-affine.
unsafe impl Send for ForeignRef {}
unsafe impl Sync for ForeignRef {}

impl ForeignRef {
    /// Acquires a new reference to `object`.
    ///
    /// # Safety
    ///
    /// `object` must point to a live foreign object with a valid vtable,
    /// and stay valid for the lifetime of the returned reference.
    pub unsafe fn acquire(object: NonNull<ForeignObject>) -> Self {
        let vtable = unsafe { &*object.as_ref().vtable };
        unsafe { (vtable.add_ref)(object.as_ptr()) };
        Self { object }
    }

    /// Adopts a reference the foreign side already counted for the
    /// caller, such as an instance returned by `create`.
    ///
    /// # Safety
    ///
    /// Same validity requirements as [`ForeignRef::acquire`], and the
    /// caller must actually own the counted reference being adopted.
    pub unsafe fn adopt(object: NonNull<ForeignObject>) -> Self {
        Self { object }
    }

    fn vtable(&self) -> &ForeignVTable {
        unsafe { &*self.object.as_ref().vtable }
    }

    /// Identity of the service class the foreign object reports.
    pub fn class_identity(&self) -> ServiceIdentity {
        unsafe { (self.vtable().class_identity)(self.object.as_ptr()) }
    }

    /// Service name the foreign object reports; empty when it reports
    /// none.
    pub fn name(&self) -> String {
        let ptr = unsafe { (self.vtable().name)(self.object.as_ptr()) };
        if ptr.is_null() {
            return String::new();
        }
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
    }

    /// True when the object's vtable carries a `create` slot.
    pub fn is_factory(&self) -> bool {
        self.vtable().create.is_some()
    }

    /// Calls the foreign `create` slot, adopting the returned instance.
    pub fn create(&self) -> Option<ForeignRef> {
        let create = self.vtable().create?;
        let raw = unsafe { create(self.object.as_ptr()) };
        NonNull::new(raw).map(|instance| unsafe { ForeignRef::adopt(instance) })
    }
}

impl Clone for ForeignRef {
    fn clone(&self) -> Self {
        unsafe { ForeignRef::acquire(self.object) }
    }
}

impl Drop for ForeignRef {
    fn drop(&mut self) {
        unsafe { (self.vtable().release)(self.object.as_ptr()) };
    }
}

/// Walks the factory chain starting at `head`, acquiring a reference to
/// each node. Truncates at [`CHAIN_LIMIT`] nodes.
///
/// # Safety
///
/// `head` must be null or point to a chain of live foreign objects with
/// valid vtables and null-terminated `next` links.
pub unsafe fn walk_chain(head: *mut ForeignObject) -> Vec<ForeignRef> {
    let mut factories = Vec::new();
    let mut cursor = head;

    while let Some(object) = NonNull::new(cursor) {
        if factories.len() == CHAIN_LIMIT {
            log::warn!("factory chain exceeded {CHAIN_LIMIT} nodes, truncating");
            break;
        }

        factories.push(unsafe { ForeignRef::acquire(object) });
        cursor = unsafe { object.as_ref().next };
    }

    factories
}

/// Reinterprets a located entry symbol as the entry function.
///
/// # Safety
///
/// `address` must be the address of a function with the [`EntryFn`]
/// signature inside a module that stays open while the result is used.
pub unsafe fn entry_from_address(address: SymbolAddress) -> EntryFn {
    unsafe { std::mem::transmute::<*const c_void, EntryFn>(address.as_ptr()) }
}
