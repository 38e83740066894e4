//! The reference-counted, capability-queryable service object model.
//!
//! Every host-visible object, including adapters around foreign plugin
//! objects, implements [`ServiceObject`]. Consumers hold [`ServiceRef`]
//! handles and navigate to typed capabilities with [`ServiceRef::query`]
//! plus the narrow facet accessors, instead of downcasting through an
//! inheritance chain.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::Result;
use crate::identity::ServiceIdentity;

/// Identity of the base facet every service object provides.
pub const SERVICE_OBJECT_IDENTITY: ServiceIdentity = ServiceIdentity::new(
    0x5A3E_0001,
    0x9C41,
    0x4B7D,
    [0x8F, 0x02, 0xA1, 0x56, 0x7E, 0x90, 0x3B, 0xC8],
);

/// Identity of the lifecycle-hook capability.
pub const LIFECYCLE_IDENTITY: ServiceIdentity = ServiceIdentity::new(
    0x5A3E_0002,
    0x9C41,
    0x4B7D,
    [0x8F, 0x02, 0xA1, 0x56, 0x7E, 0x90, 0x3B, 0xC9],
);

/// Identity of the runtime enable/disable capability.
pub const TOGGLE_IDENTITY: ServiceIdentity = ServiceIdentity::new(
    0x5A3E_0003,
    0x9C41,
    0x4B7D,
    [0x8F, 0x02, 0xA1, 0x56, 0x7E, 0x90, 0x3B, 0xCA],
);

/// Identity of the service-factory capability.
pub const FACTORY_IDENTITY: ServiceIdentity = ServiceIdentity::new(
    0x5A3E_0004,
    0x9C41,
    0x4B7D,
    [0x8F, 0x02, 0xA1, 0x56, 0x7E, 0x90, 0x3B, 0xCB],
);

/// Atomic reference counter for service objects.
///
/// Starts at one: the creator holds the initial reference. The counter
/// only tracks the protocol-level lifetime; the memory of the object is
/// still owned by whatever allocation holds it.
pub struct RefCount {
    count: AtomicU32,
}

impl RefCount {
    /// Creates a counter holding the creator's initial reference.
    pub fn new() -> Self {
        Self {
            count: AtomicU32::new(1),
        }
    }

    /// Increments the count and returns the new value.
    pub fn increment(&self) -> u32 {
        self.count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Decrements the count and returns the post-decrement value.
    ///
    /// The object must destroy itself exactly once when this returns
    /// zero. Decrementing a counter already at zero is a double release:
    /// fatal in debug builds, saturating (stays at zero) in release
    /// builds.
    pub fn decrement(&self) -> u32 {
        let previous = self.count.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous != 0, "service reference count released below zero");
        if previous == 0 {
            // Undo the wrap so a release build saturates at zero.
            self.count.store(0, Ordering::Relaxed);
            return 0;
        }
        previous - 1
    }

    /// Returns the current count.
    pub fn current(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }
}

impl Default for RefCount {
    fn default() -> Self {
        Self::new()
    }
}

/// Contract implemented by every host-visible service object.
pub trait ServiceObject: Send + Sync {
    /// Increments the reference count. Safe to call from any thread.
    fn add_ref(&self) -> u32;

    /// Decrements the reference count, destroying the object's resources
    /// exactly once when the post-decrement count reaches zero. Returns
    /// the post-decrement count.
    fn release(&self) -> u32;

    /// Returns true when this object implements the capability named by
    /// `identity`. A mismatch is a normal outcome, not an error.
    fn provides(&self, identity: &ServiceIdentity) -> bool;

    /// Human-readable service name.
    fn name(&self) -> String;

    /// The identity of this object's concrete service class.
    fn class_identity(&self) -> ServiceIdentity;

    /// Lifecycle-hook facet, when provided.
    fn as_lifecycle(&self) -> Option<&dyn Lifecycle> {
        None
    }

    /// Enable/disable facet, when provided.
    fn as_toggle(&self) -> Option<&dyn Toggle> {
        None
    }

    /// Factory facet, when provided.
    fn as_factory(&self) -> Option<&dyn ServiceFactory> {
        None
    }
}

/// Lifecycle hooks sequenced by the component manager.
pub trait Lifecycle: Send + Sync {
    /// Called when the owning component is loaded.
    fn on_load(&self) -> Result<()>;

    /// Called once all components of a batch have loaded.
    fn on_system_init(&self) -> Result<()>;

    /// Called before any component of a batch unloads.
    fn on_system_quit(&self) -> Result<()>;

    /// Called when the owning component is unloaded.
    fn on_quit(&self) -> Result<()>;
}

/// Runtime enable/disable toggle.
pub trait Toggle: Send + Sync {
    fn set_enabled(&self, enabled: bool);
    fn is_enabled(&self) -> bool;
}

/// Creates instances of a service class.
pub trait ServiceFactory: Send + Sync {
    /// Identity of the service class this factory creates.
    fn produces(&self) -> ServiceIdentity;

    /// Creates a new instance, or `None` when the factory does not
    /// support direct instantiation.
    fn create(&self) -> Option<ServiceRef>;
}

/// Owning handle to a service object.
///
/// Cloning adds a reference, dropping releases one; the wrapped object
/// destroys its resources when its count reaches zero.
pub struct ServiceRef {
    inner: Arc<dyn ServiceObject>,
}

impl ServiceRef {
    /// Adopts the creator's initial reference without adding a new one.
    pub fn adopt(inner: Arc<dyn ServiceObject>) -> Self {
        Self { inner }
    }

    /// Acquires a new reference to an existing object.
    pub fn acquire(inner: Arc<dyn ServiceObject>) -> Self {
        inner.add_ref();
        Self { inner }
    }

    /// Capability query: returns an add-ref'd handle to this object when
    /// it provides `identity`, `None` otherwise. Never fails.
    pub fn query(&self, identity: &ServiceIdentity) -> Option<ServiceRef> {
        if self.inner.provides(identity) {
            Some(self.clone())
        } else {
            None
        }
    }
}

impl Clone for ServiceRef {
    fn clone(&self) -> Self {
        self.inner.add_ref();
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Drop for ServiceRef {
    fn drop(&mut self) {
        self.inner.release();
    }
}

impl Deref for ServiceRef {
    type Target = dyn ServiceObject;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl fmt::Debug for ServiceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRef")
            .field("name", &self.inner.name())
            .field("class", &self.inner.class_identity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use super::*;

    struct ProbeService {
        refs: RefCount,
        identity: ServiceIdentity,
        destroyed: Arc<AtomicBool>,
    }

    impl ProbeService {
        fn new(identity: ServiceIdentity, destroyed: Arc<AtomicBool>) -> Self {
            Self {
                refs: RefCount::new(),
                identity,
                destroyed,
            }
        }
    }

    impl ServiceObject for ProbeService {
        fn add_ref(&self) -> u32 {
            self.refs.increment()
        }

        fn release(&self) -> u32 {
            let remaining = self.refs.decrement();
            if remaining == 0 {
                let already = self.destroyed.swap(true, Ordering::SeqCst);
                assert!(!already, "service destroyed twice");
            }
            remaining
        }

        fn provides(&self, identity: &ServiceIdentity) -> bool {
            *identity == self.identity || *identity == SERVICE_OBJECT_IDENTITY
        }

        fn name(&self) -> String {
            "probe".to_string()
        }

        fn class_identity(&self) -> ServiceIdentity {
            self.identity
        }
    }

    fn probe_identity() -> ServiceIdentity {
        ServiceIdentity::from_name("probe-service")
    }

    #[test]
    fn test_add_ref_release_balance() {
        let destroyed = Arc::new(AtomicBool::new(false));
        let service = ProbeService::new(probe_identity(), Arc::clone(&destroyed));

        let n = 5;
        for _ in 0..n {
            service.add_ref();
        }

        // n releases bring the count back to the initial reference.
        for _ in 0..n {
            assert!(service.release() > 0);
            assert!(!destroyed.load(Ordering::SeqCst));
        }

        // The final release destroys exactly once.
        assert_eq!(service.release(), 0);
        assert!(destroyed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_service_ref_clone_and_drop() {
        let destroyed = Arc::new(AtomicBool::new(false));
        let service = ServiceRef::adopt(Arc::new(ProbeService::new(
            probe_identity(),
            Arc::clone(&destroyed),
        )));

        {
            let second = service.clone();
            assert_eq!(second.name(), "probe");
        }
        assert!(!destroyed.load(Ordering::SeqCst));

        drop(service);
        assert!(destroyed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_query_matches_capability_set() {
        let destroyed = Arc::new(AtomicBool::new(false));
        let identity = probe_identity();
        let service = ServiceRef::adopt(Arc::new(ProbeService::new(
            identity,
            Arc::clone(&destroyed),
        )));

        assert!(service.query(&identity).is_some());
        assert!(service.query(&SERVICE_OBJECT_IDENTITY).is_some());
        assert!(service.query(&LIFECYCLE_IDENTITY).is_none());

        // The facet returned by query keeps the object alive on its own.
        let facet = service.query(&identity).unwrap();
        drop(service);
        assert!(!destroyed.load(Ordering::SeqCst));
        drop(facet);
        assert!(destroyed.load(Ordering::SeqCst));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "released below zero")]
    fn test_double_release_is_fatal_in_debug() {
        let refs = RefCount::new();
        assert_eq!(refs.decrement(), 0);
        refs.decrement();
    }
}
