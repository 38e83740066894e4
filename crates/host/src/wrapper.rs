//! Local adapters around foreign service objects.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use zenith_core::{
    FACTORY_IDENTITY, RefCount, SERVICE_OBJECT_IDENTITY, ServiceFactory, ServiceIdentity,
    ServiceObject, ServiceRef,
};

use crate::foreign::ForeignRef;

/// Wraps one foreign object as a host-visible service.
///
/// The wrapper carries its own reference count, independent of the
/// foreign count. It holds exactly one foreign reference (the one
/// counted when the chain was walked) for its whole lifetime, and
/// releases it exactly once when the wrapper's own count reaches zero.
/// The wrapped object therefore lives at least as long as the wrapper.
pub struct ServiceWrapper {
    refs: RefCount,
    identity: ServiceIdentity,
    name: String,
    is_factory: bool,
    foreign: Mutex<Option<ForeignRef>>,
}

impl ServiceWrapper {
    /// Wraps `foreign`, taking over its counted reference.
    pub fn new(foreign: ForeignRef) -> Self {
        let identity = foreign.class_identity();
        let mut name = foreign.name();
        if name.is_empty() {
            name = identity.to_string();
        }

        Self {
            refs: RefCount::new(),
            identity,
            name,
            is_factory: foreign.is_factory(),
            foreign: Mutex::new(Some(foreign)),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<ForeignRef>> {
        self.foreign.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drops the wrapped foreign reference. Runs exactly once, when the
    /// wrapper count reaches zero.
    fn destroy(&self) {
        self.slot().take();
    }
}

impl ServiceObject for ServiceWrapper {
    fn add_ref(&self) -> u32 {
        self.refs.increment()
    }

    fn release(&self) -> u32 {
        let remaining = self.refs.decrement();
        if remaining == 0 {
            self.destroy();
        }
        remaining
    }

    fn provides(&self, identity: &ServiceIdentity) -> bool {
        *identity == self.identity
            || *identity == SERVICE_OBJECT_IDENTITY
            || (self.is_factory && *identity == FACTORY_IDENTITY)
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn class_identity(&self) -> ServiceIdentity {
        self.identity
    }

    fn as_factory(&self) -> Option<&dyn ServiceFactory> {
        if self.is_factory { Some(self) } else { None }
    }
}

impl ServiceFactory for ServiceWrapper {
    fn produces(&self) -> ServiceIdentity {
        self.identity
    }

    fn create(&self) -> Option<ServiceRef> {
        let instance = self.slot().as_ref().and_then(ForeignRef::create)?;
        Some(ServiceRef::adopt(Arc::new(ServiceWrapper::new(instance))))
    }
}
