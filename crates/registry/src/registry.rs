//! Identity-keyed service registry.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use zenith_core::{Result, ServiceIdentity, ServiceRef, ZenithError};

/// Outcome of a successful registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registered {
    /// The identity was not present before.
    Fresh,

    /// A previous occupant was replaced and released.
    Replaced,
}

/// One registry slot.
struct RegistryEntry {
    service: ServiceRef,
    initialized: bool,
    started: bool,
}

/// Map from service identity to a live service object.
///
/// Every operation serializes on one internal lock, so the map never
/// observes a half-updated state from another thread. Entries are kept
/// in identity order, which makes enumeration deterministic within a
/// process run.
pub struct ServiceRegistry {
    entries: Mutex<BTreeMap<ServiceIdentity, RegistryEntry>>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<ServiceIdentity, RegistryEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `service` under `identity`.
    ///
    /// An existing occupant is replaced silently, last writer wins: the
    /// previous service receives exactly one release and the replacement
    /// is logged. Callers may legitimately re-register an updated
    /// factory, so this is not an error.
    pub fn register_service(
        &self,
        identity: ServiceIdentity,
        service: ServiceRef,
    ) -> Result<Registered> {
        if identity.is_null() {
            return Err(ZenithError::InvalidParameter(
                "cannot register the null identity".to_string(),
            ));
        }

        let mut entries = self.lock();
        let entry = RegistryEntry {
            service,
            initialized: false,
            started: false,
        };

        match entries.insert(identity, entry) {
            Some(previous) => {
                log::info!(
                    "replacing service {} ('{}')",
                    identity,
                    previous.service.name()
                );
                // Dropping the previous entry releases its reference.
                Ok(Registered::Replaced)
            }
            None => {
                log::debug!("registered service {identity}");
                Ok(Registered::Fresh)
            }
        }
    }

    /// Removes the entry for `identity`, releasing its reference.
    pub fn unregister_service(&self, identity: &ServiceIdentity) -> Result<()> {
        let mut entries = self.lock();
        match entries.remove(identity) {
            Some(_) => {
                log::debug!("unregistered service {identity}");
                Ok(())
            }
            None => Err(ZenithError::NotFound(identity.to_string())),
        }
    }

    /// Returns an add-ref'd handle to the service registered under
    /// `identity`.
    pub fn query_service(&self, identity: &ServiceIdentity) -> Option<ServiceRef> {
        let entries = self.lock();
        entries.get(identity).map(|entry| entry.service.clone())
    }

    /// Returns an add-ref'd handle to the service under `identity` when
    /// it provides the factory capability.
    pub fn query_factory(&self, identity: &ServiceIdentity) -> Option<ServiceRef> {
        let entries = self.lock();
        entries
            .get(identity)
            .filter(|entry| entry.service.as_factory().is_some())
            .map(|entry| entry.service.clone())
    }

    /// Snapshot of all registered identities, in identity order.
    pub fn enumerate(&self) -> Vec<ServiceIdentity> {
        self.lock().keys().copied().collect()
    }

    /// Number of registered services.
    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// Unregisters everything. Used only at full teardown.
    pub fn clear(&self) {
        let mut entries = self.lock();
        let count = entries.len();
        entries.clear();
        if count > 0 {
            log::debug!("cleared {count} registered services");
        }
    }

    /// Marks the entry initialized (or not). `NotFound` on unknown keys.
    pub fn set_initialized(&self, identity: &ServiceIdentity, value: bool) -> Result<()> {
        let mut entries = self.lock();
        match entries.get_mut(identity) {
            Some(entry) => {
                entry.initialized = value;
                Ok(())
            }
            None => Err(ZenithError::NotFound(identity.to_string())),
        }
    }

    /// Marks the entry started (or not). `NotFound` on unknown keys.
    pub fn set_started(&self, identity: &ServiceIdentity, value: bool) -> Result<()> {
        let mut entries = self.lock();
        match entries.get_mut(identity) {
            Some(entry) => {
                entry.started = value;
                Ok(())
            }
            None => Err(ZenithError::NotFound(identity.to_string())),
        }
    }

    /// Returns `(initialized, started)` for the entry, when present.
    pub fn lifecycle_flags(&self, identity: &ServiceIdentity) -> Option<(bool, bool)> {
        let entries = self.lock();
        entries
            .get(identity)
            .map(|entry| (entry.initialized, entry.started))
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use zenith_core::{RefCount, SERVICE_OBJECT_IDENTITY, ServiceObject};

    use super::*;

    struct CountingService {
        refs: RefCount,
        identity: ServiceIdentity,
        label: &'static str,
        releases: Arc<AtomicU32>,
    }

    impl CountingService {
        fn new(identity: ServiceIdentity, label: &'static str) -> (ServiceRef, Arc<AtomicU32>) {
            let releases = Arc::new(AtomicU32::new(0));
            let service = ServiceRef::adopt(Arc::new(Self {
                refs: RefCount::new(),
                identity,
                label,
                releases: Arc::clone(&releases),
            }));
            (service, releases)
        }
    }

    impl ServiceObject for CountingService {
        fn add_ref(&self) -> u32 {
            self.refs.increment()
        }

        fn release(&self) -> u32 {
            self.releases.fetch_add(1, Ordering::SeqCst);
            self.refs.decrement()
        }

        fn provides(&self, identity: &ServiceIdentity) -> bool {
            *identity == self.identity || *identity == SERVICE_OBJECT_IDENTITY
        }

        fn name(&self) -> String {
            self.label.to_string()
        }

        fn class_identity(&self) -> ServiceIdentity {
            self.identity
        }
    }

    fn identity(name: &str) -> ServiceIdentity {
        ServiceIdentity::from_name(name)
    }

    #[test]
    fn test_register_and_query() {
        let registry = ServiceRegistry::new();
        let id = identity("decoder");
        let (service, _) = CountingService::new(id, "decoder");

        assert_eq!(
            registry.register_service(id, service).unwrap(),
            Registered::Fresh
        );
        assert_eq!(registry.count(), 1);

        let found = registry.query_service(&id).unwrap();
        assert_eq!(found.name(), "decoder");

        assert!(registry.query_service(&identity("missing")).is_none());
    }

    #[test]
    fn test_replace_releases_previous_exactly_once() {
        let registry = ServiceRegistry::new();
        let id = identity("decoder");
        let (first, first_releases) = CountingService::new(id, "first");
        let (second, _) = CountingService::new(id, "second");

        registry.register_service(id, first).unwrap();
        assert_eq!(
            registry.register_service(id, second).unwrap(),
            Registered::Replaced
        );

        // Last writer wins.
        assert_eq!(registry.query_service(&id).unwrap().name(), "second");
        assert_eq!(registry.count(), 1);

        // The replaced occupant got exactly one release.
        assert_eq!(first_releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unregister_unknown_is_not_found() {
        let registry = ServiceRegistry::new();
        let result = registry.unregister_service(&identity("ghost"));
        assert!(matches!(result, Err(ZenithError::NotFound(_))));
    }

    #[test]
    fn test_null_identity_rejected() {
        let registry = ServiceRegistry::new();
        let (service, _) = CountingService::new(identity("x"), "x");
        let result = registry.register_service(ServiceIdentity::NULL, service);
        assert!(matches!(result, Err(ZenithError::InvalidParameter(_))));
    }

    #[test]
    fn test_enumerate_is_sorted_snapshot() {
        let registry = ServiceRegistry::new();
        let ids: Vec<_> = ["c", "a", "b"].iter().map(|n| identity(n)).collect();

        for id in &ids {
            let (service, _) = CountingService::new(*id, "svc");
            registry.register_service(*id, service).unwrap();
        }

        let listed = registry.enumerate();
        let mut expected = ids.clone();
        expected.sort();
        assert_eq!(listed, expected);

        // The snapshot does not track later changes.
        registry.clear();
        assert_eq!(listed.len(), 3);
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_query_factory_requires_factory_facet() {
        let registry = ServiceRegistry::new();
        let id = identity("plain");
        let (service, _) = CountingService::new(id, "plain");
        registry.register_service(id, service).unwrap();

        // CountingService exposes no factory facet.
        assert!(registry.query_factory(&id).is_none());
        assert!(registry.query_service(&id).is_some());
    }

    #[test]
    fn test_lifecycle_flags() {
        let registry = ServiceRegistry::new();
        let id = identity("hooked");
        let (service, _) = CountingService::new(id, "hooked");
        registry.register_service(id, service).unwrap();

        assert_eq!(registry.lifecycle_flags(&id), Some((false, false)));
        registry.set_initialized(&id, true).unwrap();
        registry.set_started(&id, true).unwrap();
        assert_eq!(registry.lifecycle_flags(&id), Some((true, true)));

        assert!(registry.set_initialized(&identity("ghost"), true).is_err());
    }
}
