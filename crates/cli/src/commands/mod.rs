pub mod graph;
pub mod load;
pub mod run;
pub mod scan;

use std::sync::Arc;

use zenith_components::ComponentManager;
use zenith_host::{NativeModuleLoader, PluginLoader};
use zenith_registry::ServiceRegistry;

/// Builds the host context: one registry, injected into one loader,
/// driven by one component manager.
pub(crate) fn build_manager() -> ComponentManager {
    let registry = Arc::new(ServiceRegistry::new());
    let loader = Arc::new(PluginLoader::new(
        Arc::new(NativeModuleLoader::new()),
        registry,
    ));
    ComponentManager::new(loader)
}
