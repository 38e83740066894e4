//! Load command implementation.

use std::path::Path;
use std::sync::Arc;

use miette::{Result, miette};
use zenith_host::{NativeModuleLoader, PluginLoader};
use zenith_registry::ServiceRegistry;

use crate::output;

/// Loads one plugin module and lists the services it registered.
pub fn execute(path: &Path) -> Result<()> {
    let registry = Arc::new(ServiceRegistry::new());
    let loader = PluginLoader::new(Arc::new(NativeModuleLoader::new()), registry);

    loader.load_plugin(path).map_err(|e| {
        let detail = loader.last_error().unwrap_or_else(|| e.to_string());
        miette!("Failed to load {}: {}", path.display(), detail)
    })?;

    let record = loader
        .module(path)
        .ok_or_else(|| miette!("Module record missing after load"))?;

    output::success(&format!(
        "Loaded {} ({} services, {}ms)",
        record.name, record.service_count, record.load_time_ms
    ));

    for descriptor in loader.services() {
        output::list_item(&format!("{} {}", descriptor.identity, descriptor.name));
    }

    loader.unload_all();
    Ok(())
}
