//! Component lifecycle management.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use zenith_core::{LIFECYCLE_IDENTITY, Result, ServiceIdentity, TOGGLE_IDENTITY, ZenithError};
use zenith_host::{MODULE_EXTENSION, PluginLoader};
use zenith_registry::ServiceRegistry;

use crate::graph::DependencyGraph;
use crate::info::{ComponentInfo, ComponentKind, ComponentRecord};
use crate::manifest::ComponentManifest;

/// Outcome of a batch load.
///
/// Batches never abort early: skipped and failed components are
/// tallied while the rest of the batch proceeds.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Components loaded by this batch, in load order.
    pub loaded: Vec<String>,

    /// Components skipped because their dependencies never resolved.
    pub skipped: Vec<String>,

    /// Components whose module failed to load, with the failure text.
    pub failed: Vec<(String, String)>,
}

impl BatchReport {
    /// True when nothing was skipped or failed.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty() && self.failed.is_empty()
    }
}

#[derive(Clone, Copy)]
enum HookPhase {
    Load,
    SystemInit,
    SystemQuit,
    Quit,
}

impl HookPhase {
    fn label(self) -> &'static str {
        match self {
            HookPhase::Load => "on_load",
            HookPhase::SystemInit => "on_system_init",
            HookPhase::SystemQuit => "on_system_quit",
            HookPhase::Quit => "on_quit",
        }
    }
}

struct Catalog {
    components: BTreeMap<ServiceIdentity, ComponentRecord>,
    next_discovery_index: u64,
}

/// Catalog of components across many modules: discovery, dependency
/// resolution, deterministic load ordering, and lifecycle sequencing.
///
/// Load order is ascending `load_order` with ties broken by discovery
/// order; shutdown order is its exact mirror.
pub struct ComponentManager {
    loader: Arc<PluginLoader>,
    catalog: Mutex<Catalog>,
    errors: Mutex<Vec<String>>,
}

impl ComponentManager {
    /// Creates a manager driving the given plugin loader.
    pub fn new(loader: Arc<PluginLoader>) -> Self {
        Self {
            loader,
            catalog: Mutex::new(Catalog {
                components: BTreeMap::new(),
                next_discovery_index: 0,
            }),
            errors: Mutex::new(Vec::new()),
        }
    }

    /// The plugin loader this manager drives.
    pub fn loader(&self) -> &Arc<PluginLoader> {
        &self.loader
    }

    fn lock_catalog(&self) -> MutexGuard<'_, Catalog> {
        self.catalog.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Discovers candidate module files in `dir` and catalogs them
    /// without executing any module code. Returns the number of newly
    /// cataloged components; duplicates by identity are skipped and
    /// logged.
    pub fn scan_components(&self, dir: &Path) -> Result<usize> {
        if !dir.is_dir() {
            self.add_error(format!("component directory not found: {}", dir.display()));
            return Err(ZenithError::FileNotFound(dir.to_path_buf()));
        }

        let mut candidates: Vec<PathBuf> = std::fs::read_dir(dir)?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(MODULE_EXTENSION))
                        .unwrap_or(false)
            })
            .collect();
        candidates.sort();

        let mut discovered = 0;
        let mut catalog = self.lock_catalog();
        for path in candidates {
            let mut record = self.extract_record(&path);
            let identity = record.info.identity;

            if catalog.components.contains_key(&identity) {
                log::info!(
                    "skipping duplicate component '{}' from {}",
                    record.info.name,
                    path.display()
                );
                continue;
            }

            record.discovery_index = catalog.next_discovery_index;
            catalog.next_discovery_index += 1;
            catalog.components.insert(identity, record);
            discovered += 1;
        }
        drop(catalog);

        log::info!("discovered {} components in {}", discovered, dir.display());
        Ok(discovered)
    }

    /// Builds a catalog record for one module file, from its sidecar
    /// manifest when present, synthesized defaults otherwise.
    fn extract_record(&self, path: &Path) -> ComponentRecord {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let (file_size, last_modified) = match std::fs::metadata(path) {
            Ok(metadata) => (metadata.len(), metadata.modified().ok()),
            Err(_) => (0, None),
        };

        let sidecar = ComponentManifest::sidecar_path(path);
        let manifest = if sidecar.is_file() {
            match ComponentManifest::from_file(&sidecar) {
                Ok(manifest) => Some(manifest),
                Err(error) => {
                    self.add_error(format!(
                        "ignoring manifest {}: {}",
                        sidecar.display(),
                        error
                    ));
                    None
                }
            }
        } else {
            None
        };

        let manifest = manifest.unwrap_or_else(|| {
            let mut synthesized = ComponentManifest::minimal(stem.clone(), "1.0.0");
            synthesized.kind = ComponentKind::from_file_name(&stem);
            synthesized
        });

        ComponentRecord {
            info: ComponentInfo {
                name: manifest.name.clone(),
                version: manifest.version.clone(),
                description: manifest.description.clone().unwrap_or_default(),
                author: manifest
                    .author
                    .clone()
                    .unwrap_or_else(|| "Unknown".to_string()),
                identity: manifest.resolved_identity(),
                file_path: path.to_path_buf(),
                kind: manifest.kind,
                is_loaded: false,
                is_enabled: manifest.enabled,
                load_order: manifest.load_order,
                last_modified,
                file_size,
            },
            dependencies: manifest.dependencies,
            dependency_satisfied: false,
            module: None,
            discovery_index: 0,
        }
    }

    /// Fixpoint dependency resolution.
    ///
    /// A record's dependencies are satisfied when every named dependency
    /// exists in the catalog and is itself satisfied; records with no
    /// dependencies are vacuously satisfied. Each pass flips at least
    /// one record or stops, so the iteration terminates within one pass
    /// per component. Records on a cycle, or naming a missing
    /// dependency, stay unsatisfied forever. Returns true when every
    /// record resolved.
    pub fn resolve_dependencies(&self) -> bool {
        let mut catalog = self.lock_catalog();

        let mut changed = true;
        while changed {
            changed = false;

            let satisfied: HashSet<String> = catalog
                .components
                .values()
                .filter(|r| r.dependency_satisfied)
                .map(|r| r.info.name.clone())
                .collect();

            for record in catalog.components.values_mut() {
                if record.dependency_satisfied {
                    continue;
                }
                if record.dependencies.iter().all(|dep| satisfied.contains(dep)) {
                    record.dependency_satisfied = true;
                    changed = true;
                    log::debug!("dependencies satisfied for '{}'", record.info.name);
                }
            }
        }

        let known: HashSet<String> = catalog
            .components
            .values()
            .map(|r| r.info.name.clone())
            .collect();

        let mut all_resolved = true;
        for record in catalog.components.values() {
            if record.dependency_satisfied {
                continue;
            }
            all_resolved = false;
            for dep in &record.dependencies {
                if !known.contains(dep) {
                    self.add_error(format!(
                        "component '{}' requires missing dependency '{}'",
                        record.info.name, dep
                    ));
                }
            }
        }

        if !all_resolved {
            let pairs: Vec<(String, Vec<String>)> = catalog
                .components
                .values()
                .map(|r| (r.info.name.clone(), r.dependencies.clone()))
                .collect();
            for member in DependencyGraph::from_components(&pairs).cycle_members() {
                self.add_error(format!("dependency cycle involves component '{member}'"));
            }
        }

        all_resolved
    }

    /// Loads every enabled, not-yet-loaded component whose dependencies
    /// resolved, in ascending load order. Components with unresolved
    /// dependencies are skipped and logged; a failing module never
    /// aborts the batch. After the pass, fires `on_system_init` across
    /// all loaded components.
    pub fn load_all_components(&self) -> BatchReport {
        self.resolve_dependencies();

        let registry = Arc::clone(self.loader.registry());
        let mut catalog = self.lock_catalog();
        let mut report = BatchReport::default();

        let mut order: Vec<(u32, u64, ServiceIdentity)> = catalog
            .components
            .values()
            .filter(|r| !r.info.is_loaded && r.info.is_enabled)
            .map(|r| (r.info.load_order, r.discovery_index, r.info.identity))
            .collect();
        order.sort();

        for (_, _, identity) in order {
            let Some(record) = catalog.components.get_mut(&identity) else {
                continue;
            };

            if !record.dependency_satisfied {
                self.add_error(format!(
                    "skipped component '{}': unsatisfied dependencies",
                    record.info.name
                ));
                report.skipped.push(record.info.name.clone());
                continue;
            }

            match self.loader.load_plugin(&record.info.file_path) {
                Ok(()) => {
                    record.info.is_loaded = true;
                    record.module = Some(record.info.file_path.clone());
                    report.loaded.push(record.info.name.clone());

                    self.run_hook(&registry, &identity, &record.info.name, HookPhase::Load);
                    let _ = registry.set_initialized(&identity, true);
                }
                Err(error) => {
                    self.add_error(format!(
                        "failed to load component '{}': {}",
                        record.info.name, error
                    ));
                    report.failed.push((record.info.name.clone(), error.to_string()));
                }
            }
        }

        let mut initialized: Vec<(u32, u64, ServiceIdentity, String)> = catalog
            .components
            .values()
            .filter(|r| r.info.is_loaded)
            .map(|r| {
                (
                    r.info.load_order,
                    r.discovery_index,
                    r.info.identity,
                    r.info.name.clone(),
                )
            })
            .collect();
        initialized.sort();

        for (_, _, identity, name) in initialized {
            self.run_hook(&registry, &identity, &name, HookPhase::SystemInit);
            let _ = registry.set_started(&identity, true);
        }

        report
    }

    /// Unloads every loaded component in the exact reverse of load
    /// order: `on_system_quit` across the whole set first, then each
    /// component's `on_quit` followed by its module unload.
    pub fn unload_all_components(&self) {
        let registry = Arc::clone(self.loader.registry());
        let mut catalog = self.lock_catalog();

        let mut order: Vec<(u32, u64, ServiceIdentity, String)> = catalog
            .components
            .values()
            .filter(|r| r.info.is_loaded)
            .map(|r| {
                (
                    r.info.load_order,
                    r.discovery_index,
                    r.info.identity,
                    r.info.name.clone(),
                )
            })
            .collect();
        order.sort();
        order.reverse();

        for (_, _, identity, name) in &order {
            self.run_hook(&registry, identity, name, HookPhase::SystemQuit);
            let _ = registry.set_started(identity, false);
        }

        for (_, _, identity, name) in &order {
            self.run_hook(&registry, identity, name, HookPhase::Quit);

            let Some(record) = catalog.components.get_mut(identity) else {
                continue;
            };
            if let Some(path) = record.module.take() {
                if let Err(error) = self.loader.unload_plugin(&path) {
                    self.add_error(format!("failed to unload component '{name}': {error}"));
                }
            }
            record.info.is_loaded = false;
        }

        if !order.is_empty() {
            log::info!("unloaded {} components", order.len());
        }
    }

    /// Invokes one lifecycle hook on the component's live service, when
    /// it provides the lifecycle capability. Hook failures go to the
    /// error log, never to the caller.
    fn run_hook(
        &self,
        registry: &ServiceRegistry,
        identity: &ServiceIdentity,
        name: &str,
        phase: HookPhase,
    ) {
        let Some(service) = registry.query_service(identity) else {
            return;
        };
        let Some(facet) = service.query(&LIFECYCLE_IDENTITY) else {
            return;
        };
        let Some(lifecycle) = facet.as_lifecycle() else {
            return;
        };

        let result = match phase {
            HookPhase::Load => lifecycle.on_load(),
            HookPhase::SystemInit => lifecycle.on_system_init(),
            HookPhase::SystemQuit => lifecycle.on_system_quit(),
            HookPhase::Quit => lifecycle.on_quit(),
        };

        if let Err(error) = result {
            self.add_error(format!("{} failed for '{}': {}", phase.label(), name, error));
        }
    }

    /// Toggles the enabled flag, forwarding to the live service when one
    /// exists. Disabled components stay cataloged but are skipped by
    /// batch loads.
    pub fn enable_component(&self, identity: &ServiceIdentity, enabled: bool) -> Result<()> {
        let mut catalog = self.lock_catalog();
        let Some(record) = catalog.components.get_mut(identity) else {
            return Err(ZenithError::NotFound(identity.to_string()));
        };

        record.info.is_enabled = enabled;

        if record.info.is_loaded {
            if let Some(service) = self.loader.registry().query_service(identity) {
                if let Some(facet) = service.query(&TOGGLE_IDENTITY) {
                    if let Some(toggle) = facet.as_toggle() {
                        toggle.set_enabled(enabled);
                    }
                }
            }
        }

        Ok(())
    }

    /// The enabled flag for a cataloged component.
    pub fn is_component_enabled(&self, identity: &ServiceIdentity) -> Option<bool> {
        self.lock_catalog()
            .components
            .get(identity)
            .map(|r| r.info.is_enabled)
    }

    /// Overrides a component's position in the load order.
    pub fn set_component_load_order(&self, identity: &ServiceIdentity, order: u32) -> Result<()> {
        let mut catalog = self.lock_catalog();
        match catalog.components.get_mut(identity) {
            Some(record) => {
                record.info.load_order = order;
                Ok(())
            }
            None => Err(ZenithError::NotFound(identity.to_string())),
        }
    }

    /// A component's position in the load order.
    pub fn component_load_order(&self, identity: &ServiceIdentity) -> Option<u32> {
        self.lock_catalog()
            .components
            .get(identity)
            .map(|r| r.info.load_order)
    }

    /// Number of cataloged components.
    pub fn component_count(&self) -> usize {
        self.lock_catalog().components.len()
    }

    /// Snapshot of the whole catalog, in identity order.
    pub fn components(&self) -> Vec<ComponentRecord> {
        self.lock_catalog().components.values().cloned().collect()
    }

    /// Record for one component, when cataloged.
    pub fn find_component(&self, identity: &ServiceIdentity) -> Option<ComponentRecord> {
        self.lock_catalog().components.get(identity).cloned()
    }

    /// Record for one component looked up by name.
    pub fn find_component_by_name(&self, name: &str) -> Option<ComponentRecord> {
        self.lock_catalog()
            .components
            .values()
            .find(|r| r.info.name == name)
            .cloned()
    }

    /// All cataloged components of one kind.
    pub fn components_by_kind(&self, kind: ComponentKind) -> Vec<ComponentRecord> {
        self.lock_catalog()
            .components
            .values()
            .filter(|r| r.info.kind == kind)
            .cloned()
            .collect()
    }

    /// Dependency graph over the current catalog, for display and
    /// diagnostics.
    pub fn dependency_graph(&self) -> DependencyGraph {
        let pairs: Vec<(String, Vec<String>)> = self
            .lock_catalog()
            .components
            .values()
            .map(|r| (r.info.name.clone(), r.dependencies.clone()))
            .collect();
        DependencyGraph::from_components(&pairs)
    }

    fn add_error(&self, message: String) {
        log::error!("{message}");
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
    }

    /// Most recent diagnostic, when any.
    pub fn last_error_message(&self) -> Option<String> {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Snapshot of the append-only error log.
    pub fn error_log(&self) -> Vec<String> {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Clears the error log.
    pub fn clear_error_log(&self) {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet as StdHashSet;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    use serde_json::json;
    use zenith_core::{
        Lifecycle, RefCount, SERVICE_OBJECT_IDENTITY, ServiceObject, ServiceRef, Toggle,
    };
    use zenith_host::{ENTRY_SYMBOL, ForeignObject, ModuleHandle, ModuleLoader, SymbolAddress};

    use super::*;

    unsafe extern "C-unwind" fn empty_entry() -> *mut ForeignObject {
        std::ptr::null_mut()
    }

    /// Loader stand-in: any existing file opens, and every open module
    /// exports an entry returning an empty factory chain.
    struct StubModuleLoader {
        open: Mutex<StdHashSet<u64>>,
        next: AtomicU64,
    }

    impl StubModuleLoader {
        fn new() -> Self {
            Self {
                open: Mutex::new(StdHashSet::new()),
                next: AtomicU64::new(1),
            }
        }
    }

    impl ModuleLoader for StubModuleLoader {
        fn open(&self, path: &Path) -> zenith_core::Result<ModuleHandle> {
            if !path.is_file() {
                return Err(ZenithError::FileError {
                    path: path.to_path_buf(),
                    detail: "no such file".to_string(),
                });
            }
            let id = self.next.fetch_add(1, Ordering::SeqCst);
            self.open.lock().unwrap().insert(id);
            Ok(ModuleHandle::new(id))
        }

        fn close(&self, handle: ModuleHandle) {
            self.open.lock().unwrap().remove(&handle.id());
        }

        fn find_symbol(&self, handle: ModuleHandle, name: &str) -> Option<SymbolAddress> {
            if name != ENTRY_SYMBOL || !self.open.lock().unwrap().contains(&handle.id()) {
                return None;
            }
            Some(SymbolAddress::new(
                empty_entry as *const std::ffi::c_void,
            ))
        }
    }

    /// Service that records lifecycle and toggle calls.
    struct HookRecorder {
        refs: RefCount,
        identity: ServiceIdentity,
        name: String,
        events: Arc<Mutex<Vec<String>>>,
        enabled: AtomicBool,
    }

    impl HookRecorder {
        fn register(
            registry: &ServiceRegistry,
            name: &str,
            events: &Arc<Mutex<Vec<String>>>,
        ) -> ServiceIdentity {
            let identity = ServiceIdentity::from_name(name);
            let recorder = Self {
                refs: RefCount::new(),
                identity,
                name: name.to_string(),
                events: Arc::clone(events),
                enabled: AtomicBool::new(true),
            };
            registry
                .register_service(identity, ServiceRef::adopt(Arc::new(recorder)))
                .unwrap();
            identity
        }

        fn record(&self, event: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("{}:{}", event, self.name));
        }
    }

    impl ServiceObject for HookRecorder {
        fn add_ref(&self) -> u32 {
            self.refs.increment()
        }

        fn release(&self) -> u32 {
            self.refs.decrement()
        }

        fn provides(&self, identity: &ServiceIdentity) -> bool {
            *identity == self.identity
                || *identity == SERVICE_OBJECT_IDENTITY
                || *identity == LIFECYCLE_IDENTITY
                || *identity == TOGGLE_IDENTITY
        }

        fn name(&self) -> String {
            self.name.clone()
        }

        fn class_identity(&self) -> ServiceIdentity {
            self.identity
        }

        fn as_lifecycle(&self) -> Option<&dyn Lifecycle> {
            Some(self)
        }

        fn as_toggle(&self) -> Option<&dyn Toggle> {
            Some(self)
        }
    }

    impl Lifecycle for HookRecorder {
        fn on_load(&self) -> Result<()> {
            self.record("load");
            Ok(())
        }

        fn on_system_init(&self) -> Result<()> {
            self.record("system_init");
            Ok(())
        }

        fn on_system_quit(&self) -> Result<()> {
            self.record("system_quit");
            Ok(())
        }

        fn on_quit(&self) -> Result<()> {
            self.record("quit");
            Ok(())
        }
    }

    impl Toggle for HookRecorder {
        fn set_enabled(&self, enabled: bool) {
            self.enabled.store(enabled, Ordering::SeqCst);
            self.record(if enabled { "enabled" } else { "disabled" });
        }

        fn is_enabled(&self) -> bool {
            self.enabled.load(Ordering::SeqCst)
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        manager: ComponentManager,
        events: Arc<Mutex<Vec<String>>>,
    }

    /// Writes `<name>.<ext>` module stubs plus sidecar manifests and
    /// registers a hook recorder per component.
    fn fixture(components: &[(&str, &[&str], u32)]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(ServiceRegistry::new());
        let loader = Arc::new(PluginLoader::new(
            Arc::new(StubModuleLoader::new()),
            Arc::clone(&registry),
        ));
        let manager = ComponentManager::new(loader);
        let events = Arc::new(Mutex::new(Vec::new()));

        for (name, deps, order) in components {
            let module = dir.path().join(format!("{name}.{MODULE_EXTENSION}"));
            std::fs::write(&module, b"stub").unwrap();

            let manifest = json!({
                "name": name,
                "dependencies": deps,
                "load_order": order,
            });
            std::fs::write(
                ComponentManifest::sidecar_path(&module),
                serde_json::to_string_pretty(&manifest).unwrap(),
            )
            .unwrap();

            HookRecorder::register(&registry, name, &events);
        }

        manager.scan_components(dir.path()).unwrap();
        Fixture {
            _dir: dir,
            manager,
            events,
        }
    }

    fn events_of(fixture: &Fixture) -> Vec<String> {
        fixture.events.lock().unwrap().clone()
    }

    #[test]
    fn test_dependency_fixpoint_terminates_on_cycles() {
        let fixture = fixture(&[
            ("x", &["y"], 10),
            ("y", &["x"], 20),
            ("z", &["w"], 30),
            ("w", &[], 40),
        ]);

        let all_resolved = fixture.manager.resolve_dependencies();
        assert!(!all_resolved);

        let satisfied = |name: &str| {
            fixture
                .manager
                .find_component_by_name(name)
                .unwrap()
                .dependency_satisfied
        };

        assert!(!satisfied("x"));
        assert!(!satisfied("y"));
        assert!(satisfied("z"));
        assert!(satisfied("w"));

        // Running again changes nothing: satisfaction is monotonic.
        fixture.manager.resolve_dependencies();
        assert!(!satisfied("x"));
        assert!(satisfied("z"));

        let log = fixture.manager.error_log().join("\n");
        assert!(log.contains("cycle"));
    }

    #[test]
    fn test_missing_dependency_is_logged() {
        let fixture = fixture(&[("lonely", &["ghost"], 10)]);

        assert!(!fixture.manager.resolve_dependencies());
        let log = fixture.manager.error_log().join("\n");
        assert!(log.contains("missing dependency 'ghost'"));
    }

    #[test]
    fn test_load_and_unload_order_mirror() {
        let fixture = fixture(&[("a", &[], 10), ("b", &[], 20), ("c", &[], 30)]);

        let report = fixture.manager.load_all_components();
        assert!(report.is_complete());
        assert_eq!(report.loaded, vec!["a", "b", "c"]);

        assert_eq!(
            events_of(&fixture),
            vec![
                "load:a",
                "load:b",
                "load:c",
                "system_init:a",
                "system_init:b",
                "system_init:c",
            ]
        );

        fixture.events.lock().unwrap().clear();
        fixture.manager.unload_all_components();

        assert_eq!(
            events_of(&fixture),
            vec![
                "system_quit:c",
                "system_quit:b",
                "system_quit:a",
                "quit:c",
                "quit:b",
                "quit:a",
            ]
        );

        for name in ["a", "b", "c"] {
            let record = fixture.manager.find_component_by_name(name).unwrap();
            assert!(!record.info.is_loaded);
        }
        assert_eq!(fixture.manager.loader().module_count(), 0);
    }

    #[test]
    fn test_unsatisfied_component_is_skipped_not_fatal() {
        let fixture = fixture(&[("ok", &[], 10), ("stuck", &["ghost"], 20)]);

        let report = fixture.manager.load_all_components();
        assert!(!report.is_complete());
        assert_eq!(report.loaded, vec!["ok"]);
        assert_eq!(report.skipped, vec!["stuck"]);
        assert!(report.failed.is_empty());

        assert!(
            fixture
                .manager
                .last_error_message()
                .unwrap()
                .contains("stuck")
        );
    }

    #[test]
    fn test_disabled_component_stays_cataloged_but_unloaded() {
        let fixture = fixture(&[("keep", &[], 10), ("bench", &[], 20)]);
        let bench = ServiceIdentity::from_name("bench");

        fixture.manager.enable_component(&bench, false).unwrap();
        assert_eq!(fixture.manager.is_component_enabled(&bench), Some(false));

        let report = fixture.manager.load_all_components();
        assert_eq!(report.loaded, vec!["keep"]);
        assert!(fixture.manager.find_component(&bench).is_some());
        assert!(!fixture.manager.find_component(&bench).unwrap().info.is_loaded);
    }

    #[test]
    fn test_enable_forwards_to_live_service() {
        let fixture = fixture(&[("live", &[], 10)]);
        let live = ServiceIdentity::from_name("live");

        fixture.manager.load_all_components();
        fixture.manager.enable_component(&live, false).unwrap();

        assert!(events_of(&fixture).contains(&"disabled:live".to_string()));

        let unknown = ServiceIdentity::from_name("unknown");
        assert!(matches!(
            fixture.manager.enable_component(&unknown, true),
            Err(ZenithError::NotFound(_))
        ));
    }

    #[test]
    fn test_lifecycle_flags_follow_sequencing() {
        let fixture = fixture(&[("tracked", &[], 10)]);
        let tracked = ServiceIdentity::from_name("tracked");
        let registry = Arc::clone(fixture.manager.loader().registry());

        assert_eq!(registry.lifecycle_flags(&tracked), Some((false, false)));

        fixture.manager.load_all_components();
        assert_eq!(registry.lifecycle_flags(&tracked), Some((true, true)));
    }

    #[test]
    fn test_sidecar_manifest_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(ServiceRegistry::new());
        let loader = Arc::new(PluginLoader::new(
            Arc::new(StubModuleLoader::new()),
            registry,
        ));
        let manager = ComponentManager::new(loader);

        // One module with a manifest, one bare.
        let described = dir.path().join(format!("described.{MODULE_EXTENSION}"));
        std::fs::write(&described, b"stub").unwrap();
        std::fs::write(
            ComponentManifest::sidecar_path(&described),
            r#"{
                "name": "fancy-name",
                "version": "2.3.0",
                "kind": "dsp",
                "dependencies": ["plain_input"],
                "load_order": 5
            }"#,
        )
        .unwrap();

        let bare = dir.path().join(format!("plain_input.{MODULE_EXTENSION}"));
        std::fs::write(&bare, b"stub").unwrap();

        assert_eq!(manager.scan_components(dir.path()).unwrap(), 2);

        let fancy = manager.find_component_by_name("fancy-name").unwrap();
        assert_eq!(fancy.info.version, "2.3.0");
        assert_eq!(fancy.info.kind, ComponentKind::Dsp);
        assert_eq!(fancy.info.load_order, 5);
        assert_eq!(fancy.dependencies, vec!["plain_input".to_string()]);

        let plain = manager.find_component_by_name("plain_input").unwrap();
        assert_eq!(plain.info.version, "1.0.0");
        assert_eq!(plain.info.kind, ComponentKind::Input);
        assert_eq!(
            plain.info.identity,
            ServiceIdentity::from_name("plain_input")
        );
        assert!(plain.info.file_size > 0);
    }

    #[test]
    fn test_duplicate_identity_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(ServiceRegistry::new());
        let loader = Arc::new(PluginLoader::new(
            Arc::new(StubModuleLoader::new()),
            registry,
        ));
        let manager = ComponentManager::new(loader);

        for file in ["first", "second"] {
            let module = dir.path().join(format!("{file}.{MODULE_EXTENSION}"));
            std::fs::write(&module, b"stub").unwrap();
            std::fs::write(
                ComponentManifest::sidecar_path(&module),
                r#"{"name": "same-component"}"#,
            )
            .unwrap();
        }

        assert_eq!(manager.scan_components(dir.path()).unwrap(), 1);
        assert_eq!(manager.component_count(), 1);
    }

    #[test]
    fn test_scan_missing_directory() {
        let registry = Arc::new(ServiceRegistry::new());
        let loader = Arc::new(PluginLoader::new(
            Arc::new(StubModuleLoader::new()),
            registry,
        ));
        let manager = ComponentManager::new(loader);

        let result = manager.scan_components(Path::new("/no/such/place"));
        assert!(matches!(result, Err(ZenithError::FileNotFound(_))));
        assert!(manager.last_error_message().is_some());

        manager.clear_error_log();
        assert!(manager.error_log().is_empty());
    }
}
