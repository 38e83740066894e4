//! Run command implementation.

use std::path::Path;

use miette::{Result, miette};

use crate::commands::build_manager;
use crate::output;

/// Scans, loads every loadable component, reports, and shuts the set
/// down in the mirror of load order.
pub fn execute(dir: &Path) -> Result<()> {
    let manager = build_manager();

    manager
        .scan_components(dir)
        .map_err(|e| miette!("Scan failed: {}", e))?;

    output::section_header("Loading components");
    let report = manager.load_all_components();

    for name in &report.loaded {
        output::component_loaded(name);
    }
    for name in &report.skipped {
        output::component_skipped(name, "unsatisfied dependencies");
    }
    for (name, error) in &report.failed {
        output::component_failed(name, error);
    }

    output::section_header("Registered services");
    for descriptor in manager.loader().services() {
        output::list_item(&format!("{} {}", descriptor.identity, descriptor.name));
    }

    output::summary(
        report.loaded.len(),
        report.skipped.len(),
        report.failed.len(),
    );

    manager.unload_all_components();

    if report.is_complete() {
        Ok(())
    } else {
        Err(miette!(
            "{} of {} components did not load",
            report.skipped.len() + report.failed.len(),
            report.loaded.len() + report.skipped.len() + report.failed.len()
        ))
    }
}
