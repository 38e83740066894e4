//! Scan command implementation.

use std::path::Path;

use console::style;
use miette::{Result, miette};

use crate::commands::build_manager;
use crate::output;

/// Discovers components and prints the catalog.
pub fn execute(dir: &Path, detailed: bool) -> Result<()> {
    let manager = build_manager();

    let discovered = manager
        .scan_components(dir)
        .map_err(|e| miette!("Scan failed: {}", e))?;
    manager.resolve_dependencies();

    println!(
        "{} ({} found in {})",
        style("Components:").bold(),
        discovered,
        dir.display()
    );
    println!();

    for record in manager.components() {
        let satisfied = if record.dependency_satisfied {
            style("ok").green()
        } else {
            style("unsatisfied").red()
        };

        print!(
            "  {} {} [{:?}]",
            style(&record.info.name).cyan().bold(),
            record.info.version,
            record.info.kind
        );
        if !record.info.is_enabled {
            print!(" {}", style("(disabled)").yellow());
        }
        println!(" - deps: {}", satisfied);

        if detailed {
            output::key_value("identity", &record.info.identity.to_string());
            output::key_value("file", &record.info.file_path.display().to_string());
            output::key_value("author", &record.info.author);
            output::key_value("load_order", &record.info.load_order.to_string());
            if !record.dependencies.is_empty() {
                output::key_value("dependencies", &record.dependencies.join(", "));
            }
            println!();
        }
    }

    for message in manager.error_log() {
        output::warning(&message);
    }

    Ok(())
}
