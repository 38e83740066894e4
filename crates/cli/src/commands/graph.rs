//! Graph command implementation.

use std::path::Path;

use console::style;
use miette::{Result, miette};
use zenith_components::ComponentManager;

use crate::commands::build_manager;

/// Shows the component dependency graph.
pub fn execute(dir: &Path, format: &str) -> Result<()> {
    let manager = build_manager();
    manager
        .scan_components(dir)
        .map_err(|e| miette!("Scan failed: {}", e))?;

    match format {
        "ascii" => print_ascii(&manager),
        "dot" => print_dot(&manager),
        _ => return Err(miette!("Unknown format: {}. Use 'ascii' or 'dot'", format)),
    }

    Ok(())
}

/// Prints an ASCII representation of the dependency graph.
fn print_ascii(manager: &ComponentManager) {
    println!("Dependency Graph:");
    println!();

    for record in manager.components() {
        println!("● {}", record.info.name);
        for dep in &record.dependencies {
            println!("  └─ {}", dep);
        }
    }

    let graph = manager.dependency_graph();
    let cycle = graph.cycle_members();
    if !cycle.is_empty() {
        println!();
        println!(
            "{} cycle involving: {}",
            style("⚠").yellow().bold(),
            cycle.join(", ")
        );
    }
}

/// Prints a DOT format representation for Graphviz.
fn print_dot(manager: &ComponentManager) {
    println!("digraph zenith {{");
    println!("  rankdir=LR;");
    println!("  node [shape=box];");
    println!();

    for record in manager.components() {
        println!(
            "  \"{}\" [label=\"{}\\n{}\"];",
            record.info.name, record.info.name, record.info.version
        );

        for dep in &record.dependencies {
            println!("  \"{}\" -> \"{}\";", dep, record.info.name);
        }
    }

    println!("}}");
}
