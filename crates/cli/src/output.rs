//! Terminal output formatting.

#![allow(dead_code)]

use console::style;

/// Prints a success message.
pub fn success(message: &str) {
    println!("{} {}", style("✓").green().bold(), message);
}

/// Prints an error message.
pub fn error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), message);
}

/// Prints a warning message.
pub fn warning(message: &str) {
    println!("{} {}", style("⚠").yellow().bold(), message);
}

/// Prints an info message.
pub fn info(message: &str) {
    println!("{} {}", style("ℹ").blue().bold(), message);
}

/// Prints a component load result line.
pub fn component_loaded(name: &str) {
    println!("{} {}", style("✓").green(), name);
}

/// Prints a component skipped line.
pub fn component_skipped(name: &str, reason: &str) {
    println!(
        "{} {} {}",
        style("○").dim(),
        style(name).dim(),
        style(format!("({reason})")).dim()
    );
}

/// Prints a component failed line.
pub fn component_failed(name: &str, error: &str) {
    eprintln!("{} {} - {}", style("✗").red(), style(name).red(), error);
}

/// Prints a batch summary.
pub fn summary(loaded: usize, skipped: usize, failed: usize) {
    println!();

    if failed > 0 || skipped > 0 {
        println!(
            "{}: {} loaded, {} skipped, {} failed",
            style("PARTIAL").yellow().bold(),
            loaded,
            skipped,
            failed
        );
    } else {
        println!("{}: {} loaded", style("SUCCESS").green().bold(), loaded);
    }
}

/// Prints a header for a section.
pub fn section_header(title: &str) {
    println!("\n{}", style(format!("── {} ──", title)).bold());
}

/// Prints a list item.
pub fn list_item(text: &str) {
    println!("  {} {}", style("•").dim(), text);
}

/// Prints a key-value pair.
pub fn key_value(key: &str, value: &str) {
    println!("    {}: {}", style(key).dim(), value);
}
