//! Pure formatting functions for UI output.
//!
//! `format_*` functions build the text, `display_*` functions print it.

use crate::boundary::BoundaryWarning;
use crate::domain::RefType;
use std::collections::BTreeMap;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("\x1b[31mERROR:\x1b[0m {}", message);
}

/// Display a boundary warning to the user.
///
/// Shows a yellow warning icon followed by the warning message.
pub fn display_boundary_warning(warning: &BoundaryWarning) {
    eprintln!("\x1b[33m⚠ WARNING:\x1b[0m {}", warning);
}

/// Matched ref and resulting version, e.g. `branch feature/x -> x-SNAPSHOT`
pub fn format_resolution(ref_type: RefType, ref_name: &str, version: &str) -> String {
    format!(
        "\x1b[1m{}\x1b[0m \x1b[36m{}\x1b[0m -> \x1b[32m{}\x1b[0m",
        ref_type, ref_name, version
    )
}

/// Titled `key = value` listing; empty when there are no properties
pub fn format_properties(title: &str, properties: &BTreeMap<String, String>) -> String {
    if properties.is_empty() {
        return String::new();
    }

    let width = properties.keys().map(String::len).max().unwrap_or(0);
    let mut output = format!("\x1b[1m{}:\x1b[0m", title);
    for (key, value) in properties {
        output.push_str(&format!("\n  {:width$} = {}", key, value, width = width));
    }
    output
}

pub fn display_resolution(ref_type: RefType, ref_name: &str, version: &str) {
    println!("{}", format_resolution(ref_type, ref_name, version));
}

pub fn display_properties(title: &str, properties: &BTreeMap<String, String>) {
    let formatted = format_properties(title, properties);
    if !formatted.is_empty() {
        println!("\n{}", formatted);
    }
}
