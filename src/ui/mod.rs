//! User interface module - result reporting and formatting.
//!
//! Separates concerns:
//! - `formatter` - Pure formatting functions
//! - This module - What gets printed for a resolution

use crate::domain::RefType;
use std::collections::BTreeMap;

pub mod formatter;

pub use formatter::{
    display_boundary_warning, display_error, display_properties, display_resolution,
    format_properties, format_resolution,
};

/// Everything the CLI prints for one resolution
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub ref_type: RefType,
    pub ref_name: String,
    pub version: String,
    pub properties: BTreeMap<String, String>,
    pub git_properties: BTreeMap<String, String>,
}

/// Print `report` to stdout
///
/// With `quiet` only the bare version is printed, for use in scripts.
pub fn print_report(report: &Report, quiet: bool) {
    if quiet {
        println!("{}", report.version);
        return;
    }

    display_resolution(report.ref_type, &report.ref_name, &report.version);
    display_properties("Properties", &report.properties);
    display_properties("Git properties", &report.git_properties);
}
