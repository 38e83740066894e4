//! Component catalog records.

use std::path::PathBuf;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use zenith_core::ServiceIdentity;

/// Load order assigned to components that do not specify one.
pub const DEFAULT_LOAD_ORDER: u32 = 1000;

/// Broad classification of a component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Input,
    Output,
    Dsp,
    Visualization,
    #[default]
    General,
}

impl ComponentKind {
    /// Infers a kind from a module file name.
    pub fn from_file_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.contains("input") {
            ComponentKind::Input
        } else if lower.contains("output") {
            ComponentKind::Output
        } else if lower.contains("dsp") {
            ComponentKind::Dsp
        } else if lower.contains("visual") {
            ComponentKind::Visualization
        } else {
            ComponentKind::General
        }
    }
}

/// Metadata describing one cataloged component.
#[derive(Debug, Clone)]
pub struct ComponentInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub author: String,
    pub identity: ServiceIdentity,
    pub file_path: PathBuf,
    pub kind: ComponentKind,
    pub is_loaded: bool,
    pub is_enabled: bool,
    pub load_order: u32,
    pub last_modified: Option<SystemTime>,
    pub file_size: u64,
}

/// Catalog entry combining metadata with dependency state.
#[derive(Debug, Clone)]
pub struct ComponentRecord {
    pub info: ComponentInfo,

    /// Names of components this one depends on.
    pub dependencies: Vec<String>,

    /// Flipped false-to-true by the fixpoint resolver, never back.
    pub dependency_satisfied: bool,

    /// Module path once loaded.
    pub module: Option<PathBuf>,

    /// Position in discovery order; breaks load-order ties.
    pub(crate) discovery_index: u64,
}
