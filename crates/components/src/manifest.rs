//! Sidecar component manifests.
//!
//! A module file may ship a `<stem>.json` manifest next to it describing
//! the component without executing any of its code. When the sidecar is
//! absent, defaults are synthesized from the file name.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use zenith_core::{Result, ServiceIdentity, ZenithError};

use crate::info::{ComponentKind, DEFAULT_LOAD_ORDER};

/// Sidecar manifest for one component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentManifest {
    /// Component name.
    pub name: String,

    /// Component version.
    #[serde(default = "default_version")]
    pub version: String,

    /// Component description.
    #[serde(default)]
    pub description: Option<String>,

    /// Component author.
    #[serde(default)]
    pub author: Option<String>,

    /// Identity in braced text form; derived from the name when absent.
    #[serde(default)]
    pub identity: Option<ServiceIdentity>,

    /// Component kind.
    #[serde(default)]
    pub kind: ComponentKind,

    /// Names of components this one depends on.
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Position in the deterministic load order.
    #[serde(default = "default_load_order")]
    pub load_order: u32,

    /// Whether the component participates in batch loads.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_load_order() -> u32 {
    DEFAULT_LOAD_ORDER
}

fn default_enabled() -> bool {
    true
}

impl ComponentManifest {
    /// Loads a manifest from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parses a manifest from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ZenithError::InvalidParameter(format!("malformed manifest: {e}")))
    }

    /// Creates a minimal manifest with just name and version.
    pub fn minimal(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: None,
            author: None,
            identity: None,
            kind: ComponentKind::default(),
            dependencies: Vec::new(),
            load_order: DEFAULT_LOAD_ORDER,
            enabled: true,
        }
    }

    /// Identity declared by the manifest, or one derived from the name.
    pub fn resolved_identity(&self) -> ServiceIdentity {
        self.identity
            .unwrap_or_else(|| ServiceIdentity::from_name(&self.name))
    }

    /// Path of the sidecar manifest for a module file.
    pub fn sidecar_path(module: &Path) -> PathBuf {
        module.with_extension("json")
    }
}
