//! Error types for Zenith.

use std::path::PathBuf;

use thiserror::Error;

use crate::identity::ServiceIdentity;

/// Result type alias for Zenith operations.
pub type Result<T> = std::result::Result<T, ZenithError>;

/// Main error type for Zenith.
#[derive(Debug, Error)]
pub enum ZenithError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Module already loaded: {0}")]
    AlreadyLoaded(PathBuf),

    #[error("Failed to open module {path}: {detail}")]
    FileError { path: PathBuf, detail: String },

    #[error("File or directory not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Module does not export the plugin entry symbol: {0}")]
    NotSupported(PathBuf),

    #[error("Plugin entry crashed in module: {0}")]
    EntryCrashed(PathBuf),

    #[error("Failed to register service {identity}: {reason}")]
    RegistrationFailure {
        identity: ServiceIdentity,
        reason: String,
    },

    #[error("Dependency not satisfied for component '{0}'")]
    DependencyUnsatisfied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No modules could be loaded from {0}")]
    NoModulesLoaded(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
