//! Service descriptors produced by module enumeration.

use crate::identity::ServiceIdentity;

/// Description of one service exported by a module.
///
/// Produced while walking a module's factory chain, consumed during
/// registration, and kept afterwards for introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// Identity of the exported service class.
    pub identity: ServiceIdentity,

    /// Human-readable service name reported by the module.
    pub name: String,

    /// Whether the export was usable (a factory was present and wrapped).
    pub available: bool,
}

impl ServiceDescriptor {
    /// Creates a descriptor for an available export.
    pub fn new(identity: ServiceIdentity, name: impl Into<String>) -> Self {
        Self {
            identity,
            name: name.into(),
            available: true,
        }
    }

    /// Marks the descriptor unavailable.
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }
}
