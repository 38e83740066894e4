//! Zenith Registry - service registry and bridge.
//!
//! Maps 128-bit service identities to live, reference-counted service
//! objects. One registry instance is created by the host's top-level
//! context and injected into the plugin loader and component manager;
//! there are no process-wide singletons.

mod registry;

pub use registry::{Registered, ServiceRegistry};
