//! Zenith Core - Core types and traits for the Zenith plugin host.

mod descriptor;
mod error;
mod identity;
mod service;

pub use descriptor::ServiceDescriptor;
pub use error::{Result, ZenithError};
pub use identity::ServiceIdentity;
pub use service::{
    FACTORY_IDENTITY, LIFECYCLE_IDENTITY, Lifecycle, RefCount, SERVICE_OBJECT_IDENTITY,
    ServiceFactory, ServiceObject, ServiceRef, TOGGLE_IDENTITY, Toggle,
};
