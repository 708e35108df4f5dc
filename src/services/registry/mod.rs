//! Registry service module
//!
//! The authoritative store of active registrations, split into:
//! - `types`: Registration / Patch wire model
//! - `service`: add / remove / notify and dependency bootstrap
//! - `http_impl`: the `/services` HTTP surface
//! - `error`: registry error type

pub mod error;
pub mod http_impl;
pub mod service;
pub mod types;

// Re-export public types for easier access
pub use error::RegistryError;
pub use http_impl::{SERVICES_PATH, router};
pub use service::ServiceRegistry;
pub use types::{LOG_SERVICE, PORTAL_SERVICE, Patch, PatchEntry, Registration, ServiceName};
