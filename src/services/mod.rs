pub mod client;
pub mod heartbeat;
pub mod lifecycle;
pub mod log;
pub mod registry;

pub use client::{ProviderDirectory, RegistrationClient};
pub use heartbeat::{HeartbeatConfig, HeartbeatMonitor, ProbeOutcome};
pub use lifecycle::ServiceHost;
pub use registry::{Patch, PatchEntry, Registration, ServiceRegistry};
