pub mod config;
pub mod error;
pub mod provider;
pub mod registration;
pub mod selection;

pub use config::*;
pub use error::*;
pub use provider::ProviderDirectory;
pub use registration::RegistrationClient;
pub use selection::{RandomSelection, RoundRobinSelection, SelectionStrategy};
