//! Live configuration service.
//!
//! Holds the published configuration generation, applies runtime
//! reconfiguration and notifies the components that depend on it.

pub mod context;
pub mod hooks;
pub mod reconfigure;
pub mod snapshot;

pub use context::{ConfigContext, LiveConfig};
pub use hooks::{Collaborators, DiscoveryController, DriverHandle, SecretStoreClient, TelemetryScheduler};
pub use reconfigure::ReconfigureOutcome;
pub use snapshot::ConfigSnapshot;
