//! Collaborators notified when the configuration changes.
//!
//! Each entry point receives only the slice of configuration it owns. All of
//! them are optional: a service without a secret store simply leaves that
//! slot empty.

use std::sync::Arc;

use crate::config::schema::TelemetryConfig;
use crate::config::store::CanonicalStore;

/// The pluggable device driver.
pub trait DriverHandle: Send + Sync {
    /// Called with the complete driver map whenever any driver value changed.
    fn reconfigure(&self, config: &CanonicalStore);
}

/// Periodic telemetry publication.
pub trait TelemetryScheduler: Send + Sync {
    /// Called when the publication interval changed.
    fn reschedule(&self, telemetry: &TelemetryConfig);
}

/// Periodic device discovery.
pub trait DiscoveryController: Send + Sync {
    /// Called on every reconfiguration; must tolerate unchanged values.
    fn configure(&self, enabled: bool, interval: u32);
}

/// Secret store client.
pub trait SecretStoreClient: Send + Sync {
    /// Called on every reconfiguration with the full canonical store.
    fn reconfigure(&self, store: &CanonicalStore);
}

/// The set of collaborators a configuration context notifies.
#[derive(Clone, Default)]
pub struct Collaborators {
    pub driver: Option<Arc<dyn DriverHandle>>,
    pub telemetry: Option<Arc<dyn TelemetryScheduler>>,
    pub discovery: Option<Arc<dyn DiscoveryController>>,
    pub secret_store: Option<Arc<dyn SecretStoreClient>>,
}

impl Collaborators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_driver(mut self, driver: Arc<dyn DriverHandle>) -> Self {
        self.driver = Some(driver);
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetryScheduler>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn with_discovery(mut self, discovery: Arc<dyn DiscoveryController>) -> Self {
        self.discovery = Some(discovery);
        self
    }

    pub fn with_secret_store(mut self, secret_store: Arc<dyn SecretStoreClient>) -> Self {
        self.secret_store = Some(secret_store);
        self
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("driver", &self.driver.is_some())
            .field("telemetry", &self.telemetry.is_some())
            .field("discovery", &self.discovery.is_some())
            .field("secret_store", &self.secret_store.is_some())
            .finish()
    }
}
